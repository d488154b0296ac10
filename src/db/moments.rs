use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;

use crate::models::Comment;

pub async fn insert_post(
    conn: &mut SqliteConnection,
    family_id: i64,
    writer_id: i64,
    content: &str,
    now: DateTime<Utc>,
) -> sqlx::Result<i64> {
    let result = sqlx::query(
        "INSERT INTO posts (family_id, writer_id, content, created_at) VALUES (?, ?, ?, ?)",
    )
    .bind(family_id)
    .bind(writer_id)
    .bind(content)
    .bind(now)
    .execute(&mut *conn)
    .await?;
    Ok(result.last_insert_rowid())
}

pub async fn insert_comment(
    conn: &mut SqliteConnection,
    post_id: i64,
    writer_id: i64,
    content: &str,
    now: DateTime<Utc>,
) -> sqlx::Result<i64> {
    let result = sqlx::query(
        "INSERT INTO comments (post_id, writer_id, content, created_at) VALUES (?, ?, ?, ?)",
    )
    .bind(post_id)
    .bind(writer_id)
    .bind(content)
    .bind(now)
    .execute(&mut *conn)
    .await?;
    Ok(result.last_insert_rowid())
}

/// All comments written by a user, across families
pub async fn find_comments_by_writer(
    conn: &mut SqliteConnection,
    writer_id: i64,
) -> sqlx::Result<Vec<Comment>> {
    sqlx::query_as::<_, Comment>(
        "SELECT id, post_id, writer_id, content, created_at
         FROM comments
         WHERE writer_id = ?
         ORDER BY id",
    )
    .bind(writer_id)
    .fetch_all(&mut *conn)
    .await
}

/// Delete every comment and post of a family. Returns (comments, posts) removed.
pub async fn delete_for_family(
    conn: &mut SqliteConnection,
    family_id: i64,
) -> sqlx::Result<(u64, u64)> {
    let comments = sqlx::query(
        "DELETE FROM comments WHERE post_id IN (SELECT id FROM posts WHERE family_id = ?)",
    )
    .bind(family_id)
    .execute(&mut *conn)
    .await?
    .rows_affected();

    let posts = sqlx::query("DELETE FROM posts WHERE family_id = ?")
        .bind(family_id)
        .execute(&mut *conn)
        .await?
        .rows_affected();

    Ok((comments, posts))
}

pub async fn count_posts_for_family(
    conn: &mut SqliteConnection,
    family_id: i64,
) -> sqlx::Result<i64> {
    sqlx::query_scalar("SELECT COUNT(*) FROM posts WHERE family_id = ?")
        .bind(family_id)
        .fetch_one(&mut *conn)
        .await
}
