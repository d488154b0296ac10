use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;

use crate::models::User;

pub async fn find_by_id(conn: &mut SqliteConnection, id: i64) -> sqlx::Result<Option<User>> {
    sqlx::query_as::<_, User>(
        "SELECT id, nickname, profile_img, created_at FROM users WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await
}

/// Provision a user row. Accounts are created by the authentication
/// subsystem; this exists for seeding and tests.
pub async fn insert(
    conn: &mut SqliteConnection,
    nickname: &str,
    profile_img: Option<&str>,
    now: DateTime<Utc>,
) -> sqlx::Result<i64> {
    let result = sqlx::query(
        "INSERT INTO users (nickname, profile_img, created_at) VALUES (?, ?, ?)",
    )
    .bind(nickname)
    .bind(profile_img)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    Ok(result.last_insert_rowid())
}
