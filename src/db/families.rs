use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;

use crate::models::{Family, NewFamily};

const FAMILY_SELECT_SQL: &str = "SELECT
    f.id,
    f.owner_id,
    u.nickname AS owner_nickname,
    f.family_name,
    f.upload_cycle,
    f.invite_code,
    f.represent_img,
    f.created_at,
    f.updated_at
FROM families f
JOIN users u ON u.id = f.owner_id";

pub async fn find_by_id(conn: &mut SqliteConnection, id: i64) -> sqlx::Result<Option<Family>> {
    sqlx::query_as::<_, Family>(&format!("{FAMILY_SELECT_SQL} WHERE f.id = ?"))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await
}

pub async fn find_by_invite_code(
    conn: &mut SqliteConnection,
    invite_code: &str,
) -> sqlx::Result<Option<Family>> {
    sqlx::query_as::<_, Family>(&format!("{FAMILY_SELECT_SQL} WHERE f.invite_code = ?"))
        .bind(invite_code)
        .fetch_optional(&mut *conn)
        .await
}

/// Insert a family; a taken invite code surfaces as a unique violation.
pub async fn insert(
    conn: &mut SqliteConnection,
    family: &NewFamily,
    invite_code: &str,
) -> sqlx::Result<i64> {
    let result = sqlx::query(
        "INSERT INTO families
            (owner_id, family_name, upload_cycle, invite_code, represent_img, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(family.owner_id)
    .bind(&family.family_name)
    .bind(family.upload_cycle)
    .bind(invite_code)
    .bind(&family.represent_img)
    .bind(family.created_at)
    .bind(family.created_at)
    .execute(&mut *conn)
    .await?;

    Ok(result.last_insert_rowid())
}

pub async fn update_details(
    conn: &mut SqliteConnection,
    id: i64,
    family_name: &str,
    represent_img: &str,
    now: DateTime<Utc>,
) -> sqlx::Result<()> {
    sqlx::query(
        "UPDATE families SET family_name = ?, represent_img = ?, updated_at = ? WHERE id = ?",
    )
    .bind(family_name)
    .bind(represent_img)
    .bind(now)
    .bind(id)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

pub async fn update_upload_cycle(
    conn: &mut SqliteConnection,
    id: i64,
    upload_cycle: i32,
    now: DateTime<Utc>,
) -> sqlx::Result<()> {
    sqlx::query("UPDATE families SET upload_cycle = ?, updated_at = ? WHERE id = ?")
        .bind(upload_cycle)
        .bind(now)
        .bind(id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

pub async fn update_owner(
    conn: &mut SqliteConnection,
    id: i64,
    owner_id: i64,
    now: DateTime<Utc>,
) -> sqlx::Result<()> {
    sqlx::query("UPDATE families SET owner_id = ?, updated_at = ? WHERE id = ?")
        .bind(owner_id)
        .bind(now)
        .bind(id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// Returns the number of deleted rows (0 or 1)
pub async fn delete(conn: &mut SqliteConnection, id: i64) -> sqlx::Result<u64> {
    let result = sqlx::query("DELETE FROM families WHERE id = ?")
        .bind(id)
        .execute(&mut *conn)
        .await?;
    Ok(result.rows_affected())
}
