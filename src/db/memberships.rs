use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;

use crate::models::{FamilyMember, MemberStatus, Membership, MyFamily};

pub async fn find(
    conn: &mut SqliteConnection,
    user_id: i64,
    family_id: i64,
) -> sqlx::Result<Option<Membership>> {
    sqlx::query_as::<_, Membership>(
        "SELECT id, user_id, family_id, status, created_at, updated_at
         FROM user_families
         WHERE user_id = ? AND family_id = ?",
    )
    .bind(user_id)
    .bind(family_id)
    .fetch_optional(&mut *conn)
    .await
}

/// Insert a membership row. A second row for the same (user, family) pair
/// is rejected by the store as a unique violation.
pub async fn insert(
    conn: &mut SqliteConnection,
    user_id: i64,
    family_id: i64,
    status: MemberStatus,
    now: DateTime<Utc>,
) -> sqlx::Result<i64> {
    let result = sqlx::query(
        "INSERT INTO user_families (user_id, family_id, status, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?)",
    )
    .bind(user_id)
    .bind(family_id)
    .bind(status)
    .bind(now)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    Ok(result.last_insert_rowid())
}

/// Write back a whole membership value, replacing the stored row with the same id
pub async fn save(conn: &mut SqliteConnection, membership: &Membership) -> sqlx::Result<()> {
    sqlx::query(
        "INSERT INTO user_families (id, user_id, family_id, status, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?)
         ON CONFLICT (id) DO UPDATE SET
            status = excluded.status,
            updated_at = excluded.updated_at",
    )
    .bind(membership.id)
    .bind(membership.user_id)
    .bind(membership.family_id)
    .bind(membership.status)
    .bind(membership.created_at)
    .bind(membership.updated_at)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Active members of a family in the order they became active
pub async fn list_active_members(
    conn: &mut SqliteConnection,
    family_id: i64,
) -> sqlx::Result<Vec<FamilyMember>> {
    sqlx::query_as::<_, FamilyMember>(
        "SELECT u.id AS user_id, u.nickname, u.profile_img
         FROM user_families uf
         JOIN users u ON u.id = uf.user_id
         WHERE uf.family_id = ? AND uf.status = ?
         ORDER BY uf.updated_at, uf.id",
    )
    .bind(family_id)
    .bind(MemberStatus::Active)
    .fetch_all(&mut *conn)
    .await
}

/// Families in which the user is active, in the order they became active
pub async fn list_families_for_user(
    conn: &mut SqliteConnection,
    user_id: i64,
) -> sqlx::Result<Vec<MyFamily>> {
    sqlx::query_as::<_, MyFamily>(
        "SELECT f.id AS family_id, f.family_name
         FROM user_families uf
         JOIN families f ON f.id = uf.family_id
         WHERE uf.user_id = ? AND uf.status = ?
         ORDER BY uf.updated_at, uf.id",
    )
    .bind(user_id)
    .bind(MemberStatus::Active)
    .fetch_all(&mut *conn)
    .await
}

pub async fn delete_for_family(conn: &mut SqliteConnection, family_id: i64) -> sqlx::Result<u64> {
    let result = sqlx::query("DELETE FROM user_families WHERE family_id = ?")
        .bind(family_id)
        .execute(&mut *conn)
        .await?;
    Ok(result.rows_affected())
}

pub async fn count_for_family(conn: &mut SqliteConnection, family_id: i64) -> sqlx::Result<i64> {
    sqlx::query_scalar("SELECT COUNT(*) FROM user_families WHERE family_id = ?")
        .bind(family_id)
        .fetch_one(&mut *conn)
        .await
}
