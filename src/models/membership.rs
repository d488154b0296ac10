use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle of a user's membership in a family
///
/// Pending -> Active (accept, join), Pending -> Removed (reject),
/// Active -> Removed (withdraw, forced removal), Removed -> Pending (re-invite),
/// Removed -> Active (join).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MemberStatus {
    /// Invited, not yet accepted
    Pending,
    Active,
    /// Rejected, withdrawn or removed by the owner
    Removed,
}

/// Membership row (`user_families`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Membership {
    pub id: i64,
    pub user_id: i64,
    pub family_id: i64,
    pub status: MemberStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Membership {
    pub fn is_active(&self) -> bool {
        self.status == MemberStatus::Active
    }

    pub fn is_pending(&self) -> bool {
        self.status == MemberStatus::Pending
    }

    /// New value carrying `status`, leaving the stored row untouched
    pub fn with_status(&self, status: MemberStatus, now: DateTime<Utc>) -> Self {
        Self {
            status,
            updated_at: now,
            ..self.clone()
        }
    }
}

/// Active member projection used by member listings
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct FamilyMember {
    pub user_id: i64,
    pub nickname: String,
    pub profile_img: Option<String>,
}
