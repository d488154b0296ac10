use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// User row as provisioned by the authentication subsystem
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub nickname: String,
    /// Profile image URL
    pub profile_img: Option<String>,
    pub created_at: DateTime<Utc>,
}
