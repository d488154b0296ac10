use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Comment on a post
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Comment {
    pub id: i64,
    pub post_id: i64,
    pub writer_id: i64,
    pub content: String,
    pub created_at: DateTime<Utc>,
}
