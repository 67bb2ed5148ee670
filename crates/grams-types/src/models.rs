use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A posted picture with its caption, as rendered to visitors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Gram {
    pub id: i64,
    pub message: String,
    /// Stored file name under the picture directory.
    pub picture: String,
    pub user_id: Uuid,
    pub author_email: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub comments: Vec<Comment>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: i64,
    pub message: String,
    pub user_id: Uuid,
    pub author_email: String,
    pub gram_id: i64,
    pub created_at: DateTime<Utc>,
}

impl Gram {
    /// URL path the picture is served from.
    pub fn picture_url(&self) -> String {
        format!("/pictures/{}", self.picture)
    }
}
