use chrono::{DateTime, Utc};

/// A liked post as fetched from the upstream API. Immutable once built;
/// lives in the scheduler's daily buffer until the digest is sent.
#[derive(Debug, Clone)]
pub struct Post {
    pub id: String,
    pub text: String,
    pub author_id: String,
    pub created_at: DateTime<Utc>,
}

impl Post {
    pub fn permalink(&self) -> String {
        format!("https://x.com/x/status/{}", self.id)
    }
}
