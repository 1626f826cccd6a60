use anyhow::Result;
use async_trait::async_trait;
use chrono::{Local, NaiveDate};

use crate::error::FetchError;
use crate::post::Post;

/// Capability interface over the upstream social API: identity resolution
/// plus liked-posts listing. The production implementation is
/// [`TwitterClient`](crate::twitter::TwitterClient).
#[async_trait]
pub trait LikesSource: Send + Sync {
    async fn authenticated_user_id(&self) -> Result<String>;

    async fn liked_posts(&self, user_id: &str, max_results: u32) -> Result<Vec<Post>>;
}

/// Resolve the authenticated user, list their most-recent likes, and keep
/// only posts created on `today` (local calendar date). Returns data for
/// the caller to buffer; no shared state is touched.
pub async fn fetch_todays_likes(
    source: &dyn LikesSource,
    max_results: u32,
    today: NaiveDate,
) -> Result<Vec<Post>, FetchError> {
    let user_id = source
        .authenticated_user_id()
        .await
        .map_err(FetchError::Identity)?;

    let likes = source
        .liked_posts(&user_id, max_results)
        .await
        .map_err(FetchError::Listing)?;

    let todays: Vec<Post> = likes
        .into_iter()
        .filter(|post| post.created_at.with_timezone(&Local).date_naive() == today)
        .collect();

    for post in &todays {
        let preview: String = post.text.chars().take(50).collect();
        tracing::info!("Found favorite: {preview}...");
    }

    Ok(todays)
}
