use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::config::Config;
use crate::fetcher::LikesSource;
use crate::post::Post;
use crate::twitter::oauth::OAuth1;

const API_BASE: &str = "https://api.twitter.com/2";

#[derive(Debug, Clone, Deserialize)]
pub struct UserInfo {
    pub id: String,
    pub name: String,
    pub username: String,
}

#[derive(Debug, Deserialize)]
struct UserResponse {
    data: UserInfo,
}

#[derive(Debug, Deserialize)]
struct TweetData {
    id: String,
    text: String,
    author_id: Option<String>,
    created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct LikedTweetsResponse {
    data: Option<Vec<TweetData>>,
}

/// X API v2 client, authenticated once at construction with the four
/// OAuth 1.0a user-context credential fields.
pub struct TwitterClient {
    http: reqwest::Client,
    oauth: OAuth1,
}

impl TwitterClient {
    pub fn new(config: &Config) -> Self {
        let oauth = OAuth1::new(
            &config.api_key,
            &config.api_secret,
            &config.access_token,
            &config.access_token_secret,
        );

        Self {
            http: reqwest::Client::new(),
            oauth,
        }
    }

    pub async fn user_me(&self) -> Result<UserInfo> {
        let url = format!("{API_BASE}/users/me");
        let res: UserResponse = self.get_json(&url, &[]).await?;
        tracing::info!("Authenticated as {} (@{})", res.data.name, res.data.username);

        Ok(res.data)
    }

    /// Most-recent liked posts for `user_id`, newest first, with creation
    /// time and author metadata. `max_results` is clamped to the API's
    /// accepted 5..=100 window.
    pub async fn liked_tweets(&self, user_id: &str, max_results: u32) -> Result<Vec<Post>> {
        let max_results = clamp_max_results(max_results);

        let url = format!("{API_BASE}/users/{user_id}/liked_tweets");
        let query = [
            ("max_results", max_results.to_string()),
            ("tweet.fields", "created_at,author_id".to_string()),
        ];
        let res: LikedTweetsResponse = self.get_json(&url, &query).await?;

        let Some(tweets) = res.data else {
            tracing::info!("No likes found");
            return Ok(vec![]);
        };

        let mut posts = vec![];
        for tweet in tweets {
            let Some(created_at) = tweet.created_at else {
                tracing::warn!("Liked tweet {} has no created_at, skipping", tweet.id);
                continue;
            };
            posts.push(Post {
                id: tweet.id,
                text: tweet.text,
                author_id: tweet.author_id.unwrap_or_default(),
                created_at,
            });
        }

        Ok(posts)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let auth = self.oauth.authorization_header("GET", url, query)?;

        let res = self
            .http
            .get(url)
            .query(query)
            .header(reqwest::header::AUTHORIZATION, auth)
            .send()
            .await?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            anyhow::bail!("X API returned {status}: {body}");
        }

        Ok(res.json().await?)
    }
}

/// The liked-tweets endpoint rejects page sizes outside 5..=100.
fn clamp_max_results(requested: u32) -> u32 {
    requested.min(100).max(5)
}

#[async_trait]
impl LikesSource for TwitterClient {
    async fn authenticated_user_id(&self) -> Result<String> {
        Ok(self.user_me().await?.id)
    }

    async fn liked_posts(&self, user_id: &str, max_results: u32) -> Result<Vec<Post>> {
        self.liked_tweets(user_id, max_results).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn max_results_clamped_to_api_window() {
        assert_eq!(clamp_max_results(0), 5);
        assert_eq!(clamp_max_results(5), 5);
        assert_eq!(clamp_max_results(50), 50);
        assert_eq!(clamp_max_results(100), 100);
        assert_eq!(clamp_max_results(500), 100);
    }
}
