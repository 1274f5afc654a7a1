//! X API publisher with an explicit session

use async_trait::async_trait;
use cosmos_poster_domain::{PublishError, PublishResult, Publisher, RenderedPost};
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

/// Connection settings for the X API
#[derive(Debug, Clone)]
pub struct XConfig {
    pub base_url: String,
    pub max_chars: usize,
    pub timeout: Duration,
}

impl Default for XConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.twitter.com".to_string(),
            max_chars: 280,
            timeout: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Clone)]
struct Session {
    username: String,
}

/// X API publisher using an OAuth 2.0 user token
pub struct XPublisher {
    client: Client,
    user_token: SecretString,
    config: XConfig,
    session: Mutex<Option<Session>>,
}

impl XPublisher {
    pub fn new(user_token: SecretString, config: XConfig) -> Result<Self, PublishError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| PublishError::Api(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            user_token,
            config,
            session: Mutex::new(None),
        })
    }

    /// Handle of the authenticated account, if any
    pub fn username(&self) -> Option<String> {
        self.session().as_ref().map(|s| s.username.clone())
    }

    fn session(&self) -> MutexGuard<'_, Option<Session>> {
        self.session.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), endpoint)
    }

    fn bearer(&self) -> String {
        format!("Bearer {}", self.user_token.expose_secret())
    }
}

#[derive(Serialize)]
struct CreateTweetRequest<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct CreateTweetResponse {
    data: TweetData,
}

#[derive(Deserialize)]
struct TweetData {
    id: String,
}

#[derive(Deserialize)]
struct MeResponse {
    data: MeData,
}

#[derive(Deserialize)]
struct MeData {
    username: String,
}

#[async_trait]
impl Publisher for XPublisher {
    async fn authenticate(&self) -> Result<(), PublishError> {
        if self.is_authenticated() {
            return Ok(());
        }

        let response = self
            .client
            .get(self.url("/2/users/me"))
            .header("Authorization", self.bearer())
            .send()
            .await
            .map_err(|e| PublishError::Api(e.to_string()))?;

        match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                return Err(PublishError::Auth("Invalid user token".to_string()));
            }
            StatusCode::TOO_MANY_REQUESTS => return Err(PublishError::RateLimited),
            status if !status.is_success() => {
                let body = response.text().await.unwrap_or_default();
                return Err(PublishError::Api(format!(
                    "Failed to verify credentials ({}): {}",
                    status, body
                )));
            }
            _ => {}
        }

        let me: MeResponse = response
            .json()
            .await
            .map_err(|e| PublishError::Api(e.to_string()))?;

        tracing::info!(username = %me.data.username, "Authenticated with X");
        *self.session() = Some(Session {
            username: me.data.username,
        });
        Ok(())
    }

    fn is_authenticated(&self) -> bool {
        self.session().is_some()
    }

    async fn publish(&self, post: &RenderedPost) -> Result<PublishResult, PublishError> {
        let len = post.text.chars().count();
        if len > self.config.max_chars {
            return Err(PublishError::ContentTooLong {
                len,
                max: self.config.max_chars,
            });
        }

        let response = self
            .client
            .post(self.url("/2/tweets"))
            .header("Authorization", self.bearer())
            .header("Content-Type", "application/json")
            .json(&CreateTweetRequest { text: &post.text })
            .send()
            .await
            .map_err(|e| PublishError::Api(e.to_string()))?;

        if response.status() == StatusCode::UNAUTHORIZED {
            *self.session() = None;
            return Err(PublishError::Auth("Invalid user token".to_string()));
        }

        if response.status() == StatusCode::TOO_MANY_REQUESTS {
            return Err(PublishError::RateLimited);
        }

        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PublishError::Api(format!(
                "Failed to create tweet: {}",
                body
            )));
        }

        let tweet_response: CreateTweetResponse = response
            .json()
            .await
            .map_err(|e| PublishError::Api(e.to_string()))?;

        let id = tweet_response.data.id;
        let url = match self.username() {
            Some(username) => format!("https://x.com/{}/status/{}", username, id),
            None => format!("https://x.com/i/status/{}", id),
        };

        Ok(PublishResult { id, url: Some(url) })
    }

    async fn close(&self) {
        if self.session().take().is_some() {
            tracing::debug!("X session closed");
        }
    }

    fn platform(&self) -> &'static str {
        "x"
    }
}
