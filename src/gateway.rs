//! # Backend Gateway Module
//!
//! Request/response access to the product and user-settings API. The
//! [`BackendGateway`] trait is what the rest of the bot depends on;
//! [`ApiClient`] is its HTTP implementation.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::GatewayConfig;
use crate::models::{ItemId, ItemSearchResult, NewsEntry, Region, UserId, UserSettings};

/// Failure of a backend call
///
/// Callers treat every variant the same way; the variants only keep the
/// logs precise.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("backend request timed out")]
    Timeout,
    #[error("backend returned status {0}")]
    Status(StatusCode),
    #[error("backend request failed: {0}")]
    Http(reqwest::Error),
    #[error("backend response could not be decoded: {0}")]
    Decode(String),
    #[error("backend unavailable: {0}")]
    Unavailable(String),
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            GatewayError::Timeout
        } else if let Some(status) = err.status() {
            GatewayError::Status(status)
        } else if err.is_decode() {
            GatewayError::Decode(err.to_string())
        } else {
            GatewayError::Http(err)
        }
    }
}

/// Operations offered by the backend API
#[async_trait]
pub trait BackendGateway: Send + Sync {
    async fn search_by_name(&self, name: &str) -> Result<Vec<ItemSearchResult>, GatewayError>;

    async fn search_by_genre(
        &self,
        genre: &str,
        min_rating: u32,
        min_votes: u32,
    ) -> Result<Vec<ItemSearchResult>, GatewayError>;

    /// Items priced at or below `max_dollars`
    async fn search_by_budget(
        &self,
        max_dollars: f64,
        min_rating: u32,
    ) -> Result<Vec<ItemSearchResult>, GatewayError>;

    async fn list_discounted(&self) -> Result<Vec<ItemSearchResult>, GatewayError>;

    /// Raw product document, `None` when the backend has no data for the item
    async fn get_details(
        &self,
        item_id: ItemId,
        region: Region,
        language: &str,
    ) -> Result<Option<Value>, GatewayError>;

    /// Latest news for an item; empty on any failure
    async fn get_news(&self, item_id: ItemId) -> Vec<NewsEntry>;

    /// Settings of a user; a default record when the backend does not know the user
    async fn get_user_settings(&self, user_id: UserId) -> Result<UserSettings, GatewayError>;

    async fn put_user_settings(&self, settings: &UserSettings) -> Result<(), GatewayError>;

    async fn list_all_users(&self) -> Result<Vec<UserSettings>, GatewayError>;
}

/// HTTP client for the backend API
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    /// Create a client; the configured timeout applies to every request
    pub fn new(config: &GatewayConfig) -> Result<Self, GatewayError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(GatewayError::from)?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    async fn get_json<T>(&self, path: &str, query: &[(&str, String)]) -> Result<T, GatewayError>
    where
        T: DeserializeOwned + Default,
    {
        debug!(path = %path, "Backend request");
        let response = self
            .http
            .get(self.url(path))
            .query(query)
            .send()
            .await?
            .error_for_status()?;

        // A JSON `null` body means "nothing"
        let body: Option<T> = response.json().await?;
        Ok(body.unwrap_or_default())
    }
}

#[async_trait]
impl BackendGateway for ApiClient {
    async fn search_by_name(&self, name: &str) -> Result<Vec<ItemSearchResult>, GatewayError> {
        self.get_json("api/search/games", &[("name", name.to_string())])
            .await
    }

    async fn search_by_genre(
        &self,
        genre: &str,
        min_rating: u32,
        min_votes: u32,
    ) -> Result<Vec<ItemSearchResult>, GatewayError> {
        self.get_json(
            "api/search/spy-genre",
            &[
                ("genre", genre.to_string()),
                ("minRating", min_rating.to_string()),
                ("minVotes", min_votes.to_string()),
            ],
        )
        .await
    }

    async fn search_by_budget(
        &self,
        max_dollars: f64,
        min_rating: u32,
    ) -> Result<Vec<ItemSearchResult>, GatewayError> {
        self.get_json(
            "api/search/spy-budget",
            &[
                ("max", max_dollars.to_string()),
                ("minRating", min_rating.to_string()),
            ],
        )
        .await
    }

    async fn list_discounted(&self) -> Result<Vec<ItemSearchResult>, GatewayError> {
        self.get_json("api/search/spy-discounts", &[]).await
    }

    async fn get_details(
        &self,
        item_id: ItemId,
        region: Region,
        language: &str,
    ) -> Result<Option<Value>, GatewayError> {
        let document: Value = self
            .get_json(
                "api/search/details",
                &[
                    ("appId", item_id.to_string()),
                    ("cc", region.code().to_string()),
                    ("l", language.to_string()),
                ],
            )
            .await?;

        Ok(document.get("data").filter(|data| data.is_object()).cloned())
    }

    async fn get_news(&self, item_id: ItemId) -> Vec<NewsEntry> {
        match self
            .get_json("api/search/news", &[("appId", item_id.to_string())])
            .await
        {
            Ok(news) => news,
            Err(e) => {
                warn!(item_id, error = %e, "Failed to fetch item news");
                Vec::new()
            }
        }
    }

    async fn get_user_settings(&self, user_id: UserId) -> Result<UserSettings, GatewayError> {
        let response = self
            .http
            .get(self.url(&format!("api/usersettings/{user_id}")))
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            debug!(user_id, "No stored settings, using defaults");
            return Ok(UserSettings::new(user_id));
        }

        let settings: Option<UserSettings> = response.error_for_status()?.json().await?;
        Ok(settings.unwrap_or_else(|| UserSettings::new(user_id)))
    }

    async fn put_user_settings(&self, settings: &UserSettings) -> Result<(), GatewayError> {
        self.http
            .put(self.url(&format!("api/usersettings/{}", settings.chat_id)))
            .json(settings)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    async fn list_all_users(&self) -> Result<Vec<UserSettings>, GatewayError> {
        self.get_json("api/usersettings", &[]).await
    }
}
