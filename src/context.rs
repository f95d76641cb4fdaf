//! Shared services handed to every event handler.

use std::sync::Arc;

use crate::config::SearchConfig;
use crate::gateway::{BackendGateway, GatewayError};
use crate::models::{ItemDetails, ItemId, Region, UserId};
use crate::settings_cache::SettingsCache;
use crate::state_store::ConversationStore;
use crate::transport::MessagingTransport;

#[derive(Clone)]
pub struct AppContext {
    pub gateway: Arc<dyn BackendGateway>,
    pub settings: Arc<SettingsCache>,
    pub states: Arc<ConversationStore>,
    pub transport: Arc<dyn MessagingTransport>,
    pub search: SearchConfig,
    /// Language requested for item details
    pub details_language: String,
}

impl AppContext {
    pub fn new(
        gateway: Arc<dyn BackendGateway>,
        transport: Arc<dyn MessagingTransport>,
        search: SearchConfig,
        details_language: impl Into<String>,
    ) -> Self {
        Self {
            settings: Arc::new(SettingsCache::new(Arc::clone(&gateway))),
            states: Arc::new(ConversationStore::new()),
            gateway,
            transport,
            search,
            details_language: details_language.into(),
        }
    }

    /// Item view for `user`, `None` when the backend has no data for the item
    pub async fn item_details(
        &self,
        user: UserId,
        id: ItemId,
        region: Region,
    ) -> Result<Option<ItemDetails>, GatewayError> {
        let settings = self.settings.get(user).await?;
        let data = self
            .gateway
            .get_details(id, region, &self.details_language)
            .await?;
        Ok(data.map(|data| ItemDetails::from_json(&data, id, &settings)))
    }
}
