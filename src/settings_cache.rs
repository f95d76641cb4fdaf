//! # User Settings Cache
//!
//! Read-through, write-through cache of [`UserSettings`] in front of the
//! backend. Mutations for one user are serialized; the cached entry is
//! replaced only after the backend accepted the new record.

use std::sync::Arc;

use dashmap::DashMap;
use tracing::{debug, info};

use crate::gateway::{BackendGateway, GatewayError};
use crate::keyed_lock::KeyedLocks;
use crate::models::{ItemId, UserId, UserSettings};

pub struct SettingsCache {
    gateway: Arc<dyn BackendGateway>,
    entries: DashMap<UserId, UserSettings>,
    locks: KeyedLocks,
}

impl SettingsCache {
    pub fn new(gateway: Arc<dyn BackendGateway>) -> Self {
        Self {
            gateway,
            entries: DashMap::new(),
            locks: KeyedLocks::new(),
        }
    }

    /// Settings of a user, loaded from the backend on first access
    pub async fn get(&self, user: UserId) -> Result<UserSettings, GatewayError> {
        if let Some(cached) = self.entries.get(&user) {
            return Ok(cached.value().clone());
        }

        let loaded = self.gateway.get_user_settings(user).await?;
        debug!(user_id = %user, "Loaded user settings");

        // A concurrent mutation may have stored a newer record meanwhile
        let entry = self.entries.entry(user).or_insert(loaded);
        Ok(entry.value().clone())
    }

    /// Apply `change` to the user's settings
    ///
    /// `change` returns whether it modified anything. Unchanged settings are
    /// not written back. Returns whether a write happened.
    pub async fn mutate<F>(&self, user: UserId, change: F) -> Result<bool, GatewayError>
    where
        F: FnOnce(&mut UserSettings) -> bool,
    {
        let _guard = self.locks.lock(user).await;

        let mut settings = self.get(user).await?;
        if !change(&mut settings) {
            return Ok(false);
        }

        self.gateway.put_user_settings(&settings).await?;
        self.entries.insert(user, settings);
        info!(user_id = %user, "User settings updated");
        Ok(true)
    }

    /// Returns `false` when the item was already in the wishlist
    pub async fn add_to_wishlist(&self, user: UserId, item: ItemId) -> Result<bool, GatewayError> {
        self.mutate(user, |s| s.wishlist.insert(item)).await
    }

    /// Returns `false` when the item was not in the wishlist
    pub async fn remove_from_wishlist(
        &self,
        user: UserId,
        item: ItemId,
    ) -> Result<bool, GatewayError> {
        self.mutate(user, |s| s.wishlist.remove(&item)).await
    }

    pub async fn subscribe_news(&self, user: UserId, item: ItemId) -> Result<bool, GatewayError> {
        self.mutate(user, |s| s.subscribed_items.insert(item)).await
    }

    /// Returns `false` when the user was not subscribed
    pub async fn unsubscribe_news(&self, user: UserId, item: ItemId) -> Result<bool, GatewayError> {
        self.mutate(user, |s| s.subscribed_items.remove(&item)).await
    }

    pub async fn set_sales_subscription(
        &self,
        user: UserId,
        enabled: bool,
    ) -> Result<bool, GatewayError> {
        self.mutate(user, |s| {
            let changed = s.subscription_on_sales != enabled;
            s.subscription_on_sales = enabled;
            changed
        })
        .await
    }
}
