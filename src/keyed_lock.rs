//! Per-user serialization.
//!
//! Operations on the same user run one after another; different users
//! never wait for each other.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::models::UserId;

/// A lazily created async mutex per user
#[derive(Debug, Default)]
pub struct KeyedLocks {
    locks: DashMap<UserId, Arc<Mutex<()>>>,
}

impl KeyedLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait until no other holder exists for `user`
    ///
    /// The guard is owned so it can be held across awaits and moved into
    /// spawned work.
    pub async fn lock(&self, user: UserId) -> OwnedMutexGuard<()> {
        // Clone the Arc out first so the map shard is not held while waiting
        let mutex = self
            .locks
            .entry(user)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        mutex.lock_owned().await
    }
}
