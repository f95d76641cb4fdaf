//! # Conversation State Store
//!
//! Pending conversational context per user. A user without an entry is idle.

use dashmap::DashMap;
use teloxide::types::MessageId;
use tokio::sync::OwnedMutexGuard;

use crate::dialogue::StateTag;
use crate::keyed_lock::KeyedLocks;
use crate::models::{ItemId, UserId};

/// An item offered for selection, as labelled on the reply keyboard
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OfferedItem {
    pub id: ItemId,
    pub label: String,
}

impl OfferedItem {
    /// Label in the `"<name> (ID: <id>)"` form, with an optional suffix
    pub fn new(id: ItemId, name: &str, suffix: Option<&str>) -> Self {
        let mut label = format!("{} (ID: {})", name.trim(), id);
        if let Some(suffix) = suffix {
            label.push_str(suffix);
        }
        Self { id, label }
    }
}

/// What the bot expects next from a user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationState {
    pub tag: StateTag,
    /// The items last shown for selection
    pub offered_items: Option<Vec<OfferedItem>>,
    /// A placeholder message that should disappear once the flow moves on
    pub retractable_message_id: Option<MessageId>,
}

impl ConversationState {
    pub fn new(tag: StateTag) -> Self {
        Self {
            tag,
            offered_items: None,
            retractable_message_id: None,
        }
    }

    pub fn selecting(offered_items: Vec<OfferedItem>) -> Self {
        Self {
            tag: StateTag::WaitingForGameSelection,
            offered_items: Some(offered_items),
            retractable_message_id: None,
        }
    }

    /// Whether `id` is one of the offered items
    pub fn offers(&self, id: ItemId) -> bool {
        self.offered_items
            .as_ref()
            .is_some_and(|items| items.iter().any(|item| item.id == id))
    }
}

/// Concurrent map of pending states plus the per-user event lock
#[derive(Debug, Default)]
pub struct ConversationStore {
    states: DashMap<UserId, ConversationState>,
    locks: KeyedLocks,
}

impl ConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, user: UserId) -> Option<ConversationState> {
        self.states.get(&user).map(|entry| entry.value().clone())
    }

    /// Replace the user's state; `None` makes the user idle
    pub fn set(&self, user: UserId, state: Option<ConversationState>) {
        match state {
            Some(state) => {
                self.states.insert(user, state);
            }
            None => self.clear(user),
        }
    }

    pub fn clear(&self, user: UserId) {
        self.states.remove(&user);
    }

    /// Serialize text events of one user
    pub async fn lock(&self, user: UserId) -> OwnedMutexGuard<()> {
        self.locks.lock(user).await
    }

    /// Number of users with a pending state
    pub fn pending_count(&self) -> usize {
        self.states.len()
    }
}
