//! In-memory doubles for the backend gateway and the messaging transport.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicI32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::anyhow;
use async_trait::async_trait;
use serde_json::{json, Value};
use teloxide::types::{CallbackQuery, MessageId, ReplyMarkup};
use tokio::sync::Semaphore;

use game_deals_bot::config::SearchConfig;
use game_deals_bot::context::AppContext;
use game_deals_bot::gateway::{BackendGateway, GatewayError};
use game_deals_bot::models::{ItemId, ItemSearchResult, NewsEntry, Region, UserId, UserSettings};
use game_deals_bot::transport::{MessageEdit, MessagingTransport, Outbound};

pub fn item(id: ItemId, name: &str, price: i64) -> ItemSearchResult {
    ItemSearchResult {
        id,
        name: name.to_string(),
        discount: 50,
        rating: 90,
        price,
    }
}

/// Raw product data as the backend returns it
pub fn game_data(name: &str) -> Value {
    json!({
        "name": name,
        "short_description": format!("About {name}"),
        "price_overview": { "final_formatted": "$9.99" },
        "genres": [{ "description": "Action" }]
    })
}

#[derive(Default)]
pub struct MockGateway {
    pub users: Mutex<HashMap<UserId, UserSettings>>,
    pub search_results: Mutex<Vec<ItemSearchResult>>,
    pub discounted: Mutex<Vec<ItemSearchResult>>,
    pub details: Mutex<HashMap<ItemId, Value>>,
    pub failing_details: Mutex<HashSet<ItemId>>,
    pub news: Mutex<HashMap<ItemId, Vec<NewsEntry>>>,
    pub fail_search: AtomicBool,
    pub fail_settings: AtomicBool,
    pub fail_user_list: AtomicBool,
    pub puts: AtomicUsize,
    pub search_calls: AtomicUsize,
    pub news_calls: AtomicUsize,
    pub budget_queries: Mutex<Vec<(f64, u32)>>,
    /// When set, name searches wait for a permit before answering
    pub search_gate: Mutex<Option<Arc<Semaphore>>>,
    pub genre_queries: Mutex<Vec<(String, u32, u32)>>,
    pub detail_regions: Mutex<Vec<Region>>,
}

impl MockGateway {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_user(&self, settings: UserSettings) {
        self.users.lock().unwrap().insert(settings.chat_id, settings);
    }

    pub fn with_search_results(&self, items: Vec<ItemSearchResult>) {
        *self.search_results.lock().unwrap() = items;
    }

    pub fn with_discounted(&self, items: Vec<ItemSearchResult>) {
        *self.discounted.lock().unwrap() = items;
    }

    pub fn with_details(&self, id: ItemId, data: Value) {
        self.details.lock().unwrap().insert(id, data);
    }

    pub fn with_failing_details(&self, id: ItemId) {
        self.failing_details.lock().unwrap().insert(id);
    }

    pub fn with_news(&self, id: ItemId, title: &str) {
        self.news.lock().unwrap().insert(
            id,
            vec![NewsEntry {
                title: title.to_string(),
                url: format!("https://news.example/{id}"),
            }],
        );
    }

    /// Hold name searches until the returned semaphore gets a permit
    pub fn gate_searches(&self) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        *self.search_gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    pub fn stored(&self, user: UserId) -> Option<UserSettings> {
        self.users.lock().unwrap().get(&user).cloned()
    }

    pub fn put_count(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }

    fn search(&self) -> Result<Vec<ItemSearchResult>, GatewayError> {
        if self.fail_search.load(Ordering::SeqCst) {
            return Err(GatewayError::Timeout);
        }
        Ok(self.search_results.lock().unwrap().clone())
    }
}

#[async_trait]
impl BackendGateway for MockGateway {
    async fn search_by_name(&self, _name: &str) -> Result<Vec<ItemSearchResult>, GatewayError> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        let gate = self.search_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            let _permit = gate.acquire().await.expect("search gate closed");
        }
        self.search()
    }

    async fn search_by_genre(
        &self,
        genre: &str,
        min_rating: u32,
        min_votes: u32,
    ) -> Result<Vec<ItemSearchResult>, GatewayError> {
        self.genre_queries
            .lock()
            .unwrap()
            .push((genre.to_string(), min_rating, min_votes));
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        self.search()
    }

    async fn search_by_budget(
        &self,
        max_dollars: f64,
        min_rating: u32,
    ) -> Result<Vec<ItemSearchResult>, GatewayError> {
        self.budget_queries.lock().unwrap().push((max_dollars, min_rating));
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        self.search()
    }

    async fn list_discounted(&self) -> Result<Vec<ItemSearchResult>, GatewayError> {
        Ok(self.discounted.lock().unwrap().clone())
    }

    async fn get_details(
        &self,
        item_id: ItemId,
        region: Region,
        _language: &str,
    ) -> Result<Option<Value>, GatewayError> {
        self.detail_regions.lock().unwrap().push(region);
        if self.failing_details.lock().unwrap().contains(&item_id) {
            return Err(GatewayError::Unavailable("details down".to_string()));
        }
        Ok(self.details.lock().unwrap().get(&item_id).cloned())
    }

    async fn get_news(&self, item_id: ItemId) -> Vec<NewsEntry> {
        self.news_calls.fetch_add(1, Ordering::SeqCst);
        self.news
            .lock()
            .unwrap()
            .get(&item_id)
            .cloned()
            .unwrap_or_default()
    }

    async fn get_user_settings(&self, user_id: UserId) -> Result<UserSettings, GatewayError> {
        if self.fail_settings.load(Ordering::SeqCst) {
            return Err(GatewayError::Timeout);
        }
        Ok(self
            .users
            .lock()
            .unwrap()
            .get(&user_id)
            .cloned()
            .unwrap_or_else(|| UserSettings::new(user_id)))
    }

    async fn put_user_settings(&self, settings: &UserSettings) -> Result<(), GatewayError> {
        if self.fail_settings.load(Ordering::SeqCst) {
            return Err(GatewayError::Timeout);
        }
        self.puts.fetch_add(1, Ordering::SeqCst);
        self.users
            .lock()
            .unwrap()
            .insert(settings.chat_id, settings.clone());
        Ok(())
    }

    async fn list_all_users(&self) -> Result<Vec<UserSettings>, GatewayError> {
        if self.fail_user_list.load(Ordering::SeqCst) {
            return Err(GatewayError::Timeout);
        }
        let mut users: Vec<UserSettings> = self.users.lock().unwrap().values().cloned().collect();
        users.sort_by_key(|user| user.chat_id);
        Ok(users)
    }
}

#[derive(Default)]
pub struct MockTransport {
    pub sent: Mutex<Vec<(UserId, Outbound)>>,
    pub edits: Mutex<Vec<(UserId, MessageId, MessageEdit)>>,
    pub retracted: Mutex<Vec<(UserId, MessageId)>>,
    pub failing_users: Mutex<HashSet<UserId>>,
    pub fail_all_sends: AtomicBool,
    next_id: AtomicI32,
}

impl MockTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail_for(&self, user: UserId) {
        self.failing_users.lock().unwrap().insert(user);
    }

    /// Texts delivered to `user`, in order
    pub fn texts_for(&self, user: UserId) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|(to, _)| *to == user)
            .map(|(_, message)| message.text.clone())
            .collect()
    }

    pub fn last_for(&self, user: UserId) -> Option<Outbound> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(to, _)| *to == user)
            .map(|(_, message)| message.clone())
    }

    pub fn clear(&self) {
        self.sent.lock().unwrap().clear();
        self.edits.lock().unwrap().clear();
        self.retracted.lock().unwrap().clear();
    }
}

#[async_trait]
impl MessagingTransport for MockTransport {
    async fn send(&self, user: UserId, message: &Outbound) -> anyhow::Result<MessageId> {
        if self.fail_all_sends.load(Ordering::SeqCst)
            || self.failing_users.lock().unwrap().contains(&user)
        {
            return Err(anyhow!("chat {user} unreachable"));
        }
        self.sent.lock().unwrap().push((user, message.clone()));
        Ok(MessageId(self.next_id.fetch_add(1, Ordering::SeqCst) + 1))
    }

    async fn edit(
        &self,
        user: UserId,
        message_id: MessageId,
        edit: &MessageEdit,
    ) -> anyhow::Result<()> {
        self.edits
            .lock()
            .unwrap()
            .push((user, message_id, edit.clone()));
        Ok(())
    }

    async fn retract(&self, user: UserId, message_id: MessageId) -> anyhow::Result<()> {
        self.retracted.lock().unwrap().push((user, message_id));
        Ok(())
    }

    async fn acknowledge(
        &self,
        _query: &CallbackQuery,
        _toast: Option<&str>,
    ) -> anyhow::Result<()> {
        Ok(())
    }
}

pub fn context(gateway: &Arc<MockGateway>, transport: &Arc<MockTransport>) -> AppContext {
    AppContext::new(
        gateway.clone(),
        transport.clone(),
        SearchConfig::default(),
        "english",
    )
}

/// Labels of a reply keyboard, row by row
pub fn keyboard_labels(markup: &Option<ReplyMarkup>) -> Vec<String> {
    match markup {
        Some(ReplyMarkup::Keyboard(keyboard)) => keyboard
            .keyboard
            .iter()
            .flatten()
            .map(|button| button.text.clone())
            .collect(),
        _ => Vec::new(),
    }
}
