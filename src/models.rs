//! # Data Model
//!
//! Records exchanged with the backend API and the derived item view shown to
//! users. Wire names follow the backend's JSON (camelCase, PascalCase accepted
//! on read).

use std::collections::BTreeSet;
use std::fmt;

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Chat identifier of a user
pub type UserId = i64;

/// Catalog identifier of an item
pub type ItemId = u32;

/// Public store page for an item
pub const STORE_APP_URL: &str = "https://store.steampowered.com/app";

lazy_static! {
    static ref HTML_TAG_REGEX: Regex = Regex::new(r"<[^>]*>").expect("HTML tag pattern should be valid");
    static ref HASHTAG_STRIP_REGEX: Regex =
        Regex::new(r"[^a-z0-9]").expect("Hashtag pattern should be valid");
}

/// Per-user settings owned by the backend
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSettings {
    #[serde(alias = "ChatId")]
    pub chat_id: UserId,
    #[serde(default, alias = "Wishlist", deserialize_with = "null_as_default")]
    pub wishlist: BTreeSet<ItemId>,
    #[serde(default, alias = "SubscriptionOnSales")]
    pub subscription_on_sales: bool,
    #[serde(
        default,
        rename = "subscribedGames",
        alias = "SubscribedGames",
        deserialize_with = "null_as_default"
    )]
    pub subscribed_items: BTreeSet<ItemId>,
}

impl UserSettings {
    /// Empty settings record for a user the backend does not know yet
    pub fn new(chat_id: UserId) -> Self {
        Self {
            chat_id,
            ..Default::default()
        }
    }
}

/// One row of a search, budget or discount listing
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemSearchResult {
    #[serde(alias = "Id")]
    pub id: ItemId,
    #[serde(default, alias = "Name", deserialize_with = "null_as_default")]
    pub name: String,
    /// Discount in percent
    #[serde(default, alias = "Discount")]
    pub discount: i32,
    #[serde(default, alias = "Rating")]
    pub rating: i32,
    /// Price in minor currency units (cents)
    #[serde(default, alias = "Price")]
    pub price: i64,
}

/// A news post about an item
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewsEntry {
    #[serde(default, alias = "Title", deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default, alias = "Url", deserialize_with = "null_as_default")]
    pub url: String,
}

/// The two supported price views
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Region {
    #[default]
    Ua,
    Us,
}

impl Region {
    /// Country code sent to the backend
    pub fn code(self) -> &'static str {
        match self {
            Region::Ua => "UA",
            Region::Us => "US",
        }
    }

    /// Parse a region code, case-insensitive
    pub fn parse(code: &str) -> Option<Self> {
        match code.trim().to_ascii_uppercase().as_str() {
            "UA" => Some(Region::Ua),
            "US" => Some(Region::Us),
            _ => None,
        }
    }

    /// The price view offered by the conversion button
    pub fn other(self) -> Self {
        match self {
            Region::Ua => Region::Us,
            Region::Us => Region::Ua,
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.code().to_ascii_lowercase())
    }
}

/// Read-only view of an item, derived from raw product data and the
/// viewer's wishlist and subscriptions
#[derive(Debug, Clone, PartialEq)]
pub struct ItemDetails {
    pub id: ItemId,
    pub name: String,
    /// Formatted price, `None` when the store has no price for the region
    pub price_text: Option<String>,
    pub is_free: bool,
    pub short_description: String,
    pub min_requirements: String,
    pub metacritic_score: Option<i64>,
    pub reviews_count: i64,
    pub genres: Vec<String>,
    pub hashtags: Vec<String>,
    pub store_url: String,
    pub trailer_url: Option<String>,
    pub in_wishlist: bool,
    pub subscribed: bool,
}

impl ItemDetails {
    /// Build the view from the backend's `data` object
    pub fn from_json(data: &Value, id: ItemId, settings: &UserSettings) -> Self {
        let str_at = |pointer: &str| {
            data.pointer(pointer)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };

        let price_text = data
            .get("price_overview")
            .filter(|overview| overview.is_object())
            .and_then(|overview| {
                let final_price = overview.get("final_formatted")?.as_str()?.trim();
                if final_price.is_empty() {
                    return None;
                }
                let initial = overview
                    .get("initial_formatted")
                    .and_then(Value::as_str)
                    .unwrap_or_default();
                let discount = overview
                    .get("discount_percent")
                    .and_then(Value::as_i64)
                    .unwrap_or(0);

                Some(if discount > 0 && !initial.is_empty() {
                    format!("{initial} ➔ {final_price} (-{discount}%)")
                } else {
                    final_price.to_string()
                })
            });

        let is_free = data.get("is_free").and_then(Value::as_bool).unwrap_or(false);

        let min_requirements = HTML_TAG_REGEX
            .replace_all(&str_at("/pc_requirements/minimum"), "")
            .trim()
            .trim_start_matches("Minimum:")
            .trim()
            .to_string();

        let genres = descriptions(data.get("genres"));
        let categories = descriptions(data.get("categories"));

        let mut hashtags: Vec<String> = Vec::new();
        for label in genres.iter().chain(categories.iter()) {
            let tag = HASHTAG_STRIP_REGEX
                .replace_all(&label.to_lowercase(), "")
                .to_string();
            if !tag.is_empty() && !hashtags.contains(&tag) {
                hashtags.push(tag);
            }
        }

        let trailer_url = data
            .pointer("/movies/0/mp4/max")
            .and_then(Value::as_str)
            .filter(|url| !url.is_empty())
            .map(str::to_string);

        Self {
            id,
            name: str_at("/name"),
            price_text,
            is_free,
            short_description: str_at("/short_description"),
            min_requirements,
            metacritic_score: data.pointer("/metacritic/score").and_then(Value::as_i64),
            reviews_count: data
                .pointer("/recommendations/total")
                .and_then(Value::as_i64)
                .unwrap_or(0),
            genres,
            hashtags,
            store_url: format!("{STORE_APP_URL}/{id}"),
            trailer_url,
            in_wishlist: settings.wishlist.contains(&id),
            subscribed: settings.subscribed_items.contains(&id),
        }
    }

    /// Whether a price conversion makes sense for this item
    pub fn is_priced(&self) -> bool {
        !self.is_free && self.price_text.is_some()
    }
}

fn descriptions(list: Option<&Value>) -> Vec<String> {
    list.and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.get("description").and_then(Value::as_str))
                .filter(|description| !description.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_user_settings_wire_format() {
        let settings: UserSettings = serde_json::from_value(json!({
            "chatId": 7,
            "wishlist": [3, 1, 3],
            "subscriptionOnSales": true,
            "subscribedGames": null
        }))
        .unwrap();

        assert_eq!(settings.chat_id, 7);
        assert_eq!(settings.wishlist.iter().copied().collect::<Vec<_>>(), vec![1, 3]);
        assert!(settings.subscription_on_sales);
        assert!(settings.subscribed_items.is_empty());

        let encoded = serde_json::to_value(&settings).unwrap();
        assert_eq!(encoded["subscribedGames"], json!([]));
        assert_eq!(encoded["chatId"], json!(7));
    }

    #[test]
    fn test_user_settings_accepts_pascal_case() {
        let settings: UserSettings = serde_json::from_value(json!({
            "ChatId": 9,
            "Wishlist": [10],
            "SubscriptionOnSales": false,
            "SubscribedGames": [20]
        }))
        .unwrap();

        assert!(settings.wishlist.contains(&10));
        assert!(settings.subscribed_items.contains(&20));
    }

    #[test]
    fn test_region_parsing() {
        assert_eq!(Region::parse("ua"), Some(Region::Ua));
        assert_eq!(Region::parse("US"), Some(Region::Us));
        assert_eq!(Region::parse("eu"), None);
        assert_eq!(Region::Ua.other(), Region::Us);
        assert_eq!(Region::Us.to_string(), "us");
    }

    #[test]
    fn test_item_details_from_json() {
        let data = json!({
            "name": "Portal 2",
            "short_description": "Puzzle game",
            "price_overview": {
                "final_formatted": "$1.99",
                "initial_formatted": "$9.99",
                "discount_percent": 80
            },
            "pc_requirements": { "minimum": "<strong>Minimum:</strong><br><ul><li>OS: Windows 7</li></ul>" },
            "metacritic": { "score": 95 },
            "recommendations": { "total": 1234 },
            "genres": [{ "description": "Action" }, { "description": "Adventure" }],
            "categories": [{ "description": "Single-player" }, { "description": "Action" }],
            "movies": [{ "mp4": { "max": "https://cdn.example/trailer.mp4" } }]
        });
        let mut settings = UserSettings::new(1);
        settings.wishlist.insert(620);

        let details = ItemDetails::from_json(&data, 620, &settings);

        assert_eq!(details.name, "Portal 2");
        assert_eq!(details.price_text.as_deref(), Some("$9.99 ➔ $1.99 (-80%)"));
        assert_eq!(details.min_requirements, "OS: Windows 7");
        assert_eq!(details.metacritic_score, Some(95));
        assert_eq!(details.reviews_count, 1234);
        assert_eq!(details.hashtags, vec!["action", "adventure", "singleplayer"]);
        assert_eq!(details.store_url, "https://store.steampowered.com/app/620");
        assert!(details.trailer_url.is_some());
        assert!(details.in_wishlist);
        assert!(!details.subscribed);
        assert!(details.is_priced());
    }

    #[test]
    fn test_free_item_is_not_priced() {
        let data = json!({ "name": "Dota 2", "is_free": true });
        let details = ItemDetails::from_json(&data, 570, &UserSettings::new(1));

        assert!(details.is_free);
        assert_eq!(details.price_text, None);
        assert!(!details.is_priced());
        assert_eq!(details.metacritic_score, None);
    }
}
