//! UI Builder module for creating keyboards and formatting messages

use teloxide::types::{
    InlineKeyboardButton, InlineKeyboardMarkup, KeyboardButton, KeyboardMarkup, KeyboardRemove,
    ReplyMarkup,
};
use teloxide::utils::html;

use crate::config::DIGEST_SIZE;
use crate::dialogue::POPULAR_GENRES;
use crate::localization::{t, t_args};
use crate::models::{ItemDetails, ItemSearchResult, NewsEntry, Region, STORE_APP_URL};
use crate::state_store::OfferedItem;

use super::callback_router::CallbackAction;

fn reply_keyboard(label_keys: &[&str]) -> ReplyMarkup {
    let rows: Vec<Vec<KeyboardButton>> = label_keys
        .iter()
        .map(|key| vec![KeyboardButton::new(t(key))])
        .collect();
    ReplyMarkup::Keyboard(KeyboardMarkup::new(rows).resize_keyboard())
}

pub fn main_keyboard() -> ReplyMarkup {
    reply_keyboard(&["btn-wishlist", "btn-search", "btn-subscriptions", "btn-discounts"])
}

pub fn search_keyboard() -> ReplyMarkup {
    reply_keyboard(&[
        "btn-search-name",
        "btn-search-genre",
        "btn-search-budget",
        "btn-back",
    ])
}

pub fn wishlist_keyboard() -> ReplyMarkup {
    reply_keyboard(&["btn-remove-wishlist", "btn-back"])
}

pub fn subscription_keyboard() -> ReplyMarkup {
    reply_keyboard(&["btn-unsubscribe", "btn-back"])
}

pub fn back_keyboard() -> ReplyMarkup {
    reply_keyboard(&["btn-back"])
}

pub fn remove_keyboard() -> ReplyMarkup {
    ReplyMarkup::KeyboardRemove(KeyboardRemove::new())
}

/// One row per offered item, then a back row
pub fn selection_keyboard(items: &[OfferedItem]) -> ReplyMarkup {
    let mut rows: Vec<Vec<KeyboardButton>> = items
        .iter()
        .map(|item| vec![KeyboardButton::new(item.label.clone())])
        .collect();
    rows.push(vec![KeyboardButton::new(t("btn-back"))]);
    ReplyMarkup::Keyboard(KeyboardMarkup::new(rows).resize_keyboard())
}

/// The popular genres line appended to genre prompts
pub fn popular_genres_line() -> String {
    t_args("popular-genres", &[("genres", &POPULAR_GENRES.join(", "))])
}

/// Price suffix for budget search labels
pub fn price_suffix(price_cents: i64) -> String {
    if price_cents <= 0 {
        format!(" – {}", t("caption-free"))
    } else {
        format!(" – ${:.2}", price_cents as f64 / 100.0)
    }
}

/// HTML caption describing an item
pub fn item_caption(details: &ItemDetails) -> String {
    let price = match &details.price_text {
        _ if details.is_free => t("caption-free"),
        Some(price) => price.clone(),
        None => t("caption-unavailable"),
    };

    let mut sections = vec![format!(
        "<b>{}</b>\n{}",
        html::escape(&details.name),
        html::escape(&t_args("caption-price", &[("price", &price)]))
    )];

    if !details.short_description.is_empty() {
        sections.push(html::escape(&details.short_description));
    }

    if !details.min_requirements.is_empty() {
        sections.push(format!(
            "{}\n{}",
            html::escape(&t("caption-requirements")),
            html::escape(&details.min_requirements)
        ));
    }

    let mut facts = Vec::new();
    if let Some(score) = details.metacritic_score {
        facts.push(t_args("caption-metacritic", &[("score", &score.to_string())]));
    }
    facts.push(t_args(
        "caption-reviews",
        &[("count", &details.reviews_count.to_string())],
    ));
    if !details.genres.is_empty() {
        facts.push(t_args("caption-genres", &[("genres", &details.genres.join(", "))]));
    }
    sections.push(html::escape(&facts.join("\n")));

    if !details.hashtags.is_empty() {
        let tags: Vec<String> = details.hashtags.iter().map(|tag| format!("#{tag}")).collect();
        sections.push(tags.join(" "));
    }

    sections.join("\n\n")
}

/// Inline keyboard under an item caption
pub fn item_keyboard(details: &ItemDetails, region: Region) -> InlineKeyboardMarkup {
    let mut rows = Vec::new();

    let mut links = Vec::new();
    if let Ok(url) = reqwest::Url::parse(&details.store_url) {
        links.push(InlineKeyboardButton::url(t("btn-store"), url));
    }
    if let Some(url) = details
        .trailer_url
        .as_deref()
        .and_then(|url| reqwest::Url::parse(url).ok())
    {
        links.push(InlineKeyboardButton::url(t("btn-trailer"), url));
    }
    if !links.is_empty() {
        rows.push(links);
    }

    let (wishlist_label, wishlist_action) = if details.in_wishlist {
        ("btn-drop-wishlist", CallbackAction::RemoveWishlist { id: details.id, region })
    } else {
        ("btn-add-wishlist", CallbackAction::AddWishlist { id: details.id, region })
    };
    rows.push(vec![InlineKeyboardButton::callback(
        t(wishlist_label),
        wishlist_action.to_token(),
    )]);

    let (news_label, news_action) = if details.subscribed {
        ("btn-unsubscribe-news", CallbackAction::UnsubscribeNews { id: details.id, region })
    } else {
        ("btn-subscribe-news", CallbackAction::SubscribeNews { id: details.id, region })
    };
    rows.push(vec![InlineKeyboardButton::callback(
        t(news_label),
        news_action.to_token(),
    )]);

    if details.is_priced() {
        rows.push(vec![InlineKeyboardButton::callback(
            t_args("btn-convert", &[("region", region.other().code())]),
            CallbackAction::Convert { id: details.id, region }.to_token(),
        )]);
    }

    InlineKeyboardMarkup::new(rows)
}

/// Toggle for the discount digest subscription
pub fn sales_keyboard(subscribed: bool) -> InlineKeyboardMarkup {
    let (label, action) = if subscribed {
        ("btn-sales-off", CallbackAction::Sales(false))
    } else {
        ("btn-sales-on", CallbackAction::Sales(true))
    };
    InlineKeyboardMarkup::new(vec![vec![InlineKeyboardButton::callback(
        t(label),
        action.to_token(),
    )]])
}

/// HTML list of the first discounted items under a header
pub fn discounts_body(header_key: &str, items: &[ItemSearchResult]) -> String {
    let lines: Vec<String> = items
        .iter()
        .take(DIGEST_SIZE)
        .map(|item| {
            format!(
                "▪️ {} (ID: {}) – {}%",
                html::escape(&item.name),
                item.id,
                item.discount
            )
        })
        .collect();

    format!("{}\n\n{}", t(header_key), lines.join("\n"))
}

/// HTML body of the periodic discount digest
pub fn discount_digest(items: &[ItemSearchResult]) -> String {
    let entries: Vec<String> = items
        .iter()
        .take(DIGEST_SIZE)
        .map(|item| {
            format!(
                "🎮 <b>{}</b>\n{}\n{}/{}",
                html::escape(&item.name),
                t_args("digest-discount", &[("discount", &item.discount.to_string())]),
                STORE_APP_URL,
                item.id
            )
        })
        .collect();

    format!("{}\n\n{}", t("digest-discounts-header"), entries.join("\n\n"))
}

/// HTML news notification for one item
pub fn news_message(entry: &NewsEntry) -> String {
    let title = t_args("digest-news", &[("title", &html::escape(&entry.title))]);
    if entry.url.is_empty() {
        title
    } else {
        format!("{}\n{}", title, html::escape(&entry.url))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UserSettings;
    use serde_json::json;

    fn sample_details(is_free: bool) -> ItemDetails {
        let data = json!({
            "name": "Tom & Jerry",
            "is_free": is_free,
            "short_description": "A <chase> game",
            "price_overview": { "final_formatted": "$4.99" },
            "genres": [{ "description": "Casual" }]
        });
        ItemDetails::from_json(&data, 42, &UserSettings::new(1))
    }

    fn callback_data(markup: &InlineKeyboardMarkup) -> Vec<String> {
        markup
            .inline_keyboard
            .iter()
            .flatten()
            .filter_map(|button| match &button.kind {
                teloxide::types::InlineKeyboardButtonKind::CallbackData(data) => Some(data.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_caption_escapes_html() {
        let caption = item_caption(&sample_details(false));
        assert!(caption.starts_with("<b>Tom &amp; Jerry</b>"));
        assert!(caption.contains("A &lt;chase&gt; game"));
        assert!(caption.contains("$4.99"));
        assert!(caption.contains("#casual"));
    }

    #[test]
    fn test_item_keyboard_tokens() {
        let tokens = callback_data(&item_keyboard(&sample_details(false), Region::Ua));
        assert_eq!(
            tokens,
            vec!["addwishlist:42:ua", "subscribe_news:42:ua", "convert:42:ua"]
        );
    }

    #[test]
    fn test_free_item_has_no_conversion() {
        let tokens = callback_data(&item_keyboard(&sample_details(true), Region::Us));
        assert!(tokens.iter().all(|token| !token.starts_with("convert")));
    }

    #[test]
    fn test_sales_keyboard_toggles() {
        assert_eq!(callback_data(&sales_keyboard(false)), vec!["sales:on"]);
        assert_eq!(callback_data(&sales_keyboard(true)), vec!["sales:off"]);
    }

    #[test]
    fn test_discounts_body_is_capped() {
        let items: Vec<ItemSearchResult> = (1..=15)
            .map(|id| ItemSearchResult {
                id,
                name: format!("Game {id}"),
                discount: 50,
                ..Default::default()
            })
            .collect();
        let body = discounts_body("discounts-header", &items);
        assert!(body.contains("Game 10 (ID: 10)"));
        assert!(!body.contains("Game 11"));
    }

    #[test]
    fn test_digest_bodies() {
        let digest = discount_digest(&[ItemSearchResult {
            id: 620,
            name: "Portal 2".to_string(),
            discount: 80,
            ..Default::default()
        }]);
        assert!(digest.contains("<b>Portal 2</b>"));
        assert!(digest.contains("80%"));
        assert!(digest.contains("https://store.steampowered.com/app/620"));

        let news = news_message(&NewsEntry {
            title: "Patch <1.2>".to_string(),
            url: "https://example.com/news".to_string(),
        });
        assert_eq!(news, "📰 <b>Patch &lt;1.2&gt;</b>\nhttps://example.com/news");
    }

    #[test]
    fn test_price_suffix() {
        assert_eq!(price_suffix(0), " – Free");
        assert_eq!(price_suffix(1999), " – $19.99");
    }
}
