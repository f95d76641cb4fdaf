//! Conversation state machine
//!
//! Interprets free text from a user with a pending state. Two rules apply
//! before any per-state handling: "back" always returns to the main menu,
//! and a selection state without its offered list resets to idle.

use anyhow::Result;
use teloxide::types::ReplyMarkup;
use tracing::{debug, info, warn};

use crate::context::AppContext;
use crate::dialogue::{
    extract_selection_id, is_back, parse_budget, parse_item_id, validate_genre, validate_name,
    Budget, StateTag,
};
use crate::localization::{t, t_args};
use crate::models::{ItemSearchResult, Region, UserId};
use crate::state_store::{ConversationState, OfferedItem};
use crate::transport::Outbound;

use super::ui_builder::{
    back_keyboard, item_caption, item_keyboard, main_keyboard, popular_genres_line, price_suffix,
    selection_keyboard,
};

/// Ceiling used to query free items
const FREE_BUDGET_CEILING: f64 = 0.01;

/// Outcome of handling one text event
#[derive(Debug, Clone)]
pub struct Transition {
    pub replies: Vec<Outbound>,
    /// `None` leaves the user idle
    pub next: Option<ConversationState>,
}

impl Transition {
    pub fn idle(replies: Vec<Outbound>) -> Self {
        Self { replies, next: None }
    }

    pub fn to(state: ConversationState, replies: Vec<Outbound>) -> Self {
        Self {
            replies,
            next: Some(state),
        }
    }
}

enum SearchQuery {
    Name(String),
    Genre(String),
    Budget(Budget),
}

/// Advance the conversation of `user` given its pending `state`
pub async fn advance(
    ctx: &AppContext,
    user: UserId,
    state: ConversationState,
    text: &str,
) -> Result<Transition> {
    if is_back(text, &t("btn-back")) {
        if let Some(message_id) = state.retractable_message_id {
            if let Err(e) = ctx.transport.retract(user, message_id).await {
                debug!(user_id = %user, error = %e, "Placeholder already gone");
            }
        }
        debug!(user_id = %user, state = ?state.tag, "Conversation cancelled");
        return Ok(Transition::idle(vec![
            Outbound::text(t("main-menu")).with_markup(main_keyboard()),
        ]));
    }

    if state.tag == StateTag::WaitingForGameSelection && state.offered_items.is_none() {
        warn!(user_id = %user, "Selection state without offered items, resetting");
        return Ok(Transition::idle(vec![
            Outbound::text(t("internal-error")).with_markup(main_keyboard()),
        ]));
    }

    match state.tag {
        StateTag::WaitingForName => match validate_name(text) {
            Ok(name) => run_search(ctx, user, state, SearchQuery::Name(name)).await,
            Err(key) => Ok(Transition::to(state, vec![Outbound::text(t(key))])),
        },
        StateTag::WaitingForGenre => match validate_genre(text) {
            Ok(genre) => run_search(ctx, user, state, SearchQuery::Genre(genre)).await,
            Err(key) => {
                let prompt = [t(key), popular_genres_line()].join("\n\n");
                Ok(Transition::to(state, vec![Outbound::text(prompt)]))
            }
        },
        StateTag::WaitingForBudget => match parse_budget(text) {
            Ok(budget) => run_search(ctx, user, state, SearchQuery::Budget(budget)).await,
            Err(key) => Ok(Transition::to(state, vec![Outbound::text(t(key))])),
        },
        StateTag::WaitingForGameSelection => select_item(ctx, user, state, text).await,
        StateTag::WaitingForRemoveId => remove_from_wishlist(ctx, user, state, text).await,
        StateTag::WaitingForUnsubscribeId => unsubscribe_from_news(ctx, user, state, text).await,
    }
}

async fn run_search(
    ctx: &AppContext,
    user: UserId,
    mut state: ConversationState,
    query: SearchQuery,
) -> Result<Transition> {
    let placeholder = ctx.transport.send(user, &Outbound::text(t("searching"))).await?;
    state.retractable_message_id = Some(placeholder);

    let search = &ctx.search;
    let result = match &query {
        SearchQuery::Name(name) => ctx.gateway.search_by_name(name).await,
        SearchQuery::Genre(genre) => {
            ctx.gateway
                .search_by_genre(genre, search.genre_min_rating, search.genre_min_votes)
                .await
        }
        SearchQuery::Budget(Budget::Free) => ctx
            .gateway
            .search_by_budget(FREE_BUDGET_CEILING, search.budget_min_rating)
            .await
            .map(|items| items.into_iter().filter(|item| item.price == 0).collect::<Vec<_>>()),
        SearchQuery::Budget(Budget::UpTo(max)) => {
            ctx.gateway
                .search_by_budget(*max, search.budget_min_rating)
                .await
        }
    };

    if let Err(e) = ctx.transport.retract(user, placeholder).await {
        debug!(user_id = %user, error = %e, "Failed to retract placeholder");
    }
    state.retractable_message_id = None;

    let items: Vec<ItemSearchResult> = match result {
        Ok(items) => items,
        Err(e) => {
            warn!(user_id = %user, error = %e, "Search request failed");
            return Ok(Transition::to(state, vec![Outbound::text(t("search-failed"))]));
        }
    };

    if items.is_empty() {
        return Ok(Transition::to(state, vec![Outbound::text(t("nothing-found"))]));
    }

    let with_price = matches!(query, SearchQuery::Budget(_));
    // Name matches are offered in full
    let limit = match query {
        SearchQuery::Name(_) => items.len(),
        _ => search.max_offered_items,
    };
    let offered: Vec<OfferedItem> = items
        .iter()
        .take(limit)
        .map(|item| {
            let suffix = with_price.then(|| price_suffix(item.price));
            OfferedItem::new(item.id, &item.name, suffix.as_deref())
        })
        .collect();

    info!(user_id = %user, results = items.len(), offered = offered.len(), "Search completed");

    let prompt = t_args("choose-item", &[("count", &offered.len().to_string())]);
    let reply = Outbound::text(prompt).with_markup(selection_keyboard(&offered));
    Ok(Transition::to(ConversationState::selecting(offered), vec![reply]))
}

async fn select_item(
    ctx: &AppContext,
    user: UserId,
    state: ConversationState,
    text: &str,
) -> Result<Transition> {
    let offered = state.offered_items.clone().unwrap_or_default();

    let Some(id) = extract_selection_id(text).filter(|id| state.offers(*id)) else {
        debug!(user_id = %user, "Selection not among offered items");
        let reply = Outbound::text(t("selection-invalid")).with_markup(selection_keyboard(&offered));
        return Ok(Transition::to(state, vec![reply]));
    };

    let region = Region::default();
    match ctx.item_details(user, id, region).await {
        Ok(Some(details)) => Ok(Transition::idle(vec![
            Outbound::html(item_caption(&details))
                .with_markup(ReplyMarkup::InlineKeyboard(item_keyboard(&details, region))),
            Outbound::text(t("what-next")).with_markup(main_keyboard()),
        ])),
        Ok(None) => Ok(details_unavailable()),
        Err(e) => {
            warn!(user_id = %user, item_id = id, error = %e, "Failed to load item details");
            Ok(details_unavailable())
        }
    }
}

fn details_unavailable() -> Transition {
    Transition::idle(vec![
        Outbound::text(t("details-unavailable")).with_markup(main_keyboard()),
    ])
}

async fn remove_from_wishlist(
    ctx: &AppContext,
    user: UserId,
    state: ConversationState,
    text: &str,
) -> Result<Transition> {
    let id = match parse_item_id(text) {
        Ok(id) => id,
        Err(key) => {
            return Ok(Transition::to(
                state,
                vec![Outbound::text(t(key)).with_markup(back_keyboard())],
            ))
        }
    };
    let id_text = id.to_string();

    match ctx.settings.remove_from_wishlist(user, id).await {
        Ok(true) => Ok(Transition::idle(vec![
            Outbound::text(t_args("remove-success", &[("id", &id_text)]))
                .with_markup(main_keyboard()),
        ])),
        Ok(false) => Ok(Transition::to(
            state,
            vec![Outbound::text(t_args("remove-not-found", &[("id", &id_text)]))
                .with_markup(back_keyboard())],
        )),
        Err(e) => {
            warn!(user_id = %user, item_id = id, error = %e, "Failed to update wishlist");
            Ok(Transition::to(state, vec![Outbound::text(t("settings-error"))]))
        }
    }
}

async fn unsubscribe_from_news(
    ctx: &AppContext,
    user: UserId,
    state: ConversationState,
    text: &str,
) -> Result<Transition> {
    let id = match parse_item_id(text) {
        Ok(id) => id,
        Err(key) => {
            return Ok(Transition::to(
                state,
                vec![Outbound::text(t(key)).with_markup(back_keyboard())],
            ))
        }
    };
    let id_text = id.to_string();

    match ctx.settings.unsubscribe_news(user, id).await {
        Ok(true) => Ok(Transition::idle(vec![
            Outbound::text(t_args("unsubscribe-success", &[("id", &id_text)]))
                .with_markup(main_keyboard()),
        ])),
        Ok(false) => Ok(Transition::to(
            state,
            vec![Outbound::text(t_args("unsubscribe-not-found", &[("id", &id_text)]))
                .with_markup(back_keyboard())],
        )),
        Err(e) => {
            warn!(user_id = %user, item_id = id, error = %e, "Failed to update subscriptions");
            Ok(Transition::to(state, vec![Outbound::text(t("settings-error"))]))
        }
    }
}
