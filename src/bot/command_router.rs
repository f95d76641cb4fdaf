//! Command Router module: the vocabulary of idle users

use std::fmt::Display;
use std::future::Future;

use anyhow::Result;
use futures::future::join_all;
use serde_json::Value;
use teloxide::types::ReplyMarkup;
use tracing::{debug, warn};

use crate::context::AppContext;
use crate::dialogue::StateTag;
use crate::gateway::GatewayError;
use crate::localization::t;
use crate::models::{ItemId, Region, UserId};
use crate::state_store::ConversationState;
use crate::transport::Outbound;

use super::state_machine::Transition;
use super::ui_builder::{
    back_keyboard, discounts_body, main_keyboard, popular_genres_line, remove_keyboard,
    sales_keyboard, search_keyboard, subscription_keyboard, wishlist_keyboard,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    Help,
    Wishlist,
    RemoveFromWishlist,
    Subscriptions,
    Unsubscribe,
    Discounts,
    SearchMenu,
    SearchByName,
    SearchByGenre,
    SearchByBudget,
    Back,
}

/// Keyboard label keys of the commands that have one
const LABELLED: &[(Command, &str)] = &[
    (Command::Wishlist, "btn-wishlist"),
    (Command::RemoveFromWishlist, "btn-remove-wishlist"),
    (Command::Subscriptions, "btn-subscriptions"),
    (Command::Unsubscribe, "btn-unsubscribe"),
    (Command::Discounts, "btn-discounts"),
    (Command::SearchMenu, "btn-search"),
    (Command::SearchByName, "btn-search-name"),
    (Command::SearchByGenre, "btn-search-genre"),
    (Command::SearchByBudget, "btn-search-budget"),
    (Command::Back, "btn-back"),
];

impl Command {
    /// Recognize a keyboard label or slash alias
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();

        let alias = match text {
            "/start" => Some(Command::Start),
            "/help" => Some(Command::Help),
            "/wishlist" => Some(Command::Wishlist),
            "/remove" => Some(Command::RemoveFromWishlist),
            "/subscriptions" => Some(Command::Subscriptions),
            "/unsubscribe" => Some(Command::Unsubscribe),
            "/discounts" => Some(Command::Discounts),
            "/search" => Some(Command::SearchMenu),
            _ if text.eq_ignore_ascii_case("back") => Some(Command::Back),
            _ => None,
        };

        alias.or_else(|| {
            LABELLED
                .iter()
                .find(|(_, key)| t(key) == text)
                .map(|(command, _)| *command)
        })
    }
}

/// Await all lookups concurrently and keep the successful ones, in order
pub async fn collect_successes<I, F, T, E>(lookups: I) -> Vec<T>
where
    I: IntoIterator<Item = F>,
    F: Future<Output = Result<T, E>>,
    E: Display,
{
    join_all(lookups)
        .await
        .into_iter()
        .filter_map(|result| match result {
            Ok(value) => Some(value),
            Err(e) => {
                debug!(error = %e, "Skipping failed lookup");
                None
            }
        })
        .collect()
}

/// Handle text from an idle user
pub async fn dispatch(ctx: &AppContext, user: UserId, text: &str) -> Result<Transition> {
    let Some(command) = Command::parse(text) else {
        return Ok(Transition::idle(vec![
            Outbound::text(t("unknown-command")).with_markup(main_keyboard()),
        ]));
    };
    debug!(user_id = %user, command = ?command, "Command received");

    let transition = match command {
        Command::Start => Transition::idle(vec![Outbound::text(format!(
            "{}\n{}",
            t("welcome"),
            t("welcome-hint")
        ))
        .with_markup(main_keyboard())]),
        Command::Help => Transition::idle(vec![Outbound::text(format!(
            "{}\n{}",
            t("help-title"),
            t("help-commands")
        ))
        .with_markup(main_keyboard())]),
        Command::Wishlist => show_item_list(ctx, user, ItemList::Wishlist).await,
        Command::Subscriptions => show_item_list(ctx, user, ItemList::Subscriptions).await,
        Command::RemoveFromWishlist => Transition::to(
            ConversationState::new(StateTag::WaitingForRemoveId),
            vec![Outbound::html(t("remove-prompt")).with_markup(back_keyboard())],
        ),
        Command::Unsubscribe => Transition::to(
            ConversationState::new(StateTag::WaitingForUnsubscribeId),
            vec![Outbound::html(t("unsubscribe-prompt")).with_markup(back_keyboard())],
        ),
        Command::Discounts => show_discounts(ctx, user).await,
        Command::SearchMenu => Transition::idle(vec![
            Outbound::text(t("search-menu")).with_markup(search_keyboard()),
        ]),
        Command::SearchByName => Transition::to(
            ConversationState::new(StateTag::WaitingForName),
            vec![Outbound::text(t("prompt-name")).with_markup(remove_keyboard())],
        ),
        Command::SearchByGenre => Transition::to(
            ConversationState::new(StateTag::WaitingForGenre),
            vec![
                Outbound::text(format!("{}\n{}", t("prompt-genre"), popular_genres_line()))
                    .with_markup(remove_keyboard()),
            ],
        ),
        Command::SearchByBudget => Transition::to(
            ConversationState::new(StateTag::WaitingForBudget),
            vec![Outbound::text(t("prompt-budget")).with_markup(remove_keyboard())],
        ),
        Command::Back => Transition::idle(vec![
            Outbound::text(t("main-menu")).with_markup(main_keyboard()),
        ]),
    };

    Ok(transition)
}

#[derive(Clone, Copy)]
enum ItemList {
    Wishlist,
    Subscriptions,
}

async fn show_item_list(ctx: &AppContext, user: UserId, list: ItemList) -> Transition {
    let settings = match ctx.settings.get(user).await {
        Ok(settings) => settings,
        Err(e) => {
            warn!(user_id = %user, error = %e, "Failed to load user settings");
            return Transition::idle(vec![Outbound::text(t("settings-error"))]);
        }
    };

    let (ids, empty_key, header_key, bullet, keyboard) = match list {
        ItemList::Wishlist => (
            &settings.wishlist,
            "wishlist-empty",
            "wishlist-header",
            "🎮",
            wishlist_keyboard(),
        ),
        ItemList::Subscriptions => (
            &settings.subscribed_items,
            "subscriptions-empty",
            "subscriptions-header",
            "▪️",
            subscription_keyboard(),
        ),
    };

    if ids.is_empty() {
        return Transition::idle(vec![
            Outbound::text(t(empty_key)).with_markup(main_keyboard()),
        ]);
    }

    let lines = collect_successes(ids.iter().map(|id| item_line(ctx, *id, bullet))).await;

    let mut text = t(header_key);
    text.push('\n');
    for line in lines {
        text.push('\n');
        text.push_str(&line);
    }

    Transition::idle(vec![Outbound::text(text).with_markup(keyboard)])
}

async fn item_line(ctx: &AppContext, id: ItemId, bullet: &str) -> Result<String, GatewayError> {
    let data = ctx
        .gateway
        .get_details(id, Region::default(), &ctx.details_language)
        .await?;

    let name = data
        .as_ref()
        .and_then(|data| data.get("name"))
        .and_then(Value::as_str)
        .ok_or_else(|| GatewayError::Unavailable(format!("no details for item {id}")))?;

    Ok(format!("{bullet} {name} (ID: {id})"))
}

async fn show_discounts(ctx: &AppContext, user: UserId) -> Transition {
    let items = match ctx.gateway.list_discounted().await {
        Ok(items) => items,
        Err(e) => {
            warn!(user_id = %user, error = %e, "Failed to load discounts");
            return Transition::idle(vec![Outbound::text(t("search-failed"))]);
        }
    };

    if items.is_empty() {
        return Transition::idle(vec![
            Outbound::text(t("discounts-empty")).with_markup(main_keyboard()),
        ]);
    }

    let subscribed = match ctx.settings.get(user).await {
        Ok(settings) => settings.subscription_on_sales,
        Err(e) => {
            warn!(user_id = %user, error = %e, "Failed to load user settings");
            false
        }
    };

    Transition::idle(vec![
        Outbound::html(discounts_body("discounts-header", &items))
            .with_markup(ReplyMarkup::InlineKeyboard(sales_keyboard(subscribed))),
        Outbound::text(t("discounts-back")).with_markup(back_keyboard()),
    ])
}
