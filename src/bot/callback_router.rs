//! Callback Router module: structured tokens behind inline buttons
//!
//! Tokens are colon-delimited, e.g. `addwishlist:620:ua` or `sales:on`.
//! Callbacks never touch the conversation state.

use anyhow::Result;
use tracing::info;

use crate::context::AppContext;
use crate::localization::{t, t_args};
use crate::models::{ItemId, Region, UserId};
use crate::transport::MessageEdit;

use super::ui_builder::{item_caption, item_keyboard, sales_keyboard};

/// A decoded callback token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackAction {
    AddWishlist { id: ItemId, region: Region },
    RemoveWishlist { id: ItemId, region: Region },
    SubscribeNews { id: ItemId, region: Region },
    UnsubscribeNews { id: ItemId, region: Region },
    /// Show the item in the other price view; `region` is the current one
    Convert { id: ItemId, region: Region },
    Sales(bool),
}

impl CallbackAction {
    /// Decode a token; `None` for anything malformed
    pub fn parse(token: &str) -> Option<Self> {
        let parts: Vec<&str> = token.trim().split(':').collect();

        match parts.as_slice() {
            ["sales", "on"] => Some(CallbackAction::Sales(true)),
            ["sales", "off"] => Some(CallbackAction::Sales(false)),
            [action, id, region] => {
                let id: ItemId = id.parse().ok()?;
                let region = Region::parse(region)?;
                match *action {
                    "addwishlist" => Some(CallbackAction::AddWishlist { id, region }),
                    "removewishlist" => Some(CallbackAction::RemoveWishlist { id, region }),
                    "subscribe_news" => Some(CallbackAction::SubscribeNews { id, region }),
                    "unsubscribe_news" => Some(CallbackAction::UnsubscribeNews { id, region }),
                    "convert" => Some(CallbackAction::Convert { id, region }),
                    _ => None,
                }
            }
            _ => None,
        }
    }

    pub fn to_token(&self) -> String {
        match self {
            CallbackAction::AddWishlist { id, region } => format!("addwishlist:{id}:{region}"),
            CallbackAction::RemoveWishlist { id, region } => format!("removewishlist:{id}:{region}"),
            CallbackAction::SubscribeNews { id, region } => format!("subscribe_news:{id}:{region}"),
            CallbackAction::UnsubscribeNews { id, region } => {
                format!("unsubscribe_news:{id}:{region}")
            }
            CallbackAction::Convert { id, region } => format!("convert:{id}:{region}"),
            CallbackAction::Sales(true) => "sales:on".to_string(),
            CallbackAction::Sales(false) => "sales:off".to_string(),
        }
    }
}

/// What to do with the message that carried the button
#[derive(Debug, Clone)]
pub struct CallbackReply {
    pub edit: Option<MessageEdit>,
    pub toast: Option<String>,
}

/// Which parts of an item message to re-render
#[derive(Clone, Copy)]
enum Render {
    TextAndKeyboard,
    KeyboardOnly,
}

/// Handle a callback token from `user`
///
/// Returns `Ok(None)` for malformed tokens.
pub async fn dispatch_callback(
    ctx: &AppContext,
    user: UserId,
    token: &str,
) -> Result<Option<CallbackReply>> {
    let Some(action) = CallbackAction::parse(token) else {
        return Ok(None);
    };

    let reply = match action {
        CallbackAction::AddWishlist { id, region } => {
            ctx.settings.add_to_wishlist(user, id).await?;
            info!(user_id = %user, item_id = id, "Added to wishlist");
            rerender_item(ctx, user, id, region, Render::TextAndKeyboard, t("toast-wishlist-added"))
                .await?
        }
        CallbackAction::RemoveWishlist { id, region } => {
            ctx.settings.remove_from_wishlist(user, id).await?;
            info!(user_id = %user, item_id = id, "Removed from wishlist");
            rerender_item(ctx, user, id, region, Render::TextAndKeyboard, t("toast-wishlist-removed"))
                .await?
        }
        CallbackAction::SubscribeNews { id, region } => {
            ctx.settings.subscribe_news(user, id).await?;
            rerender_item(ctx, user, id, region, Render::KeyboardOnly, t("toast-news-subscribed"))
                .await?
        }
        CallbackAction::UnsubscribeNews { id, region } => {
            let toast = if ctx.settings.unsubscribe_news(user, id).await? {
                t("toast-news-unsubscribed")
            } else {
                t("toast-news-not-subscribed")
            };
            rerender_item(ctx, user, id, region, Render::KeyboardOnly, toast).await?
        }
        CallbackAction::Convert { id, region } => {
            let target = region.other();
            rerender_item(
                ctx,
                user,
                id,
                target,
                Render::TextAndKeyboard,
                t_args("toast-converted", &[("region", target.code())]),
            )
            .await?
        }
        CallbackAction::Sales(enabled) => {
            ctx.settings.set_sales_subscription(user, enabled).await?;
            let settings = ctx.settings.get(user).await?;
            info!(user_id = %user, enabled, "Discount digest subscription changed");
            CallbackReply {
                edit: Some(MessageEdit {
                    text: None,
                    keyboard: sales_keyboard(settings.subscription_on_sales),
                }),
                toast: Some(if settings.subscription_on_sales {
                    t("toast-sales-on")
                } else {
                    t("toast-sales-off")
                }),
            }
        }
    };

    Ok(Some(reply))
}

async fn rerender_item(
    ctx: &AppContext,
    user: UserId,
    id: ItemId,
    region: Region,
    render: Render,
    toast: String,
) -> Result<CallbackReply> {
    let Some(details) = ctx.item_details(user, id, region).await? else {
        return Ok(CallbackReply {
            edit: None,
            toast: Some(t("details-unavailable")),
        });
    };

    let text = match render {
        Render::TextAndKeyboard => Some(item_caption(&details)),
        Render::KeyboardOnly => None,
    };

    Ok(CallbackReply {
        edit: Some(MessageEdit {
            text,
            keyboard: item_keyboard(&details, region),
        }),
        toast: Some(toast),
    })
}
