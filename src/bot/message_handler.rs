//! Message Handler module for processing incoming Telegram messages

use std::sync::Arc;

use anyhow::Result;
use teloxide::prelude::*;
use tracing::{debug, error};

use crate::context::AppContext;
use crate::localization::t;
use crate::models::UserId;
use crate::transport::Outbound;

use super::command_router::dispatch;
use super::state_machine::advance;
use super::ui_builder::main_keyboard;

/// Teloxide endpoint for messages
pub async fn message_handler(msg: Message, ctx: Arc<AppContext>) -> Result<()> {
    let user = msg.chat.id.0;

    let Some(text) = msg.text() else {
        debug!(user_id = %user, "Ignoring non-text message");
        return Ok(());
    };

    handle_text(&ctx, user, text).await;
    Ok(())
}

/// Route one text event of `user`
///
/// Events of the same user are handled one at a time. An error escaping the
/// routing clears the pending state and is reported with a generic message.
pub async fn handle_text(ctx: &AppContext, user: UserId, text: &str) {
    let _guard = ctx.states.lock(user).await;

    if let Err(e) = route_text(ctx, user, text).await {
        error!(user_id = %user, error = %e, "Failed to handle message");
        ctx.states.clear(user);

        let notice = Outbound::text(t("error-generic")).with_markup(main_keyboard());
        if let Err(e) = ctx.transport.send(user, &notice).await {
            error!(user_id = %user, error = %e, "Failed to send error notice");
        }
    }
}

async fn route_text(ctx: &AppContext, user: UserId, text: &str) -> Result<()> {
    let transition = match ctx.states.get(user) {
        Some(state) => {
            debug!(user_id = %user, state = ?state.tag, "Advancing conversation");
            advance(ctx, user, state, text).await?
        }
        None => dispatch(ctx, user, text).await?,
    };

    ctx.states.set(user, transition.next);

    for reply in &transition.replies {
        ctx.transport.send(user, reply).await?;
    }

    Ok(())
}
