//! Callback Handler module for processing inline keyboard callback queries

use std::sync::Arc;

use anyhow::Result;
use teloxide::prelude::*;
use teloxide::types::MessageId;
use tracing::{debug, error, warn};

use crate::context::AppContext;
use crate::localization::t;
use crate::models::UserId;

use super::callback_router::dispatch_callback;

/// Teloxide endpoint for callback queries
pub async fn callback_handler(q: CallbackQuery, ctx: Arc<AppContext>) -> Result<()> {
    let Some(message) = &q.message else {
        debug!(user_id = %q.from.id, "Callback without message");
        ctx.transport.acknowledge(&q, None).await?;
        return Ok(());
    };

    let user = message.chat().id.0;
    let token = q.data.as_deref().unwrap_or_default();

    let toast = handle_callback(&ctx, user, message.id(), token).await;
    ctx.transport.acknowledge(&q, toast.as_deref()).await?;
    Ok(())
}

/// Apply a callback token and update the message that carried it
///
/// Returns the toast to show, if any.
pub async fn handle_callback(
    ctx: &AppContext,
    user: UserId,
    message_id: MessageId,
    token: &str,
) -> Option<String> {
    match dispatch_callback(ctx, user, token).await {
        Ok(Some(reply)) => {
            if let Some(edit) = &reply.edit {
                if let Err(e) = ctx.transport.edit(user, message_id, edit).await {
                    warn!(user_id = %user, error = %e, "Failed to update message");
                }
            }
            reply.toast
        }
        Ok(None) => {
            warn!(user_id = %user, token = %token, "Ignoring malformed callback token");
            None
        }
        Err(e) => {
            error!(user_id = %user, token = %token, error = %e, "Failed to handle callback");
            Some(t("toast-error"))
        }
    }
}
