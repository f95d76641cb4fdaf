//! # Messaging Transport
//!
//! Outbound side of the chat gateway. The engine produces [`Outbound`] and
//! [`MessageEdit`] values; a [`MessagingTransport`] delivers them.

use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::{InlineKeyboardMarkup, MessageId, ParseMode, ReplyMarkup};
use teloxide::{ApiError, RequestError};
use tracing::debug;

use crate::models::UserId;

/// A message to send
#[derive(Debug, Clone)]
pub struct Outbound {
    pub text: String,
    pub parse_mode: Option<ParseMode>,
    pub markup: Option<ReplyMarkup>,
}

impl Outbound {
    /// Plain text message
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            parse_mode: None,
            markup: None,
        }
    }

    /// HTML formatted message
    pub fn html(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            parse_mode: Some(ParseMode::Html),
            markup: None,
        }
    }

    pub fn with_markup(mut self, markup: ReplyMarkup) -> Self {
        self.markup = Some(markup);
        self
    }
}

/// In-place update of a previously sent message
#[derive(Debug, Clone)]
pub struct MessageEdit {
    /// New HTML text; `None` keeps the text and only swaps the keyboard
    pub text: Option<String>,
    pub keyboard: InlineKeyboardMarkup,
}

#[async_trait]
pub trait MessagingTransport: Send + Sync {
    /// Send a message and return its id
    async fn send(&self, user: UserId, message: &Outbound) -> anyhow::Result<MessageId>;

    async fn edit(&self, user: UserId, message_id: MessageId, edit: &MessageEdit)
        -> anyhow::Result<()>;

    /// Delete a message sent earlier
    async fn retract(&self, user: UserId, message_id: MessageId) -> anyhow::Result<()>;

    /// Answer a callback query, optionally with a toast
    async fn acknowledge(&self, query: &CallbackQuery, toast: Option<&str>) -> anyhow::Result<()>;
}

/// Transport backed by the Telegram Bot API
#[derive(Clone)]
pub struct TelegramTransport {
    bot: Bot,
}

impl TelegramTransport {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl MessagingTransport for TelegramTransport {
    async fn send(&self, user: UserId, message: &Outbound) -> anyhow::Result<MessageId> {
        let mut request = self.bot.send_message(ChatId(user), message.text.clone());
        if let Some(parse_mode) = message.parse_mode {
            request = request.parse_mode(parse_mode);
        }
        if let Some(markup) = message.markup.clone() {
            request = request.reply_markup(markup);
        }

        let sent = request.await?;
        Ok(sent.id)
    }

    async fn edit(
        &self,
        user: UserId,
        message_id: MessageId,
        edit: &MessageEdit,
    ) -> anyhow::Result<()> {
        let result = match &edit.text {
            Some(text) => self
                .bot
                .edit_message_text(ChatId(user), message_id, text.clone())
                .parse_mode(ParseMode::Html)
                .reply_markup(edit.keyboard.clone())
                .await
                .map(|_| ()),
            None => self
                .bot
                .edit_message_reply_markup(ChatId(user), message_id)
                .reply_markup(edit.keyboard.clone())
                .await
                .map(|_| ()),
        };

        match result {
            // Re-rendering identical content is not a failure
            Err(RequestError::Api(ApiError::MessageNotModified)) => {
                debug!(user_id = %user, "Message already up to date");
                Ok(())
            }
            other => Ok(other?),
        }
    }

    async fn retract(&self, user: UserId, message_id: MessageId) -> anyhow::Result<()> {
        self.bot.delete_message(ChatId(user), message_id).await?;
        Ok(())
    }

    async fn acknowledge(&self, query: &CallbackQuery, toast: Option<&str>) -> anyhow::Result<()> {
        let mut request = self.bot.answer_callback_query(query.id.clone());
        if let Some(toast) = toast {
            request = request.text(toast);
        }
        request.await?;
        Ok(())
    }
}
