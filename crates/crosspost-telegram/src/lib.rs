// SPDX-FileCopyrightText: 2026 Crosspost Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Telegram transport for the Crosspost control plane.
//!
//! Two halves: [`TelegramNotifier`] implements the outbound
//! [`ChatTransport`] (alerts and decision cards), and [`run_control_loop`]
//! long-polls for operator commands and decision-card button presses,
//! routing them into the [`ControlPlane`].

pub mod handler;

use async_trait::async_trait;
use chrono::Utc;
use crosspost_config::model::TelegramConfig;
use crosspost_control::ControlPlane;
use crosspost_core::{ChatMessageId, ChatTransport, CrosspostError};
use teloxide::prelude::*;
use teloxide::types::{ChatId, InlineKeyboardButton, InlineKeyboardMarkup, Recipient};
use tracing::{debug, error, info, warn};

/// Outbound Telegram transport bound to the single operator DM.
#[derive(Clone)]
pub struct TelegramNotifier {
    bot: Bot,
    chat_id: ChatId,
}

impl TelegramNotifier {
    /// Requires `telegram.bot_token` and a numeric
    /// `telegram.allowed_user_id` (the DM chat id equals the user id).
    pub fn new(config: &TelegramConfig) -> Result<Self, CrosspostError> {
        let token = config.bot_token.as_deref().ok_or_else(|| {
            CrosspostError::Config("telegram.bot_token is required for the control plane".into())
        })?;
        if token.is_empty() {
            return Err(CrosspostError::Config("telegram.bot_token cannot be empty".into()));
        }
        let user_id = config.allowed_user_id.as_deref().ok_or_else(|| {
            CrosspostError::Config("telegram.allowed_user_id is required".into())
        })?;
        let chat_id = user_id.parse::<i64>().map(ChatId).map_err(|_| {
            CrosspostError::Config(format!(
                "telegram.allowed_user_id must be a numeric Telegram user id, got {user_id:?}"
            ))
        })?;

        Ok(Self {
            bot: Bot::new(token),
            chat_id,
        })
    }

    pub fn bot(&self) -> &Bot {
        &self.bot
    }
}

fn send_error(e: teloxide::RequestError) -> CrosspostError {
    CrosspostError::Channel {
        message: format!("failed to send Telegram message: {e}"),
        source: Some(Box::new(e)),
    }
}

#[async_trait]
impl ChatTransport for TelegramNotifier {
    async fn send_alert(
        &self,
        text: &str,
        critical: bool,
    ) -> Result<ChatMessageId, CrosspostError> {
        let sent = self
            .bot
            .send_message(Recipient::Id(self.chat_id), text)
            .disable_notification(!critical)
            .await
            .map_err(send_error)?;
        Ok(ChatMessageId(sent.id.0.to_string()))
    }

    async fn send_decision_card(
        &self,
        request_id: &str,
        message: &str,
    ) -> Result<ChatMessageId, CrosspostError> {
        let keyboard = InlineKeyboardMarkup::new([[
            InlineKeyboardButton::callback("Approve", format!("approve:{request_id}")),
            InlineKeyboardButton::callback("Reject", format!("reject:{request_id}")),
        ]]);
        let sent = self
            .bot
            .send_message(Recipient::Id(self.chat_id), message)
            .reply_markup(keyboard)
            .await
            .map_err(send_error)?;
        Ok(ChatMessageId(sent.id.0.to_string()))
    }

    async fn healthy(&self) -> bool {
        self.bot.get_me().await.is_ok()
    }
}

/// Long-poll for operator input and dispatch it into the control plane.
///
/// Runs until the process shuts down. Unauthorized and non-DM traffic is
/// dropped here without a reply; the control plane re-checks
/// authorization for anything that gets through.
pub async fn run_control_loop(bot: Bot, plane: ControlPlane, allowed_user_id: String) {
    info!("starting Telegram long polling");

    let message_plane = plane.clone();
    let message_allowed = allowed_user_id.clone();
    let message_branch = Update::filter_message().endpoint(move |bot: Bot, msg: Message| {
        let plane = message_plane.clone();
        let allowed = message_allowed.clone();
        async move {
            if !handler::is_dm(&msg) || !handler::is_authorized(&msg, &allowed) {
                debug!(chat_id = msg.chat.id.0, "dropping unauthorized or non-DM message");
                return respond(());
            }
            let Some(text) = msg.text() else {
                return respond(());
            };
            let sender_id = msg
                .from
                .as_ref()
                .map(|u| u.id.0.to_string())
                .unwrap_or_default();

            match plane.handle_command(&sender_id, text, Utc::now()).await {
                Ok(reply) => {
                    let send = bot
                        .send_message(msg.chat.id, reply.text)
                        .disable_notification(!reply.critical)
                        .await;
                    if let Err(e) = send {
                        warn!(error = %e, "failed to deliver command reply");
                    }
                }
                Err(e) => error!(error = %e, command = text, "command handling failed"),
            }
            respond(())
        }
    });

    let callback_branch =
        Update::filter_callback_query().endpoint(move |bot: Bot, q: CallbackQuery| {
            let plane = plane.clone();
            let allowed = allowed_user_id.clone();
            async move {
                let user_id = q.from.id.0.to_string();
                let Some((approve, request_id)) =
                    q.data.as_deref().and_then(handler::parse_callback)
                else {
                    let _ = bot.answer_callback_query(q.id.clone()).await;
                    return respond(());
                };
                if user_id != allowed {
                    debug!(user_id, "dropping unauthorized callback");
                    let _ = bot.answer_callback_query(q.id.clone()).await;
                    return respond(());
                }
                let message_id = q.message.as_ref().map(|m| m.id().0.to_string());

                match plane
                    .resolve_decision(
                        &user_id,
                        request_id,
                        approve,
                        message_id.as_deref(),
                        Utc::now(),
                    )
                    .await
                {
                    Ok(reply) => {
                        let _ = bot.answer_callback_query(q.id.clone()).await;
                        let chat_id = q
                            .message
                            .as_ref()
                            .map(|m| m.chat().id)
                            .unwrap_or(ChatId(q.from.id.0 as i64));
                        let send = bot
                            .send_message(chat_id, reply.text)
                            .disable_notification(!reply.critical)
                            .await;
                        if let Err(e) = send {
                            warn!(error = %e, "failed to deliver decision reply");
                        }
                    }
                    Err(e) => {
                        error!(error = %e, request_id, "decision resolution failed");
                        let _ = bot.answer_callback_query(q.id.clone()).await;
                    }
                }
                respond(())
            }
        });

    let tree = dptree::entry().branch(message_branch).branch(callback_branch);
    Dispatcher::builder(bot, tree)
        .default_handler(|_| async {})
        .build()
        .dispatch()
        .await;
}
