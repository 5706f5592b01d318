//! Telegram long-polling adapter

use crate::config::StockConfig;
use crate::delivery::{ConversationLocks, sanitize_for_telegram, split_message};
use crate::error::Result;
use equisage_core::{AttachmentKind, ConversationId, TurnResponse};
use equisage_workflow::Orchestrator;
use std::sync::Arc;
use teloxide::prelude::*;
use teloxide::types::{ChatAction, InputFile, ParseMode};
use tracing::{error, info, warn};

/// One outgoing text message in both renderings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingChunk {
    /// Sanitized HTML, sent first
    pub html: String,
    /// Raw text, sent when Telegram rejects the HTML
    pub plain: String,
}

/// Chunk a reply and sanitize every chunk on its own
pub fn outgoing_chunks(text: &str, chunk_size: usize) -> Vec<OutgoingChunk> {
    split_message(text, chunk_size)
        .into_iter()
        .map(|plain| OutgoingChunk {
            html: sanitize_for_telegram(&plain),
            plain,
        })
        .collect()
}

/// The response to deliver for a turn outcome
///
/// A failed turn still produces exactly one reply: the fixed critical error
/// text with no attachments.
pub fn reply_for(
    outcome: equisage_core::Result<TurnResponse>,
    internal_error: &str,
) -> TurnResponse {
    match outcome {
        Ok(response) if !response.text.trim().is_empty() => response,
        Ok(_) => {
            error!("Turn produced an empty reply");
            TurnResponse::text(internal_error)
        }
        Err(err) => {
            error!("Turn failed: {}", err);
            TurnResponse::text(internal_error)
        }
    }
}

/// Conversation identifier for a Telegram chat
pub fn conversation_id(chat: ChatId) -> ConversationId {
    ConversationId::from(chat.0)
}

/// Bridges Telegram chats to the orchestrator
#[derive(Clone)]
pub struct TelegramBot {
    orchestrator: Arc<Orchestrator>,
    locks: ConversationLocks,
    chunk_size: usize,
}

impl TelegramBot {
    /// Create the adapter; `locks` is shared with any other entry point
    pub fn new(
        orchestrator: Arc<Orchestrator>,
        locks: ConversationLocks,
        config: &StockConfig,
    ) -> Self {
        Self {
            orchestrator,
            locks,
            chunk_size: config.chunk_size,
        }
    }

    /// Poll for updates until the process is stopped
    pub async fn run(self, token: &str) {
        let bot = Bot::new(token);
        info!("Telegram bot polling for updates");

        teloxide::repl(bot, move |bot: Bot, msg: Message| {
            let this = self.clone();
            async move {
                if let Some(text) = msg.text() {
                    this.on_text(&bot, msg.chat.id, text).await;
                }
                respond(())
            }
        })
        .await;
    }

    async fn on_text(&self, bot: &Bot, chat: ChatId, text: &str) {
        let id = conversation_id(chat);
        let _turn = self.locks.lock(&id).await;
        info!(conversation = %id, "Message received");

        if let Err(err) = bot.send_chat_action(chat, ChatAction::Typing).await {
            warn!("Typing indicator failed: {}", err);
        }

        let outcome = self.orchestrator.handle_message(id.clone(), text).await;
        let internal_error = self.orchestrator.replies().internal_error.clone();
        let response = reply_for(outcome, &internal_error);

        if let Err(err) = self.deliver(bot, chat, &response).await {
            error!(conversation = %id, "Delivery failed: {}", err);
            if let Err(err) = bot.send_message(chat, internal_error).await {
                error!("Could not send the error reply: {}", err);
            }
        }
        cleanup(&response).await;
        self.locks.prune();
    }

    async fn deliver(&self, bot: &Bot, chat: ChatId, response: &TurnResponse) -> Result<()> {
        for chunk in outgoing_chunks(&response.text, self.chunk_size) {
            let sent = bot
                .send_message(chat, chunk.html.as_str())
                .parse_mode(ParseMode::Html)
                .await;
            if let Err(err) = sent {
                warn!("HTML rejected, resending as plain text: {}", err);
                bot.send_message(chat, chunk.plain).await?;
            }
        }

        for attachment in &response.attachments {
            if !attachment.path.exists() {
                warn!(path = %attachment.path.display(), "Attachment missing, skipped");
                continue;
            }
            let file = InputFile::file(attachment.path.clone());
            match attachment.kind {
                AttachmentKind::Chart => {
                    bot.send_photo(chat, file).await?;
                }
                AttachmentKind::Document => {
                    bot.send_document(chat, file).await?;
                }
            }
        }
        Ok(())
    }
}

/// Remove the transient files of a delivered response
pub async fn cleanup(response: &TurnResponse) {
    for attachment in &response.attachments {
        match tokio::fs::remove_file(&attachment.path).await {
            Ok(()) => info!(path = %attachment.path.display(), "Removed transient file"),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => warn!(path = %attachment.path.display(), "Could not remove file: {}", err),
        }
    }
}
