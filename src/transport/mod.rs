//! The messaging-platform boundary.
//!
//! The core consumes inbound [`Inbound`] events and talks back through the
//! [`Transport`] trait. [`telegram`] is the shipped implementation; tests
//! drive the bot with in-memory fakes.

pub mod api;
pub mod telegram;

use crate::error::ConvertError;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

pub use telegram::TelegramTransport;

/// Platform user id; sessions are keyed by it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub i64);

/// Conversation the bot replies into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChatId(pub i64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for ChatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Who sent an inbound event, and where to answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sender {
    pub user: UserId,
    pub chat: ChatId,
    pub first_name: Option<String>,
}

/// A file the user uploaded, not yet downloaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRef {
    /// Platform identifier used to resolve the download location.
    pub file_id: String,
    pub file_name: Option<String>,
    pub mime_type: Option<String>,
    pub file_size: Option<u64>,
}

/// One inbound event, already stripped of platform detail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    /// `/name args` text message.
    Command {
        from: Sender,
        name: String,
        args: String,
    },
    /// The user pressed an inline option.
    Selection {
        from: Sender,
        callback_id: String,
        token: String,
    },
    /// A document or photo.
    File { from: Sender, file: FileRef },
    /// Anything else.
    Text { from: Sender, text: String },
}

impl Inbound {
    pub fn sender(&self) -> &Sender {
        match self {
            Inbound::Command { from, .. }
            | Inbound::Selection { from, .. }
            | Inbound::File { from, .. }
            | Inbound::Text { from, .. } => from,
        }
    }
}

/// One button of an inline menu.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuOption {
    pub label: String,
    pub token: String,
}

/// Outbound capabilities the core needs from a messaging platform.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Resolve and download an uploaded file.
    ///
    /// Fails with [`ConvertError::Download`] on any non-success status.
    async fn fetch_file_bytes(&self, file: &FileRef) -> Result<Vec<u8>, ConvertError>;

    async fn send_text(&self, chat: ChatId, text: &str) -> Result<(), ConvertError>;

    async fn send_document(
        &self,
        chat: ChatId,
        bytes: Vec<u8>,
        filename: &str,
        caption: &str,
    ) -> Result<(), ConvertError>;

    /// Send `text` with rows of inline options under it.
    async fn send_menu(
        &self,
        chat: ChatId,
        text: &str,
        rows: &[Vec<MenuOption>],
    ) -> Result<(), ConvertError>;

    /// Answer a [`Inbound::Selection`] so the client stops its spinner.
    async fn acknowledge(&self, callback_id: &str, text: &str) -> Result<(), ConvertError>;
}

static COMMAND_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)^/([A-Za-z0-9_]{1,32})(?:@[A-Za-z0-9_]+)?(?:\s+(.*))?$").unwrap()
});

/// Split `/name@bot args` into a lowercase name and trimmed arguments.
pub fn parse_command(text: &str) -> Option<(String, String)> {
    let caps = COMMAND_RE.captures(text.trim())?;
    let name = caps.get(1)?.as_str().to_ascii_lowercase();
    let args = caps
        .get(2)
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_default();
    Some((name, args))
}
