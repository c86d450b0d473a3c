//! Wire types of the Telegram Bot API, limited to the fields the bot reads.

use crate::transport::{parse_command, ChatId, FileRef, Inbound, Sender, UserId};
use serde::Deserialize;

/// Envelope around every Bot API result.
#[derive(Debug, Deserialize)]
pub struct ApiResponse<T> {
    pub ok: bool,
    pub result: Option<T>,
    pub description: Option<String>,
    pub error_code: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<Message>,
    pub callback_query: Option<CallbackQuery>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: i64,
    #[serde(default)]
    pub is_bot: bool,
    pub first_name: String,
    pub username: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub message_id: i64,
    pub from: Option<User>,
    pub chat: Chat,
    pub text: Option<String>,
    pub document: Option<Document>,
    pub photo: Option<Vec<PhotoSize>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Document {
    pub file_id: String,
    pub file_name: Option<String>,
    pub mime_type: Option<String>,
    pub file_size: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PhotoSize {
    pub file_id: String,
    pub width: u32,
    pub height: u32,
    pub file_size: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CallbackQuery {
    pub id: String,
    pub from: User,
    pub message: Option<Message>,
    pub data: Option<String>,
}

/// Result of `getFile`.
#[derive(Debug, Clone, Deserialize)]
pub struct File {
    pub file_id: String,
    pub file_path: Option<String>,
    pub file_size: Option<u64>,
}

impl User {
    fn sender(&self, chat: i64) -> Sender {
        Sender {
            user: UserId(self.id),
            chat: ChatId(chat),
            first_name: Some(self.first_name.clone()),
        }
    }
}

impl Update {
    /// Translate into a platform-neutral event.
    ///
    /// Returns `None` for updates the bot does not act on (edited messages,
    /// channel posts, messages from other bots).
    pub fn into_inbound(self) -> Option<Inbound> {
        if let Some(query) = self.callback_query {
            let chat = query
                .message
                .as_ref()
                .map(|m| m.chat.id)
                .unwrap_or(query.from.id);
            return Some(Inbound::Selection {
                from: query.from.sender(chat),
                callback_id: query.id,
                token: query.data.unwrap_or_default(),
            });
        }

        let message = self.message?;
        let user = message.from.as_ref().filter(|u| !u.is_bot)?;
        let from = user.sender(message.chat.id);

        if let Some(doc) = message.document {
            return Some(Inbound::File {
                from,
                file: FileRef {
                    file_id: doc.file_id,
                    file_name: doc.file_name,
                    mime_type: doc.mime_type,
                    file_size: doc.file_size,
                },
            });
        }

        // Photos arrive in several sizes, smallest first.
        if let Some(best) = message
            .photo
            .and_then(|sizes| sizes.into_iter().max_by_key(|p| p.width * p.height))
        {
            return Some(Inbound::File {
                from,
                file: FileRef {
                    file_id: best.file_id,
                    file_name: None,
                    mime_type: Some("image/jpeg".to_string()),
                    file_size: best.file_size,
                },
            });
        }

        let text = message.text.unwrap_or_default();
        if let Some((name, args)) = parse_command(&text) {
            return Some(Inbound::Command { from, name, args });
        }
        Some(Inbound::Text { from, text })
    }
}
