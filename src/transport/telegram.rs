//! [`Transport`] over the Telegram Bot HTTP API.
//!
//! Inbound traffic uses long polling (`getUpdates`); there is no webhook
//! server. The bot token is part of every URL, so request errors are
//! stripped of their URL before they are logged or wrapped.

use crate::config::BotConfig;
use crate::error::ConvertError;
use crate::transport::api::{ApiResponse, File, Update, User};
use crate::transport::{ChatId, FileRef, MenuOption, Transport};
use async_trait::async_trait;
use futures::stream::{self, Stream, StreamExt};
use reqwest::multipart::{Form, Part};
use serde::de::DeserializeOwned;
use serde_json::json;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Timeout for ordinary (non-polling, non-download) API calls.
const CALL_TIMEOUT: Duration = Duration::from_secs(60);

/// Longest pause between polls after repeated failures.
const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// Telegram Bot API client.
#[derive(Debug, Clone)]
pub struct TelegramTransport {
    client: reqwest::Client,
    base_url: String,
    token: String,
    poll_timeout_secs: u64,
    download_timeout: Duration,
}

impl TelegramTransport {
    pub fn new(config: &BotConfig) -> Result<Self, ConvertError> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| ConvertError::Transport {
                method: "client".into(),
                reason: redact(e),
            })?;

        Ok(Self {
            client,
            base_url: config.api_base_url.clone(),
            token: config.token.clone(),
            poll_timeout_secs: config.poll_timeout_secs,
            download_timeout: config.download_timeout(),
        })
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.base_url, self.token, method)
    }

    fn file_url(&self, file_path: &str) -> String {
        format!("{}/file/bot{}/{}", self.base_url, self.token, file_path)
    }

    /// Call a JSON API method and unwrap its envelope.
    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        body: &serde_json::Value,
        timeout: Duration,
    ) -> Result<T, ConvertError> {
        let response = self
            .client
            .post(self.method_url(method))
            .json(body)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| transport_error(method, redact(e)))?;

        unwrap_envelope(method, response).await
    }

    /// Check the token and return the bot's own account.
    pub async fn get_me(&self) -> Result<User, ConvertError> {
        self.call("getMe", &json!({}), CALL_TIMEOUT).await
    }

    /// One long-poll round.
    pub async fn get_updates(&self, offset: Option<i64>) -> Result<Vec<Update>, ConvertError> {
        let mut body = json!({
            "timeout": self.poll_timeout_secs,
            "allowed_updates": ["message", "callback_query"],
        });
        if let Some(offset) = offset {
            body["offset"] = json!(offset);
        }
        let timeout = Duration::from_secs(self.poll_timeout_secs) + Duration::from_secs(10);
        self.call("getUpdates", &body, timeout).await
    }

    /// Endless stream of updates, acknowledging each batch on the next poll.
    ///
    /// Poll failures are logged and retried with exponential backoff; the
    /// stream itself never ends.
    pub fn updates(&self) -> impl Stream<Item = Update> + Send + '_ {
        stream::unfold((None::<i64>, 0u32), move |(offset, failures)| async move {
            if failures > 0 {
                let backoff = Duration::from_millis(500 * 2u64.pow(failures.min(6)));
                tokio::time::sleep(backoff.min(MAX_BACKOFF)).await;
            }

            match self.get_updates(offset).await {
                Ok(updates) => {
                    let next = updates
                        .iter()
                        .map(|u| u.update_id + 1)
                        .max()
                        .or(offset);
                    if !updates.is_empty() {
                        debug!("Received {} updates", updates.len());
                    }
                    Some((updates, (next, 0)))
                }
                Err(e) => {
                    warn!("getUpdates failed (attempt {}): {}", failures + 1, e);
                    Some((Vec::new(), (offset, failures.saturating_add(1))))
                }
            }
        })
        .flat_map(stream::iter)
    }
}

#[async_trait]
impl Transport for TelegramTransport {
    async fn fetch_file_bytes(&self, file: &FileRef) -> Result<Vec<u8>, ConvertError> {
        let download_error = |reason: String| ConvertError::Download {
            file_id: file.file_id.clone(),
            reason,
        };

        let meta: File = self
            .call("getFile", &json!({ "file_id": file.file_id }), CALL_TIMEOUT)
            .await
            .map_err(|e| download_error(e.to_string()))?;

        let file_path = meta
            .file_path
            .ok_or_else(|| download_error("file is not available for download".into()))?;

        info!("Downloading file {} ({:?} bytes)", file.file_id, meta.file_size);

        let response = self
            .client
            .get(self.file_url(&file_path))
            .timeout(self.download_timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    download_error(format!(
                        "timed out after {}s",
                        self.download_timeout.as_secs()
                    ))
                } else {
                    download_error(redact(e))
                }
            })?;

        if !response.status().is_success() {
            return Err(download_error(format!("HTTP {}", response.status())));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| download_error(redact(e)))?;

        debug!("Downloaded {} bytes for {}", bytes.len(), file.file_id);
        Ok(bytes.to_vec())
    }

    async fn send_text(&self, chat: ChatId, text: &str) -> Result<(), ConvertError> {
        let _: serde_json::Value = self
            .call(
                "sendMessage",
                &json!({ "chat_id": chat.0, "text": text }),
                CALL_TIMEOUT,
            )
            .await?;
        Ok(())
    }

    async fn send_document(
        &self,
        chat: ChatId,
        bytes: Vec<u8>,
        filename: &str,
        caption: &str,
    ) -> Result<(), ConvertError> {
        let method = "sendDocument";
        let part = Part::bytes(bytes)
            .file_name(filename.to_string())
            .mime_str(mime_for(filename))
            .map_err(|e| transport_error(method, redact(e)))?;

        let form = Form::new()
            .text("chat_id", chat.0.to_string())
            .text("caption", caption.to_string())
            .part("document", part);

        let response = self
            .client
            .post(self.method_url(method))
            .multipart(form)
            .timeout(self.download_timeout)
            .send()
            .await
            .map_err(|e| transport_error(method, redact(e)))?;

        let _: serde_json::Value = unwrap_envelope(method, response).await?;
        Ok(())
    }

    async fn send_menu(
        &self,
        chat: ChatId,
        text: &str,
        rows: &[Vec<MenuOption>],
    ) -> Result<(), ConvertError> {
        let keyboard: Vec<Vec<serde_json::Value>> = rows
            .iter()
            .map(|row| {
                row.iter()
                    .map(|opt| json!({ "text": opt.label, "callback_data": opt.token }))
                    .collect()
            })
            .collect();

        let _: serde_json::Value = self
            .call(
                "sendMessage",
                &json!({
                    "chat_id": chat.0,
                    "text": text,
                    "reply_markup": { "inline_keyboard": keyboard },
                }),
                CALL_TIMEOUT,
            )
            .await?;
        Ok(())
    }

    async fn acknowledge(&self, callback_id: &str, text: &str) -> Result<(), ConvertError> {
        let _: bool = self
            .call(
                "answerCallbackQuery",
                &json!({ "callback_query_id": callback_id, "text": text }),
                CALL_TIMEOUT,
            )
            .await?;
        Ok(())
    }
}

/// Decode the `{ok, result, description}` envelope.
async fn unwrap_envelope<T: DeserializeOwned>(
    method: &str,
    response: reqwest::Response,
) -> Result<T, ConvertError> {
    let status = response.status();
    let envelope: ApiResponse<T> = response
        .json()
        .await
        .map_err(|e| transport_error(method, format!("HTTP {status}: {}", redact(e))))?;

    match (envelope.ok, envelope.result) {
        (true, Some(result)) => Ok(result),
        (_, _) => Err(transport_error(
            method,
            format!(
                "{} (code {})",
                envelope
                    .description
                    .unwrap_or_else(|| "no description".to_string()),
                envelope.error_code.unwrap_or(status.as_u16() as i64)
            ),
        )),
    }
}

fn transport_error(method: &str, reason: String) -> ConvertError {
    ConvertError::Transport {
        method: method.to_string(),
        reason,
    }
}

/// Render a reqwest error without the (token-bearing) URL.
fn redact(e: reqwest::Error) -> String {
    e.without_url().to_string()
}

/// MIME type for an outbound document, from its extension.
fn mime_for(filename: &str) -> &'static str {
    match Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("pdf") => "application/pdf",
        Some("docx") => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        _ => "application/octet-stream",
    }
}
