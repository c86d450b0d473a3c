//! Inbound event dispatch: commands, selections, files.
//!
//! [`Bot::handle`] is the single entry point for one inbound event and never
//! fails: every job error is logged with its detail, folded into one
//! user-facing message per [`FailureCategory`], and the user's session is
//! returned to idle. Failed outbound sends are logged and dropped.
//!
//! [`Bot::serve`] takes every update as it arrives. Only conversion jobs
//! are bounded, by `config.concurrency`: a file waiting for a job slot
//! never holds up commands or menu selections from other users.

use crate::config::BotConfig;
use crate::error::{ConvertError, FailureCategory};
use crate::kind::ConversionKind;
use crate::pipeline::artifact::ArtifactStore;
use crate::pipeline::tool::Toolbox;
use crate::pipeline::Pipeline;
use crate::progress::JobObserver;
use crate::session::SessionStore;
use crate::transport::{ChatId, FileRef, Inbound, MenuOption, Sender, Transport};
use async_trait::async_trait;
use futures::stream::{Stream, StreamExt};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};

/// Reply to anything the bot does not understand.
pub const FALLBACK_TEXT: &str = "Please enter valid command";

/// Title of the `/convert` menu.
pub const MENU_TEXT: &str = "Choose the type of conversion you want";

/// Sent once the converter starts working on a downloaded file.
pub const PROCESSING_TEXT: &str = "Processing conversion...";

const HELP_TEXT: &str = "/convert: choose a conversion (PDF to Word, Word to PDF, Image to PDF)\n\
/help: show this message\n\n\
After choosing, send the file as a document or photo.";

/// What became of one uploaded file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileOutcome {
    /// The converted document was delivered.
    Delivered {
        kind: ConversionKind,
        filename: String,
        bytes: usize,
    },
    /// The job failed; the user got the category's message.
    Failed {
        kind: ConversionKind,
        category: FailureCategory,
    },
    /// No conversion was armed; the user got the fallback reply.
    Ignored,
}

/// The conversion bot.
#[derive(Clone)]
pub struct Bot {
    config: BotConfig,
    transport: Arc<dyn Transport>,
    sessions: SessionStore,
    pipeline: Pipeline,
    jobs: Arc<Semaphore>,
}

impl Bot {
    pub fn new(config: BotConfig, transport: Arc<dyn Transport>, pipeline: Pipeline) -> Self {
        Self {
            jobs: Arc::new(Semaphore::new(config.concurrency)),
            config,
            transport,
            sessions: SessionStore::new(),
            pipeline,
        }
    }

    /// Wire up the production pipeline from `config`.
    pub fn from_config(config: BotConfig, transport: Arc<dyn Transport>) -> Result<Self, ConvertError> {
        let store = ArtifactStore::open(&config.scratch_dir)?;
        let tools = Toolbox::from_config(&config);
        Ok(Self::new(config, transport, Pipeline::new(store, tools)))
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// Handle events from `inbound` until it ends. Conversions run at most
    /// `config.concurrency` at a time; everything else is handled at once.
    pub async fn serve<S>(&self, inbound: S)
    where
        S: Stream<Item = Inbound> + Send,
    {
        info!("Serving with {} conversion slots", self.config.concurrency);
        inbound
            .for_each_concurrent(None, |event| self.handle(event))
            .await;
    }

    /// Handle one inbound event.
    pub async fn handle(&self, event: Inbound) {
        match event {
            Inbound::Command { from, name, .. } => self.on_command(&name, &from).await,
            Inbound::Selection {
                from,
                callback_id,
                token,
            } => self.on_selection(&from, &callback_id, &token).await,
            Inbound::File { from, file } => {
                self.on_file_message(&from, file).await;
            }
            Inbound::Text { from, .. } => self.notify(from.chat, FALLBACK_TEXT).await,
        }
    }

    /// Dispatch an explicit `/command`.
    pub async fn on_command(&self, name: &str, from: &Sender) {
        debug!(user = %from.user, command = name, "Command");
        match name {
            "start" => {
                let greeting = format!(
                    "Hello, {}",
                    from.first_name.as_deref().unwrap_or("there")
                );
                self.notify(from.chat, &greeting).await;
            }
            "convert" => {
                let option = |kind: ConversionKind| MenuOption {
                    label: kind.label().to_string(),
                    token: kind.selection_token().to_string(),
                };
                let rows = vec![
                    vec![option(ConversionKind::PdfToWord), option(ConversionKind::WordToPdf)],
                    vec![option(ConversionKind::ImageToPdf)],
                ];
                if let Err(e) = self.transport.send_menu(from.chat, MENU_TEXT, &rows).await {
                    warn!("Failed to send menu to {}: {}", from.chat, e);
                }
            }
            "help" => self.notify(from.chat, HELP_TEXT).await,
            _ => self.notify(from.chat, FALLBACK_TEXT).await,
        }
    }

    /// The user picked a conversion kind from the menu.
    pub async fn on_selection(&self, from: &Sender, callback_id: &str, token: &str) {
        let Some(kind) = ConversionKind::from_selection_token(token) else {
            warn!(user = %from.user, token, "Unknown selection token");
            if let Err(e) = self.transport.acknowledge(callback_id, FALLBACK_TEXT).await {
                warn!("Failed to answer callback {}: {}", callback_id, e);
            }
            return;
        };

        self.sessions.select(from.user, kind);

        let chosen = format!("You have chosen {}", kind.label().to_lowercase());
        if let Err(e) = self.transport.acknowledge(callback_id, &chosen).await {
            warn!("Failed to answer callback {}: {}", callback_id, e);
        }
        self.notify(from.chat, &chosen).await;
        self.notify(from.chat, kind.upload_prompt()).await;
    }

    /// A file arrived: run the armed pipeline, or reply with the fallback.
    pub async fn on_file_message(&self, from: &Sender, file: FileRef) -> FileOutcome {
        let claim = match self.sessions.claim(from.user) {
            Some(claim) => claim,
            None => match self.infer_kind(&file) {
                Some(kind) => {
                    debug!(user = %from.user, %kind, "Inferred conversion from file name");
                    self.sessions.claim_as(from.user, kind)
                }
                None => {
                    self.notify(from.chat, FALLBACK_TEXT).await;
                    return FileOutcome::Ignored;
                }
            },
        };
        let kind = claim.kind();

        self.notify(from.chat, kind.received_message()).await;

        let _slot = match self.jobs.acquire().await {
            Ok(permit) => permit,
            Err(e) => {
                error!(user = %from.user, %kind, "Job slots closed: {}", e);
                self.notify(from.chat, FailureCategory::Internal.user_message()).await;
                return FileOutcome::Failed {
                    kind,
                    category: FailureCategory::Internal,
                };
            }
        };

        let progress = ChatProgress {
            transport: self.transport.as_ref(),
            chat: from.chat,
        };
        let result = self
            .pipeline
            .run(kind, &file, self.transport.as_ref(), &progress)
            .await;

        let delivered = match result {
            Ok(converted) => {
                let size = converted.bytes.len();
                self.transport
                    .send_document(
                        from.chat,
                        converted.bytes,
                        &converted.filename,
                        kind.success_caption(),
                    )
                    .await
                    .map(|()| (converted.filename, size))
            }
            Err(e) => Err(e),
        };

        let outcome = match delivered {
            Ok((filename, bytes)) => {
                info!(user = %from.user, %kind, %filename, bytes, "Delivered converted file");
                FileOutcome::Delivered {
                    kind,
                    filename,
                    bytes,
                }
            }
            Err(e) => {
                let category = e.category();
                error!(user = %from.user, %kind, ?category, "Conversion failed: {}", e);
                self.notify(from.chat, category.user_message()).await;
                FileOutcome::Failed { kind, category }
            }
        };

        drop(claim);
        outcome
    }

    /// Default kind for a file that arrived with nothing armed.
    fn infer_kind(&self, file: &FileRef) -> Option<ConversionKind> {
        if !self.config.infer_pdf_to_word {
            return None;
        }
        let is_pdf = file
            .file_name
            .as_deref()
            .and_then(|name| Path::new(name).extension())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));
        is_pdf.then_some(ConversionKind::PdfToWord)
    }

    async fn notify(&self, chat: ChatId, text: &str) {
        if let Err(e) = self.transport.send_text(chat, text).await {
            warn!("Failed to send message to {}: {}", chat, e);
        }
    }
}

/// Tells the user when the converter starts.
struct ChatProgress<'a> {
    transport: &'a dyn Transport,
    chat: ChatId,
}

#[async_trait]
impl JobObserver for ChatProgress<'_> {
    async fn on_tool_start(&self, kind: ConversionKind, tool: &str) {
        debug!(%kind, tool, "Tool starting");
        if let Err(e) = self.transport.send_text(self.chat, PROCESSING_TEXT).await {
            warn!("Failed to send progress to {}: {}", self.chat, e);
        }
    }
}
