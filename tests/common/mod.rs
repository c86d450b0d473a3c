//! Shared fakes for the integration tests: an in-memory transport and
//! scriptable converters.

#![allow(dead_code)]

use async_trait::async_trait;
use docbot::{
    ArtifactStore, Bot, BotConfig, ChatId, ConvertError, FileRef, Inbound, MenuOption, Pipeline,
    Sender, ToolAdapter, Toolbox, Transport, UserId,
};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

// ── Transport ────────────────────────────────────────────────────────────────

/// Something the bot sent.
#[derive(Debug, Clone, PartialEq)]
pub enum Sent {
    Text {
        chat: ChatId,
        text: String,
    },
    Document {
        chat: ChatId,
        filename: String,
        caption: String,
        bytes: Vec<u8>,
    },
    Menu {
        chat: ChatId,
        text: String,
        rows: Vec<Vec<MenuOption>>,
    },
    Ack {
        callback_id: String,
        text: String,
    },
}

/// In-memory transport. Files are served from `files` by id; unknown ids
/// fail like a 404.
#[derive(Default)]
pub struct FakeTransport {
    files: Mutex<HashMap<String, Vec<u8>>>,
    sent: Mutex<Vec<Sent>>,
    fail_documents: Mutex<bool>,
}

impl FakeTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn serve_file(&self, file_id: &str, bytes: impl Into<Vec<u8>>) {
        self.files
            .lock()
            .unwrap()
            .insert(file_id.to_string(), bytes.into());
    }

    pub fn fail_documents(&self) {
        *self.fail_documents.lock().unwrap() = true;
    }

    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }

    /// Texts sent to `chat`, in order.
    pub fn texts_to(&self, chat: ChatId) -> Vec<String> {
        self.sent()
            .into_iter()
            .filter_map(|s| match s {
                Sent::Text { chat: c, text } if c == chat => Some(text),
                _ => None,
            })
            .collect()
    }

    /// Documents sent to `chat` as `(filename, caption, bytes)`.
    pub fn documents_to(&self, chat: ChatId) -> Vec<(String, String, Vec<u8>)> {
        self.sent()
            .into_iter()
            .filter_map(|s| match s {
                Sent::Document {
                    chat: c,
                    filename,
                    caption,
                    bytes,
                } if c == chat => Some((filename, caption, bytes)),
                _ => None,
            })
            .collect()
    }

    fn record(&self, sent: Sent) {
        self.sent.lock().unwrap().push(sent);
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn fetch_file_bytes(&self, file: &FileRef) -> Result<Vec<u8>, ConvertError> {
        self.files
            .lock()
            .unwrap()
            .get(&file.file_id)
            .cloned()
            .ok_or_else(|| ConvertError::Download {
                file_id: file.file_id.clone(),
                reason: "HTTP 404 Not Found".into(),
            })
    }

    async fn send_text(&self, chat: ChatId, text: &str) -> Result<(), ConvertError> {
        self.record(Sent::Text {
            chat,
            text: text.to_string(),
        });
        Ok(())
    }

    async fn send_document(
        &self,
        chat: ChatId,
        bytes: Vec<u8>,
        filename: &str,
        caption: &str,
    ) -> Result<(), ConvertError> {
        if *self.fail_documents.lock().unwrap() {
            return Err(ConvertError::Transport {
                method: "sendDocument".into(),
                reason: "Request Entity Too Large (code 413)".into(),
            });
        }
        self.record(Sent::Document {
            chat,
            filename: filename.to_string(),
            caption: caption.to_string(),
            bytes,
        });
        Ok(())
    }

    async fn send_menu(
        &self,
        chat: ChatId,
        text: &str,
        rows: &[Vec<MenuOption>],
    ) -> Result<(), ConvertError> {
        self.record(Sent::Menu {
            chat,
            text: text.to_string(),
            rows: rows.to_vec(),
        });
        Ok(())
    }

    async fn acknowledge(&self, callback_id: &str, text: &str) -> Result<(), ConvertError> {
        self.record(Sent::Ack {
            callback_id: callback_id.to_string(),
            text: text.to_string(),
        });
        Ok(())
    }
}

// ── Converters ───────────────────────────────────────────────────────────────

/// What a [`FakeTool`] does when called.
#[derive(Debug, Clone, Copy)]
pub enum Behaviour {
    /// Write `%PDF-fake\n` followed by the input bytes.
    Copy,
    /// Fail as if the converter rejected the input.
    Fail,
    /// Report success without writing anything.
    Silent,
}

pub struct FakeTool {
    name: &'static str,
    behaviour: Behaviour,
    calls: Mutex<usize>,
}

impl FakeTool {
    pub fn new(name: &'static str, behaviour: Behaviour) -> Arc<Self> {
        Arc::new(Self {
            name,
            behaviour,
            calls: Mutex::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

pub const FAKE_HEADER: &[u8] = b"%PDF-fake\n";

#[async_trait]
impl ToolAdapter for FakeTool {
    fn name(&self) -> &str {
        self.name
    }

    async fn convert(&self, input: &Path, output: &Path) -> Result<(), ConvertError> {
        *self.calls.lock().unwrap() += 1;
        assert!(input.exists(), "input artifact must exist while the tool runs");
        match self.behaviour {
            Behaviour::Copy => {
                let mut bytes = FAKE_HEADER.to_vec();
                bytes.extend(std::fs::read(input).map_err(|e| ConvertError::storage(input, e))?);
                std::fs::write(output, bytes).map_err(|e| ConvertError::storage(output, e))
            }
            Behaviour::Fail => Err(ConvertError::tool(self.name, "source file could not be loaded")),
            Behaviour::Silent => Ok(()),
        }
    }
}

/// A toolbox where every kind behaves the same way.
pub fn uniform_toolbox(behaviour: Behaviour) -> Toolbox {
    Toolbox::new(
        FakeTool::new("fake-image", behaviour),
        FakeTool::new("fake-office", behaviour),
        FakeTool::new("fake-docx", behaviour),
    )
}

// ── Harness ──────────────────────────────────────────────────────────────────

/// A bot over a fake transport and a private scratch directory.
pub struct Harness {
    pub bot: Bot,
    pub transport: Arc<FakeTransport>,
    pub scratch: TempDir,
}

impl Harness {
    pub fn new(tools: Toolbox) -> Self {
        Self::with_config(tools, |b| b)
    }

    pub fn with_config(
        tools: Toolbox,
        configure: impl FnOnce(docbot::BotConfigBuilder) -> docbot::BotConfigBuilder,
    ) -> Self {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();

        let scratch = tempfile::tempdir().unwrap();
        let config = configure(BotConfig::builder("123:TEST").scratch_dir(scratch.path()))
            .build()
            .unwrap();
        let store = ArtifactStore::open(scratch.path()).unwrap();
        let transport = FakeTransport::new();
        let bot = Bot::new(config, transport.clone(), Pipeline::new(store, tools));
        Self {
            bot,
            transport,
            scratch,
        }
    }

    /// Files currently in the scratch directory.
    pub fn leftovers(&self) -> Vec<String> {
        std::fs::read_dir(self.scratch.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect()
    }
}

pub fn sender(id: i64) -> Sender {
    Sender {
        user: UserId(id),
        chat: ChatId(id * 10),
        first_name: Some(format!("User{id}")),
    }
}

pub fn file(file_id: &str, name: Option<&str>) -> FileRef {
    FileRef {
        file_id: file_id.to_string(),
        file_name: name.map(str::to_string),
        mime_type: None,
        file_size: None,
    }
}

pub fn command(from: &Sender, name: &str) -> Inbound {
    Inbound::Command {
        from: from.clone(),
        name: name.to_string(),
        args: String::new(),
    }
}

pub fn select(from: &Sender, token: &str) -> Inbound {
    Inbound::Selection {
        from: from.clone(),
        callback_id: format!("cb-{}", from.user),
        token: token.to_string(),
    }
}

pub fn upload(from: &Sender, file: FileRef) -> Inbound {
    Inbound::File {
        from: from.clone(),
        file,
    }
}
