//! # docbot
//!
//! A chat bot that converts documents: PDF to Word, Word to PDF, and
//! images to PDF.
//!
//! ## Pipeline Overview
//!
//! ```text
//! user ─/convert─▶ menu ─select─▶ session armed ─file─▶ pipeline ─▶ reply
//!                                                           │
//!  ├─ 1. Fetch    download the upload through the transport
//!  ├─ 2. Acquire  unique temp artifacts for input and output
//!  ├─ 3. Convert  office renderer subprocess, or pdfium in spawn_blocking
//!  ├─ 4. Read     converted bytes back into memory
//!  └─ 5. Release  delete both artifacts, clear the session
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use docbot::{Bot, BotConfig, TelegramTransport};
//! use futures::StreamExt;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = BotConfig::builder(std::env::var("BOT_API")?).build()?;
//!     let telegram = Arc::new(TelegramTransport::new(&config)?);
//!     let bot = Bot::from_config(config, telegram.clone())?;
//!     let inbound = telegram
//!         .updates()
//!         .filter_map(|u| futures::future::ready(u.into_inbound()));
//!     bot.serve(inbound).await;
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `docbot` binary (clap + anyhow + tracing-subscriber + dotenvy) |
//!
//! ## External tools
//!
//! Word to PDF shells out to an office renderer (`libreoffice` by default).
//! The other two conversions bind the pdfium shared library at runtime.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod bot;
pub mod config;
pub mod error;
pub mod kind;
pub mod pipeline;
pub mod progress;
pub mod session;
pub mod transport;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use bot::{Bot, FileOutcome};
pub use config::{BotConfig, BotConfigBuilder};
pub use error::{ConvertError, FailureCategory};
pub use kind::ConversionKind;
pub use pipeline::artifact::{Artifact, ArtifactStore};
pub use pipeline::document::PdfToDocument;
pub use pipeline::office::OfficeRenderer;
pub use pipeline::render::ImageToPdf;
pub use pipeline::tool::{ToolAdapter, Toolbox};
pub use pipeline::{ConversionJob, ConvertedFile, Pipeline};
pub use progress::{JobObserver, NoopObserver};
pub use session::{SessionClaim, SessionState, SessionStore};
pub use transport::{ChatId, FileRef, Inbound, MenuOption, Sender, TelegramTransport, Transport, UserId};
