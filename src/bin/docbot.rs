//! CLI binary for docbot.
//!
//! A thin shim over the library crate that maps CLI flags and environment
//! variables to `BotConfig`, connects to Telegram and serves until Ctrl-C.

use anyhow::{Context, Result};
use clap::Parser;
use docbot::{Bot, BotConfig, TelegramTransport};
use futures::future;
use futures::StreamExt;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const AFTER_HELP: &str = "\
ENVIRONMENT:
  BOT_API          Telegram bot token (also read from a .env file)
  RUST_LOG         Overrides --verbose/--quiet log filtering

TOOLS:
  Word to PDF runs `<office-exe> --headless --convert-to pdf`.
  Image to PDF and PDF to Word load the pdfium shared library from
  --pdfium-lib-dir, or from the system library path.";

#[derive(Parser, Debug)]
#[command(
    name = "docbot",
    version,
    about = "Telegram bot converting PDF to Word, Word to PDF and images to PDF",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Telegram bot token.
    #[arg(long, env = "BOT_API", hide_env_values = true)]
    token: String,

    /// Bot API base URL.
    #[arg(long, env = "DOCBOT_API_BASE_URL", default_value = "https://api.telegram.org")]
    api_base_url: String,

    /// Office renderer executable used for Word to PDF.
    #[arg(long, env = "DOCBOT_OFFICE_EXE", default_value = "libreoffice")]
    office_exe: String,

    /// Office renderer timeout in seconds.
    #[arg(long, env = "DOCBOT_OFFICE_TIMEOUT", default_value_t = 30)]
    office_timeout: u64,

    /// Office renderer processes allowed to run at once.
    #[arg(long, env = "DOCBOT_MAX_RENDERS", default_value_t = 1)]
    max_renders: usize,

    /// File download timeout in seconds.
    #[arg(long, env = "DOCBOT_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// Long-poll timeout in seconds.
    #[arg(long, env = "DOCBOT_POLL_TIMEOUT", default_value_t = 30)]
    poll_timeout: u64,

    /// Conversion jobs run concurrently.
    #[arg(short, long, env = "DOCBOT_CONCURRENCY", default_value_t = 16)]
    concurrency: usize,

    /// Directory for temporary conversion artifacts.
    #[arg(long, env = "DOCBOT_SCRATCH_DIR")]
    scratch_dir: Option<PathBuf>,

    /// Directory containing the pdfium shared library.
    #[arg(long, env = "DOCBOT_PDFIUM_LIB_DIR")]
    pdfium_lib_dir: Option<PathBuf>,

    /// Resolution an image is placed at when converted to PDF.
    #[arg(long, env = "DOCBOT_IMAGE_DPI", default_value_t = 100.0)]
    image_dpi: f32,

    /// Do not treat an unselected `.pdf` upload as PDF to Word.
    #[arg(long, env = "DOCBOT_NO_INFER_PDF")]
    no_infer_pdf: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "DOCBOT_VERBOSE")]
    verbose: bool,

    /// Log errors only.
    #[arg(short, long, env = "DOCBOT_QUIET")]
    quiet: bool,
}

impl Cli {
    fn to_config(&self) -> Result<BotConfig> {
        let mut builder = BotConfig::builder(self.token.clone())
            .api_base_url(self.api_base_url.clone())
            .office_executable(self.office_exe.clone())
            .office_timeout_secs(self.office_timeout)
            .max_concurrent_renders(self.max_renders)
            .download_timeout_secs(self.download_timeout)
            .poll_timeout_secs(self.poll_timeout)
            .concurrency(self.concurrency)
            .image_dpi(self.image_dpi)
            .infer_pdf_to_word(!self.no_infer_pdf);

        if let Some(dir) = &self.scratch_dir {
            builder = builder.scratch_dir(dir.clone());
        }
        if let Some(dir) = &self.pdfium_lib_dir {
            builder = builder.pdfium_lib_dir(dir.clone());
        }

        builder.build().context("Invalid configuration")
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env file is fine; the token may come from the environment.
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Wiring ───────────────────────────────────────────────────────────
    let config = cli.to_config()?;
    info!("Starting with {:?}", config);

    let telegram = Arc::new(
        TelegramTransport::new(&config).context("Failed to create Telegram client")?,
    );
    let me = telegram
        .get_me()
        .await
        .context("Failed to authorize bot token")?;
    info!(
        "Authorized as @{}",
        me.username.as_deref().unwrap_or(&me.first_name)
    );

    let bot = Bot::from_config(config, telegram.clone())
        .context("Failed to prepare scratch directory")?;

    let inbound = telegram
        .updates()
        .filter_map(|update| future::ready(update.into_inbound()));

    // ── Serve ────────────────────────────────────────────────────────────
    tokio::select! {
        _ = bot.serve(inbound) => warn!("Update stream ended"),
        signal = tokio::signal::ctrl_c() => {
            signal.context("Failed to listen for Ctrl-C")?;
            info!("Shutting down");
        }
    }

    Ok(())
}
