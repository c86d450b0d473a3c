//! Configuration types for the conversion bot.
//!
//! All runtime behaviour is controlled through [`BotConfig`], built via its
//! [`BotConfigBuilder`]. The only value without a default is the bot token;
//! [`BotConfigBuilder::build`] rejects a config without one, which the
//! binary turns into a fatal startup error.

use crate::error::ConvertError;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Configuration for the bot and its conversion pipelines.
///
/// # Example
/// ```rust
/// use docbot::BotConfig;
///
/// let config = BotConfig::builder("123456:ABC")
///     .office_timeout_secs(45)
///     .concurrency(8)
///     .build()
///     .unwrap();
/// assert_eq!(config.office_timeout_secs, 45);
/// ```
#[derive(Clone)]
pub struct BotConfig {
    /// Bot authentication token. Required.
    pub token: String,

    /// Bot API base URL. Default: `https://api.telegram.org`.
    pub api_base_url: String,

    /// Office renderer executable. Default: `libreoffice`.
    ///
    /// Some distributions only ship `soffice`; point this at whichever
    /// binary is on `PATH`.
    pub office_executable: String,

    /// Wall-clock limit for one office renderer run, in seconds. Default: 30.
    pub office_timeout_secs: u64,

    /// How many office renderer processes may run at once. Default: 1.
    ///
    /// Headless office instances sharing a user profile refuse to start while
    /// another one holds the profile lock, so the default serialises them.
    pub max_concurrent_renders: usize,

    /// Timeout for downloading a user's file, in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Long-poll timeout passed to `getUpdates`, in seconds. Default: 30.
    pub poll_timeout_secs: u64,

    /// Maximum number of conversion jobs running at once. Commands and
    /// selections are never held back by this limit. Default: 16.
    pub concurrency: usize,

    /// Directory holding temporary artifacts. Default: `<temp>/docbot`.
    pub scratch_dir: PathBuf,

    /// Directory containing the pdfium shared library. If `None`, the
    /// system library search path is used.
    pub pdfium_lib_dir: Option<PathBuf>,

    /// Resolution used to size image pages, in DPI. Default: 100.
    pub image_dpi: f32,

    /// Treat a `*.pdf` upload with no pending selection as PDF → Word.
    /// Default: true.
    pub infer_pdf_to_word: bool,
}

impl fmt::Debug for BotConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BotConfig")
            .field("token", &"<redacted>")
            .field("api_base_url", &self.api_base_url)
            .field("office_executable", &self.office_executable)
            .field("office_timeout_secs", &self.office_timeout_secs)
            .field("max_concurrent_renders", &self.max_concurrent_renders)
            .field("download_timeout_secs", &self.download_timeout_secs)
            .field("poll_timeout_secs", &self.poll_timeout_secs)
            .field("concurrency", &self.concurrency)
            .field("scratch_dir", &self.scratch_dir)
            .field("pdfium_lib_dir", &self.pdfium_lib_dir)
            .field("image_dpi", &self.image_dpi)
            .field("infer_pdf_to_word", &self.infer_pdf_to_word)
            .finish()
    }
}

impl BotConfig {
    /// Create a new builder for `BotConfig`.
    pub fn builder(token: impl Into<String>) -> BotConfigBuilder {
        BotConfigBuilder {
            config: Self {
                token: token.into(),
                api_base_url: "https://api.telegram.org".to_string(),
                office_executable: "libreoffice".to_string(),
                office_timeout_secs: 30,
                max_concurrent_renders: 1,
                download_timeout_secs: 120,
                poll_timeout_secs: 30,
                concurrency: 16,
                scratch_dir: std::env::temp_dir().join("docbot"),
                pdfium_lib_dir: None,
                image_dpi: 100.0,
                infer_pdf_to_word: true,
            },
        }
    }

    pub fn office_timeout(&self) -> Duration {
        Duration::from_secs(self.office_timeout_secs)
    }

    pub fn download_timeout(&self) -> Duration {
        Duration::from_secs(self.download_timeout_secs)
    }
}

/// Builder for [`BotConfig`].
#[derive(Debug)]
pub struct BotConfigBuilder {
    config: BotConfig,
}

impl BotConfigBuilder {
    pub fn api_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.api_base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn office_executable(mut self, exe: impl Into<String>) -> Self {
        self.config.office_executable = exe.into();
        self
    }

    pub fn office_timeout_secs(mut self, secs: u64) -> Self {
        self.config.office_timeout_secs = secs.max(1);
        self
    }

    pub fn max_concurrent_renders(mut self, n: usize) -> Self {
        self.config.max_concurrent_renders = n.max(1);
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs.max(1);
        self
    }

    pub fn poll_timeout_secs(mut self, secs: u64) -> Self {
        self.config.poll_timeout_secs = secs;
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n.max(1);
        self
    }

    pub fn scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.scratch_dir = dir.into();
        self
    }

    pub fn pdfium_lib_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.pdfium_lib_dir = Some(dir.into());
        self
    }

    pub fn image_dpi(mut self, dpi: f32) -> Self {
        self.config.image_dpi = dpi.clamp(36.0, 600.0);
        self
    }

    pub fn infer_pdf_to_word(mut self, v: bool) -> Self {
        self.config.infer_pdf_to_word = v;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<BotConfig, ConvertError> {
        let c = &self.config;
        if c.token.trim().is_empty() {
            return Err(ConvertError::InvalidConfig(
                "bot token is required (set BOT_API)".into(),
            ));
        }
        if c.office_executable.trim().is_empty() {
            return Err(ConvertError::InvalidConfig(
                "office renderer executable must not be empty".into(),
            ));
        }
        if !c.api_base_url.starts_with("http://") && !c.api_base_url.starts_with("https://") {
            return Err(ConvertError::InvalidConfig(format!(
                "API base URL must be http(s), got '{}'",
                c.api_base_url
            )));
        }
        Ok(self.config)
    }
}
