//! Observer trait for per-job pipeline events.
//!
//! Pass an implementation to [`crate::pipeline::Pipeline::run`] to hear
//! about a job as it moves through its stages. The bot uses it to tell the
//! user that processing has started once the file is downloaded; tests use
//! it to assert stage ordering.
//!
//! All methods have default no-op implementations so callers only override
//! what they care about.

use crate::kind::ConversionKind;
use async_trait::async_trait;

/// Called by the pipeline as one job progresses.
///
/// Jobs for different users run concurrently, so implementations shared
/// between jobs must be `Send + Sync` and synchronise their own state.
#[async_trait]
pub trait JobObserver: Send + Sync {
    /// The source file was fetched.
    async fn on_downloaded(&self, kind: ConversionKind, bytes: usize) {
        let _ = (kind, bytes);
    }

    /// The converter is about to run.
    async fn on_tool_start(&self, kind: ConversionKind, tool: &str) {
        let _ = (kind, tool);
    }

    /// The converted bytes were read back.
    async fn on_completed(&self, kind: ConversionKind, bytes: usize) {
        let _ = (kind, bytes);
    }
}

/// Observer that ignores every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl JobObserver for NoopObserver {}
