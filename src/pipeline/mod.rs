//! Conversion pipelines: one shape, three tools.
//!
//! Each submodule implements one concern; [`Pipeline::run`] strings them
//! together for a single uploaded file.
//!
//! ## Data Flow
//!
//! ```text
//! fetch ──▶ write input ──▶ tool ──▶ read output ──▶ release ──▶ bytes + name
//! (transport) (artifact)   (adapter)  (artifact)      (artifact)
//! ```
//!
//! 1. [`artifact`]  uniquely named temp files deleted on release or drop
//! 2. [`tool`]      the [`ToolAdapter`] seam and the per-kind [`Toolbox`]
//! 3. [`office`]    office documents → PDF via a renderer subprocess
//! 4. [`render`]    pdfium: images → PDF, and page text extraction
//! 5. [`document`]  PDF → DOCX from extracted page text
//!
//! A download failure returns before any artifact exists. Once the input
//! artifact is acquired, both artifacts are owned by a [`ConversionJob`] and
//! released on every exit path: eagerly on normal return, by `Drop` if the
//! task is cancelled or panics.

pub mod artifact;
pub mod document;
pub mod office;
pub mod render;
pub mod tool;

use crate::error::ConvertError;
use crate::kind::ConversionKind;
use crate::progress::JobObserver;
use crate::transport::{FileRef, Transport};
use artifact::{Artifact, ArtifactStore};
use std::time::Instant;
use tool::{ToolAdapter, Toolbox};
use tracing::{info, warn};

/// The result of a successful job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertedFile {
    pub kind: ConversionKind,
    pub bytes: Vec<u8>,
    /// Suggested name for the delivered file.
    pub filename: String,
}

/// Runs conversion jobs against one artifact store and toolbox.
#[derive(Clone)]
pub struct Pipeline {
    store: ArtifactStore,
    tools: Toolbox,
}

impl Pipeline {
    pub fn new(store: ArtifactStore, tools: Toolbox) -> Self {
        Self { store, tools }
    }

    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    /// Convert one uploaded file.
    ///
    /// # Errors
    /// - [`ConvertError::Download`]: the source could not be fetched; no
    ///   artifact was created
    /// - [`ConvertError::Storage`]: an artifact could not be created/written
    /// - [`ConvertError::ToolExecution`] / [`ConvertError::ToolOutputMissing`]
    pub async fn run(
        &self,
        kind: ConversionKind,
        source: &FileRef,
        transport: &dyn Transport,
        observer: &dyn JobObserver,
    ) -> Result<ConvertedFile, ConvertError> {
        let started = Instant::now();
        info!("Starting {} job for file {}", kind, source.file_id);

        // ── Step 1: Fetch source bytes ───────────────────────────────────
        let bytes = transport.fetch_file_bytes(source).await?;
        observer.on_downloaded(kind, bytes.len()).await;

        // ── Step 2: Acquire artifacts ────────────────────────────────────
        let job = ConversionJob::prepare(&self.store, kind, source)?;

        // ── Steps 3–4: Write, convert, read back ─────────────────────────
        let tool = self.tools.for_kind(kind);
        let outcome = job.execute(tool.as_ref(), &bytes, observer).await;

        // ── Step 5: Release, whatever happened above ─────────────────────
        job.finish();

        // ── Step 6: Result ───────────────────────────────────────────────
        let output = outcome?;
        observer.on_completed(kind, output.len()).await;

        info!(
            "{} job for {} done: {} → {} bytes in {}ms",
            kind,
            source.file_id,
            bytes.len(),
            output.len(),
            started.elapsed().as_millis()
        );

        Ok(ConvertedFile {
            kind,
            bytes: output,
            filename: kind.output_filename(source.file_name.as_deref()),
        })
    }
}

/// The temp artifacts of one job. Never shared between jobs.
#[derive(Debug)]
pub struct ConversionJob {
    kind: ConversionKind,
    input: Artifact,
    output: Artifact,
}

impl ConversionJob {
    /// Acquire the input artifact and guard the output location next to it.
    pub fn prepare(
        store: &ArtifactStore,
        kind: ConversionKind,
        source: &FileRef,
    ) -> Result<Self, ConvertError> {
        let input = store.acquire(&kind.input_extension_for(source.file_name.as_deref()))?;
        let output = store.companion(&input, kind.output_extension())?;
        Ok(Self {
            kind,
            input,
            output,
        })
    }

    pub fn kind(&self) -> ConversionKind {
        self.kind
    }

    /// Write `source` to the input artifact, run `tool`, read the output.
    pub async fn execute(
        &self,
        tool: &dyn ToolAdapter,
        source: &[u8],
        observer: &dyn JobObserver,
    ) -> Result<Vec<u8>, ConvertError> {
        self.input.write(source).await?;

        observer.on_tool_start(self.kind, tool.name()).await;
        tool.convert(self.input.path(), self.output.path()).await?;

        if !self.output.exists() {
            return Err(ConvertError::ToolOutputMissing {
                tool: tool.name().to_string(),
                path: self.output.path().to_path_buf(),
                diagnostics: "tool reported success without writing its output".to_string(),
            });
        }

        self.output.read().await
    }

    /// Delete both artifacts. Failures are logged; the job result stands.
    pub fn finish(self) {
        for artifact in [self.input, self.output] {
            if let Err(e) = artifact.release() {
                warn!("Artifact cleanup failed: {}", e);
            }
        }
    }
}
