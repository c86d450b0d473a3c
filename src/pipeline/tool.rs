//! The seam between the pipeline and the converters it drives.
//!
//! Subprocess renderers and in-process libraries both implement
//! [`ToolAdapter`], so [`crate::pipeline::Pipeline`] never knows which kind
//! of tool it is talking to. A [`Toolbox`] holds one adapter per
//! [`ConversionKind`].

use crate::config::BotConfig;
use crate::error::ConvertError;
use crate::kind::ConversionKind;
use crate::pipeline::document::PdfToDocument;
use crate::pipeline::office::OfficeRenderer;
use crate::pipeline::render::ImageToPdf;
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;

/// A converter that reads `input` and writes `output`.
///
/// Implementations hold no per-call state. Failures of the tool itself are
/// reported as [`ConvertError::ToolExecution`]; an implementation that can
/// tell the tool "succeeded" without writing `output` reports
/// [`ConvertError::ToolOutputMissing`].
#[async_trait]
pub trait ToolAdapter: Send + Sync {
    /// Short name used in logs and error messages.
    fn name(&self) -> &str;

    async fn convert(&self, input: &Path, output: &Path) -> Result<(), ConvertError>;
}

/// One adapter per conversion kind.
#[derive(Clone)]
pub struct Toolbox {
    image_to_pdf: Arc<dyn ToolAdapter>,
    word_to_pdf: Arc<dyn ToolAdapter>,
    pdf_to_word: Arc<dyn ToolAdapter>,
}

impl Toolbox {
    pub fn new(
        image_to_pdf: Arc<dyn ToolAdapter>,
        word_to_pdf: Arc<dyn ToolAdapter>,
        pdf_to_word: Arc<dyn ToolAdapter>,
    ) -> Self {
        Self {
            image_to_pdf,
            word_to_pdf,
            pdf_to_word,
        }
    }

    /// The production adapters: pdfium for images and PDFs, the office
    /// renderer subprocess for Word documents.
    pub fn from_config(config: &BotConfig) -> Self {
        Self::new(
            Arc::new(ImageToPdf::new(config.pdfium_lib_dir.clone(), config.image_dpi)),
            Arc::new(OfficeRenderer::from_config(config)),
            Arc::new(PdfToDocument::new(config.pdfium_lib_dir.clone())),
        )
    }

    pub fn for_kind(&self, kind: ConversionKind) -> &Arc<dyn ToolAdapter> {
        match kind {
            ConversionKind::ImageToPdf => &self.image_to_pdf,
            ConversionKind::WordToPdf => &self.word_to_pdf,
            ConversionKind::PdfToWord => &self.pdf_to_word,
        }
    }
}
