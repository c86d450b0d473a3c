//! PDF → Word document, in process.
//!
//! pdfium extracts the text of each page and `docx-rs` writes it out: one
//! paragraph per text line, a page break between PDF pages, runs of blank
//! lines collapsed to one. Layout, images and fonts are not carried over.
//!
//! There is no timeout here. The work runs on the blocking pool and cannot
//! be cancelled once started, and abandoning it early would let it write
//! the output after the job already released that path.

use crate::error::ConvertError;
use crate::pipeline::render::extract_page_text_blocking;
use crate::pipeline::tool::ToolAdapter;
use async_trait::async_trait;
use docx_rs::{BreakType, Docx, Paragraph, Run};
use std::path::{Path, PathBuf};
use tracing::info;

/// In-process PDF → DOCX converter.
#[derive(Debug, Clone, Default)]
pub struct PdfToDocument {
    lib_dir: Option<PathBuf>,
}

impl PdfToDocument {
    pub fn new(lib_dir: Option<PathBuf>) -> Self {
        Self { lib_dir }
    }

    /// Convert `input` to a DOCX at `output`. Blocking.
    pub fn render_pdf_to_document(&self, input: &Path, output: &Path) -> Result<(), ConvertError> {
        let pages = extract_page_text_blocking(input, self.lib_dir.as_deref())?;
        let file = std::fs::File::create(output).map_err(|e| ConvertError::storage(output, e))?;
        build_document(&pages)
            .build()
            .pack(file)
            .map_err(|e| ConvertError::tool("docx-rs", format!("cannot write DOCX: {e}")))?;

        info!("Wrote {} pages to {}", pages.len(), output.display());
        Ok(())
    }
}

#[async_trait]
impl ToolAdapter for PdfToDocument {
    fn name(&self) -> &str {
        "pdfium-docx"
    }

    async fn convert(&self, input: &Path, output: &Path) -> Result<(), ConvertError> {
        let this = self.clone();
        let input = input.to_path_buf();
        let output = output.to_path_buf();

        tokio::task::spawn_blocking(move || this.render_pdf_to_document(&input, &output))
            .await
            .map_err(|e| ConvertError::Internal(format!("DOCX task panicked: {}", e)))?
    }
}

/// Lay out extracted page texts as a Word document.
pub fn build_document(pages: &[String]) -> Docx {
    let mut docx = Docx::new();

    for (idx, text) in pages.iter().enumerate() {
        if idx > 0 {
            docx = docx.add_paragraph(
                Paragraph::new().add_run(Run::new().add_break(BreakType::Page)),
            );
        }
        for line in page_lines(text) {
            docx = docx.add_paragraph(Paragraph::new().add_run(Run::new().add_text(line)));
        }
    }

    docx
}

/// Split page text into paragraph lines, collapsing blank runs.
fn page_lines(text: &str) -> Vec<&str> {
    let mut lines = Vec::new();
    let mut previous_blank = true;

    for line in text.lines() {
        let line = line.trim_end_matches('\r').trim_end();
        let blank = line.trim().is_empty();
        if blank && previous_blank {
            continue;
        }
        lines.push(if blank { "" } else { line });
        previous_blank = blank;
    }

    while lines.last() == Some(&"") {
        lines.pop();
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn page_lines_collapses_blank_runs() {
        let text = "\r\nTitle\r\n\r\n\r\nBody line\r\n  \r\nEnd\r\n\r\n";
        assert_eq!(page_lines(text), vec!["Title", "", "Body line", "", "End"]);
    }

    #[test]
    fn page_lines_of_empty_page_is_empty() {
        assert!(page_lines("").is_empty());
        assert!(page_lines("\n \n").is_empty());
    }

    #[test]
    fn built_document_is_a_zip_package() {
        let pages = vec!["First page".to_string(), "Second page".to_string()];
        let mut buf = Cursor::new(Vec::new());
        build_document(&pages).build().pack(&mut buf).unwrap();

        let bytes = buf.into_inner();
        assert!(bytes.len() > 100);
        assert_eq!(&bytes[..2], b"PK");
    }
}
