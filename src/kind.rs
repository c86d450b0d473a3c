//! The closed set of conversions the bot offers.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// One supported conversion direction.
///
/// Each kind maps to exactly one tool adapter and one pair of
/// (input extension, output extension).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConversionKind {
    ImageToPdf,
    WordToPdf,
    PdfToWord,
}

impl ConversionKind {
    /// Every kind, in the order the selection menu lists them.
    pub const ALL: [ConversionKind; 3] = [
        ConversionKind::PdfToWord,
        ConversionKind::WordToPdf,
        ConversionKind::ImageToPdf,
    ];

    /// Default extension of the input artifact.
    pub fn input_extension(self) -> &'static str {
        match self {
            ConversionKind::ImageToPdf => "jpg",
            ConversionKind::WordToPdf => "docx",
            ConversionKind::PdfToWord => "pdf",
        }
    }

    /// Extension of the produced file.
    pub fn output_extension(self) -> &'static str {
        match self {
            ConversionKind::ImageToPdf | ConversionKind::WordToPdf => "pdf",
            ConversionKind::PdfToWord => "docx",
        }
    }

    /// Input extension for a concrete upload.
    ///
    /// The renderers pick their decoder from the file extension, so a
    /// source name with a recognised extension wins over the default.
    pub fn input_extension_for(self, source_name: Option<&str>) -> String {
        let accepted: &[&str] = match self {
            ConversionKind::ImageToPdf => {
                &["jpg", "jpeg", "png", "gif", "bmp", "webp", "tif", "tiff"]
            }
            ConversionKind::WordToPdf => &["docx", "doc", "odt", "rtf"],
            ConversionKind::PdfToWord => &["pdf"],
        };

        source_name
            .and_then(|name| Path::new(name).extension())
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
            .filter(|ext| accepted.contains(&ext.as_str()))
            .unwrap_or_else(|| self.input_extension().to_string())
    }

    /// Base name used for the result when the upload had no file name.
    pub fn placeholder_base(self) -> &'static str {
        match self {
            ConversionKind::ImageToPdf => "image",
            ConversionKind::WordToPdf | ConversionKind::PdfToWord => "document",
        }
    }

    /// Token carried by the inline keyboard button for this kind.
    pub fn selection_token(self) -> &'static str {
        match self {
            ConversionKind::ImageToPdf => "imageToPdf",
            ConversionKind::WordToPdf => "wordToPdf",
            ConversionKind::PdfToWord => "pdfToWord",
        }
    }

    /// Inverse of [`ConversionKind::selection_token`].
    pub fn from_selection_token(token: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.selection_token() == token)
    }

    /// Button label in the selection menu.
    pub fn label(self) -> &'static str {
        match self {
            ConversionKind::ImageToPdf => "Image to PDF",
            ConversionKind::WordToPdf => "Word to PDF",
            ConversionKind::PdfToWord => "PDF to Word",
        }
    }

    /// Prompt sent after the user picks this kind.
    pub fn upload_prompt(self) -> &'static str {
        match self {
            ConversionKind::ImageToPdf => "Send image file you want to convert to pdf",
            ConversionKind::WordToPdf => "Send the word file that you want to convert to pdf",
            ConversionKind::PdfToWord => "Send the pdf file that you want to convert to word",
        }
    }

    /// Acknowledgement sent when the file for this kind arrives.
    pub fn received_message(self) -> &'static str {
        match self {
            ConversionKind::ImageToPdf => "✅ Image received. Starting conversion to PDF...",
            ConversionKind::WordToPdf => "✅ Word DOCX received. Starting conversion to PDF...",
            ConversionKind::PdfToWord => "✅ PDF received. Starting conversion...",
        }
    }

    /// Caption attached to the converted document.
    pub fn success_caption(self) -> &'static str {
        match self {
            ConversionKind::ImageToPdf => "🎉 Your image has been converted to PDF!",
            ConversionKind::WordToPdf => "🎉 Your Word file has been converted to PDF!",
            ConversionKind::PdfToWord => "🎉 Your PDF has been converted to DOCX!",
        }
    }

    /// Result file name: the source name with its extension replaced.
    pub fn output_filename(self, source_name: Option<&str>) -> String {
        let base = source_name
            .map(|name| {
                Path::new(name)
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .unwrap_or("")
                    .to_string()
            })
            .filter(|stem| !stem.is_empty())
            .unwrap_or_else(|| self.placeholder_base().to_string());
        format!("{}.{}", base, self.output_extension())
    }
}

impl fmt::Display for ConversionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
