//! pdfium-backed work: binding the library, images → PDF, page text.
//!
//! ## Why spawn_blocking?
//!
//! The `pdfium-render` crate wraps the pdfium C++ library, which uses
//! thread-local state internally and is not safe to call from async contexts.
//! Every entry point here moves its work onto the blocking pool so Tokio
//! worker threads keep serving other users while a page is being built.

use crate::error::ConvertError;
use crate::pipeline::tool::ToolAdapter;
use async_trait::async_trait;
use image::{DynamicImage, ImageReader};
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const TOOL: &str = "pdfium";

/// Bind pdfium from `lib_dir`, or from the system library path when `None`.
pub(crate) fn bind_pdfium(lib_dir: Option<&Path>) -> Result<Pdfium, ConvertError> {
    let bindings = match lib_dir {
        Some(dir) => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(dir)),
        None => Pdfium::bind_to_system_library(),
    }
    .map_err(|e| ConvertError::tool(TOOL, format!("failed to bind pdfium library: {e:?}")))?;

    Ok(Pdfium::new(bindings))
}

/// Page size in PDF points for an image shown at `dpi`.
pub fn page_size_points(width_px: u32, height_px: u32, dpi: f32) -> (f32, f32) {
    let scale = 72.0 / dpi;
    (width_px as f32 * scale, height_px as f32 * scale)
}

/// In-process image → single-page PDF converter.
#[derive(Debug, Clone)]
pub struct ImageToPdf {
    lib_dir: Option<PathBuf>,
    dpi: f32,
}

impl ImageToPdf {
    pub fn new(lib_dir: Option<PathBuf>, dpi: f32) -> Self {
        Self { lib_dir, dpi }
    }
}

#[async_trait]
impl ToolAdapter for ImageToPdf {
    fn name(&self) -> &str {
        "pdfium-image"
    }

    async fn convert(&self, input: &Path, output: &Path) -> Result<(), ConvertError> {
        let input = input.to_path_buf();
        let output = output.to_path_buf();
        let lib_dir = self.lib_dir.clone();
        let dpi = self.dpi;

        tokio::task::spawn_blocking(move || {
            render_image_to_pdf_blocking(&input, &output, lib_dir.as_deref(), dpi)
        })
        .await
        .map_err(|e| ConvertError::Internal(format!("Image render task panicked: {}", e)))?
    }
}

/// Blocking implementation of image → PDF.
fn render_image_to_pdf_blocking(
    input: &Path,
    output: &Path,
    lib_dir: Option<&Path>,
    dpi: f32,
) -> Result<(), ConvertError> {
    let image = decode_image(input)?;
    let (width, height) = page_size_points(image.width(), image.height(), dpi);
    debug!(
        "Image {}x{} px → page {:.1}x{:.1} pt",
        image.width(),
        image.height(),
        width,
        height
    );

    let pdfium = bind_pdfium(lib_dir)?;
    let to_tool_error = |e: PdfiumError| ConvertError::tool(TOOL, format!("{:?}", e));

    let mut document = pdfium.create_new_pdf().map_err(to_tool_error)?;
    {
        let mut page = document
            .pages_mut()
            .create_page_at_end(PdfPagePaperSize::Custom(
                PdfPoints::new(width),
                PdfPoints::new(height),
            ))
            .map_err(to_tool_error)?;

        page.objects_mut()
            .create_image_object(
                PdfPoints::ZERO,
                PdfPoints::ZERO,
                &image,
                Some(PdfPoints::new(width)),
                Some(PdfPoints::new(height)),
            )
            .map_err(to_tool_error)?;
    }

    document.save_to_file(output).map_err(to_tool_error)?;
    info!("Wrote image PDF {}", output.display());
    Ok(())
}

/// Decode an image, sniffing the format from content rather than extension.
fn decode_image(input: &Path) -> Result<DynamicImage, ConvertError> {
    ImageReader::open(input)
        .map_err(|e| ConvertError::storage(input, e))?
        .with_guessed_format()
        .map_err(|e| ConvertError::storage(input, e))?
        .decode()
        .map_err(|e| ConvertError::tool("image", format!("cannot decode image: {e}")))
}

/// Extract the text of every page of a PDF, in page order.
///
/// Blocking; call from `spawn_blocking`.
pub(crate) fn extract_page_text_blocking(
    pdf_path: &Path,
    lib_dir: Option<&Path>,
) -> Result<Vec<String>, ConvertError> {
    let pdfium = bind_pdfium(lib_dir)?;

    let document = pdfium
        .load_pdf_from_file(pdf_path, None)
        .map_err(|e| ConvertError::tool(TOOL, format!("cannot open PDF: {:?}", e)))?;

    let pages = document.pages();
    info!("PDF loaded: {} pages", pages.len());

    let mut texts = Vec::with_capacity(pages.len() as usize);
    for (idx, page) in pages.iter().enumerate() {
        let text = page
            .text()
            .map_err(|e| ConvertError::tool(TOOL, format!("page {}: {:?}", idx + 1, e)))?
            .all();
        debug!("Page {} → {} chars", idx + 1, text.len());
        texts.push(text);
    }

    Ok(texts)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_size_at_72_dpi_is_pixel_size() {
        assert_eq!(page_size_points(600, 300, 72.0), (600.0, 300.0));
    }

    #[test]
    fn page_size_scales_with_dpi() {
        let (w, h) = page_size_points(1000, 500, 100.0);
        assert!((w - 720.0).abs() < 0.01);
        assert!((h - 360.0).abs() < 0.01);
    }

    #[test]
    fn undecodable_image_is_tool_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.jpg");
        std::fs::write(&path, b"definitely not an image").unwrap();
        let err = decode_image(&path).unwrap_err();
        assert!(matches!(err, ConvertError::ToolExecution { .. }), "got {err:?}");
    }

    #[test]
    fn decode_sniffs_format_from_content() {
        let dir = tempfile::tempdir().unwrap();
        // PNG bytes under a .jpg name, as chat clients sometimes send
        let path = dir.path().join("photo.jpg");
        let img = DynamicImage::ImageRgb8(image::RgbImage::from_pixel(4, 3, image::Rgb([9, 9, 9])));
        img.save_with_format(&path, image::ImageFormat::Png).unwrap();

        let decoded = decode_image(&path).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (4, 3));
    }
}
