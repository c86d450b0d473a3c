//! End-to-end tests against the real converters.
//!
//! These need LibreOffice on `PATH` and the pdfium shared library (in
//! `PDFIUM_LIB_DIR` or on the system library path). They are gated behind
//! the `E2E_ENABLED` environment variable so they do not run in CI unless
//! explicitly requested.
//!
//! Run with:
//!   E2E_ENABLED=1 PDFIUM_LIB_DIR=/opt/pdfium/lib cargo test --test e2e -- --nocapture

mod common;

use common::*;
use docbot::pipeline::document::build_document;
use docbot::{
    ConversionKind, FileOutcome, ImageToPdf, OfficeRenderer, PdfToDocument, ToolAdapter, Toolbox,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

macro_rules! e2e_skip_unless_enabled {
    () => {{
        if std::env::var("E2E_ENABLED").is_err() {
            println!("SKIP: set E2E_ENABLED=1 to run e2e tests");
            return;
        }
    }};
}

fn pdfium_lib_dir() -> Option<PathBuf> {
    std::env::var_os("PDFIUM_LIB_DIR").map(PathBuf::from)
}

fn real_toolbox() -> Toolbox {
    Toolbox::new(
        Arc::new(ImageToPdf::new(pdfium_lib_dir(), 100.0)),
        Arc::new(OfficeRenderer::new("libreoffice", Duration::from_secs(120), 1)),
        Arc::new(PdfToDocument::new(pdfium_lib_dir())),
    )
}

fn sample_png() -> Vec<u8> {
    let img = image::RgbImage::from_fn(200, 100, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    });
    let mut bytes = std::io::Cursor::new(Vec::new());
    img.write_to(&mut bytes, image::ImageFormat::Png).unwrap();
    bytes.into_inner()
}

fn sample_docx() -> Vec<u8> {
    let pages = vec![
        "Quarterly report\n\nRevenue grew.".to_string(),
        "Appendix\nTables follow.".to_string(),
    ];
    let mut bytes = std::io::Cursor::new(Vec::new());
    build_document(&pages).build().pack(&mut bytes).unwrap();
    bytes.into_inner()
}

#[tokio::test]
async fn test_image_to_pdf_with_pdfium() {
    e2e_skip_unless_enabled!();
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("photo.jpg");
    let output = dir.path().join("photo.pdf");
    // PNG bytes under a .jpg name, as photo uploads arrive
    std::fs::write(&input, sample_png()).unwrap();

    ImageToPdf::new(pdfium_lib_dir(), 100.0)
        .convert(&input, &output)
        .await
        .unwrap();

    let pdf = std::fs::read(&output).unwrap();
    assert!(pdf.starts_with(b"%PDF"), "not a PDF");
}

#[tokio::test]
async fn test_word_to_pdf_with_libreoffice() {
    e2e_skip_unless_enabled!();
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("report.docx");
    std::fs::write(&input, sample_docx()).unwrap();

    OfficeRenderer::new("libreoffice", Duration::from_secs(120), 1)
        .convert(&input, &dir.path().join("report.pdf"))
        .await
        .unwrap();

    let pdf = std::fs::read(dir.path().join("report.pdf")).unwrap();
    assert!(pdf.starts_with(b"%PDF"));
}

#[tokio::test]
async fn test_full_dialogue_all_kinds() {
    e2e_skip_unless_enabled!();
    let h = Harness::new(real_toolbox());
    let alice = sender(1);

    h.transport.serve_file("img", sample_png());
    h.transport.serve_file("docx", sample_docx());

    h.bot.handle(select(&alice, "imageToPdf")).await;
    let image = h.bot.on_file_message(&alice, file("img", None)).await;
    assert!(matches!(image, FileOutcome::Delivered { .. }), "{image:?}");

    h.bot.handle(select(&alice, "wordToPdf")).await;
    let word = h.bot.on_file_message(&alice, file("docx", Some("report.docx"))).await;
    assert!(matches!(word, FileOutcome::Delivered { .. }), "{word:?}");

    // feed the rendered report back as a PDF upload
    let docs = h.transport.documents_to(alice.chat);
    let (_, _, report_pdf) = docs
        .iter()
        .find(|(name, _, _)| name == "report.pdf")
        .cloned()
        .unwrap();
    h.transport.serve_file("pdf", report_pdf);

    let back = h.bot.on_file_message(&alice, file("pdf", Some("report.pdf"))).await;
    assert!(
        matches!(
            &back,
            FileOutcome::Delivered { kind: ConversionKind::PdfToWord, filename, .. }
                if filename == "report.docx"
        ),
        "{back:?}"
    );
    let docx = &h.transport.documents_to(alice.chat)[2].2;
    assert!(docx.starts_with(b"PK"), "DOCX is a zip package");

    assert!(h.leftovers().is_empty(), "{:?}", h.leftovers());
}
