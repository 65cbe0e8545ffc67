mod config;
mod docx;
mod error;
mod model;
mod pipeline;
mod recognize;

pub use config::{ConvertConfig, DEFAULT_PREFIX, DEFAULT_SUFFIX, MarkerStyle, MinImageSize, TextMarkers};
pub use docx::{
    DocumentPackage, LocateOutcome, MediaPart, Relationship, Rewriter, locate_images, scan_images,
};
pub use error::Error;
pub use model::{
    ConversionOutcome, ConversionReport, Coordinate, ExtractedText, ImageAnchor, ImageId,
    Placement, RewriteReport,
};
pub use pipeline::{convert, recognize_all};
pub use recognize::{RasterImage, RecognitionOptions, Recognizer, TesseractCli};
#[cfg(feature = "tesseract")]
pub use recognize::Tesseract;

use std::path::Path;
use std::time::Instant;

/// Convert `input` and write the result to `output`. Nothing is written when
/// the document has no images, or when it is unchanged and
/// [`ConvertConfig::write_unchanged`] is off.
pub fn convert_docx(
    input: &Path,
    output: &Path,
    recognizer: &dyn Recognizer,
    config: &ConvertConfig,
) -> Result<ConversionOutcome, Error> {
    let t0 = Instant::now();
    log::info!("Processing document: {}", input.display());
    let package = DocumentPackage::open(input)?;
    convert_package(package, t0, output, recognizer, config)
}

pub fn convert_docx_bytes(
    input: &[u8],
    output: &Path,
    recognizer: &dyn Recognizer,
    config: &ConvertConfig,
) -> Result<ConversionOutcome, Error> {
    let t0 = Instant::now();
    let package = DocumentPackage::open_bytes(input)?;
    convert_package(package, t0, output, recognizer, config)
}

fn convert_package(
    mut package: DocumentPackage,
    t0: Instant,
    output: &Path,
    recognizer: &dyn Recognizer,
    config: &ConvertConfig,
) -> Result<ConversionOutcome, Error> {
    let t_parse = t0.elapsed();

    let outcome = pipeline::convert(&mut package, recognizer, config)?;
    let t_convert = t0.elapsed();

    if let ConversionOutcome::Converted(_) = outcome {
        log::info!("Step 4: Saving modified document...");
        package.save(output)?;
    }
    let t_total = t0.elapsed();

    log::info!(
        "Timing: parse={:.1}ms, convert={:.1}ms, write={:.1}ms, total={:.1}ms ({})",
        t_parse.as_secs_f64() * 1000.0,
        (t_convert - t_parse).as_secs_f64() * 1000.0,
        (t_total - t_convert).as_secs_f64() * 1000.0,
        t_total.as_secs_f64() * 1000.0,
        outcome.status(),
    );

    Ok(outcome)
}
