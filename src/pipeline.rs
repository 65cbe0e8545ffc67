//! Locate → recognize → rewrite for one document.

use rayon::prelude::*;

use crate::config::ConvertConfig;
use crate::docx::{DocumentPackage, Rewriter, locate_images};
use crate::error::Error;
use crate::model::{ConversionOutcome, ConversionReport, ExtractedText, ImageAnchor, ImageId};
use crate::recognize::{RasterImage, Recognizer};

enum RecognizeOutcome {
    Recognized(String),
    TooSmall { width: u32, height: u32 },
    Undecodable(Error),
}

/// Convert the images of an opened package in memory. Nothing is written;
/// callers save the package when the outcome says so.
///
/// Every image is recognized before the body is touched, so the rewriter
/// always works against the snapshot the locator saw.
pub fn convert(
    package: &mut DocumentPackage,
    recognizer: &dyn Recognizer,
    config: &ConvertConfig,
) -> Result<ConversionOutcome, Error> {
    log::info!("Step 1: Extracting images from document...");
    let anchors = locate_images(package)?;
    if anchors.is_empty() {
        log::warn!("No images found in the document");
        return Ok(ConversionOutcome::NoImages);
    }
    log::info!("Found {} images", anchors.len());

    log::info!("Step 2: Performing OCR on images...");
    let texts = recognize_all(&anchors, recognizer, config)?;

    log::info!("Step 3: Reconstructing document with extracted text...");
    let rewrite = Rewriter::from_config(config).rewrite(package, &anchors, &texts)?;

    let report = ConversionReport {
        images_found: anchors.len(),
        images_processed: texts.len(),
        texts_inserted: rewrite.applied.len(),
        texts,
        rewrite,
    };
    log::info!("{}", report.status());

    if !report.rewrite.changed() && !config.write_unchanged {
        return Ok(ConversionOutcome::Unchanged(report));
    }
    Ok(ConversionOutcome::Converted(report))
}

/// Recognize every admissible anchor. With more than one worker the anchors
/// are spread over a dedicated pool; each task fills only its own slot.
pub fn recognize_all(
    anchors: &[ImageAnchor],
    recognizer: &dyn Recognizer,
    config: &ConvertConfig,
) -> Result<ExtractedText, Error> {
    let outcomes: Vec<(ImageId, RecognizeOutcome)> = if config.workers <= 1 {
        anchors
            .iter()
            .map(|a| (a.image_id, recognize_one(a, recognizer, config)))
            .collect()
    } else {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.workers)
            .build()
            .map_err(|e| Error::Recognition(format!("cannot start recognition workers: {e}")))?;
        pool.install(|| {
            anchors
                .par_iter()
                .map(|a| (a.image_id, recognize_one(a, recognizer, config)))
                .collect()
        })
    };

    let total = outcomes.len();
    let mut texts = ExtractedText::new();
    for (idx, (image_id, outcome)) in outcomes.into_iter().enumerate() {
        match outcome {
            RecognizeOutcome::Recognized(text) => {
                if text.trim().is_empty() {
                    log::warn!("No text extracted from {image_id} ({}/{total})", idx + 1);
                } else {
                    log::info!(
                        "Extracted {} characters from {image_id} ({}/{total})",
                        text.chars().count(),
                        idx + 1
                    );
                }
                texts.insert(image_id, text);
            }
            RecognizeOutcome::TooSmall { width, height } => {
                log::warn!(
                    "Image {image_id} is too small ({width}x{height}, minimum {}x{}), skipping",
                    config.min_size.width,
                    config.min_size.height
                );
            }
            RecognizeOutcome::Undecodable(e) => {
                log::warn!("Image {image_id} cannot be decoded, skipping: {e}");
            }
        }
    }
    Ok(texts)
}

fn recognize_one(
    anchor: &ImageAnchor,
    recognizer: &dyn Recognizer,
    config: &ConvertConfig,
) -> RecognizeOutcome {
    let image = match RasterImage::decode(&anchor.bytes) {
        Ok(image) => image,
        Err(e) => return RecognizeOutcome::Undecodable(e),
    };
    let (width, height) = (image.width(), image.height());
    if !config.min_size.admits(width, height) {
        return RecognizeOutcome::TooSmall { width, height };
    }
    match recognizer.recognize(&image, &config.recognition) {
        Ok(text) => RecognizeOutcome::Recognized(text),
        Err(e) => {
            log::error!("OCR failed for {}: {e}", anchor.image_id);
            RecognizeOutcome::Recognized(String::new())
        }
    }
}
