use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Document-order position of a located image. Derived on every run, never persisted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ImageId(pub usize);

impl fmt::Display for ImageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "image_{}", self.0)
    }
}

/// Structural address of the run holding an image: direct `w:p` children of
/// the body, then direct `w:r` children of that paragraph. Both 0-based.
///
/// Only meaningful against the body snapshot it was computed from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Coordinate {
    pub paragraph: usize,
    pub run: usize,
}

impl Coordinate {
    pub fn new(paragraph: usize, run: usize) -> Self {
        Self { paragraph, run }
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "paragraph {}, run {}", self.paragraph, self.run)
    }
}

#[derive(Clone, Debug)]
pub struct ImageAnchor {
    pub image_id: ImageId,
    pub coordinate: Coordinate,
    pub relationship_id: String,
    pub media_type: Option<String>,
    /// Copied out of the media part; the package itself is never aliased.
    pub bytes: Vec<u8>,
}

/// Recognized text keyed by image. An empty string means "recognized, nothing
/// found"; a missing key means the image was never sent to the recognizer.
pub type ExtractedText = BTreeMap<ImageId, String>;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Placement {
    /// Keep the image and add a paragraph with the text right after it.
    #[default]
    Below,
    /// Clear the image's run and put the text in its place.
    Replace,
}

impl FromStr for Placement {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "below" => Ok(Placement::Below),
            "replace" => Ok(Placement::Replace),
            other => Err(format!("unknown placement '{other}' (expected 'below' or 'replace')")),
        }
    }
}

impl fmt::Display for Placement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Placement::Below => f.write_str("below"),
            Placement::Replace => f.write_str("replace"),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RewriteReport {
    /// Anchors whose text landed in the document.
    pub applied: Vec<ImageId>,
    /// Anchors left untouched because their text was blank.
    pub blank: Vec<ImageId>,
    /// Anchors whose coordinate no longer addressed a paragraph or run.
    pub failed: Vec<ImageId>,
}

impl RewriteReport {
    pub fn changed(&self) -> bool {
        !self.applied.is_empty()
    }
}

#[derive(Clone, Debug, Default)]
pub struct ConversionReport {
    pub images_found: usize,
    /// Images handed to the recognizer, whatever it returned.
    pub images_processed: usize,
    pub texts_inserted: usize,
    pub texts: ExtractedText,
    pub rewrite: RewriteReport,
}

impl ConversionReport {
    pub fn status(&self) -> String {
        format!(
            "Successfully processed {} of {} images ({} with text inserted)",
            self.images_processed, self.images_found, self.texts_inserted
        )
    }
}

#[derive(Clone, Debug)]
pub enum ConversionOutcome {
    /// The body holds no resolvable images. Nothing was written.
    NoImages,
    /// Images were processed but no text landed, and writing unchanged output is disabled.
    Unchanged(ConversionReport),
    Converted(ConversionReport),
}

impl ConversionOutcome {
    pub fn report(&self) -> Option<&ConversionReport> {
        match self {
            ConversionOutcome::NoImages => None,
            ConversionOutcome::Unchanged(r) | ConversionOutcome::Converted(r) => Some(r),
        }
    }

    pub fn images_processed(&self) -> usize {
        self.report().map_or(0, |r| r.images_processed)
    }

    pub fn status(&self) -> String {
        match self {
            ConversionOutcome::NoImages => "No images found in the document".to_string(),
            ConversionOutcome::Unchanged(r) => format!("{}; document unchanged", r.status()),
            ConversionOutcome::Converted(r) => r.status(),
        }
    }
}
