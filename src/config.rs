use crate::model::Placement;
use crate::recognize::RecognitionOptions;

pub const DEFAULT_PREFIX: &str = "\n[Extracted Text from Image]\n";
pub const DEFAULT_SUFFIX: &str = "\n[End of Extracted Text]\n";

/// Strings wrapped around every inserted text. An empty marker is omitted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TextMarkers {
    pub prefix: String,
    pub suffix: String,
}

impl Default for TextMarkers {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_PREFIX.to_string(),
            suffix: DEFAULT_SUFFIX.to_string(),
        }
    }
}

/// Run formatting for inserted content. Markers are bold in `marker_color`,
/// the recognized text is set at `text_size_pt`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MarkerStyle {
    pub marker_color: [u8; 3],
    pub text_size_pt: f32,
}

impl Default for MarkerStyle {
    fn default() -> Self {
        Self {
            marker_color: [0, 100, 0],
            text_size_pt: 10.0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MinImageSize {
    pub width: u32,
    pub height: u32,
}

impl MinImageSize {
    pub fn admits(&self, width: u32, height: u32) -> bool {
        width >= self.width && height >= self.height
    }
}

impl Default for MinImageSize {
    fn default() -> Self {
        Self {
            width: 50,
            height: 50,
        }
    }
}

/// Everything one conversion needs. Passed explicitly so documents with
/// different settings can be converted side by side.
#[derive(Clone, Debug)]
pub struct ConvertConfig {
    pub placement: Placement,
    pub markers: TextMarkers,
    pub style: MarkerStyle,
    pub min_size: MinImageSize,
    pub recognition: RecognitionOptions,
    /// Recognition worker threads per document; 1 keeps recognition on the calling thread.
    pub workers: usize,
    /// Save the output even when no text landed in the document.
    pub write_unchanged: bool,
}

impl Default for ConvertConfig {
    fn default() -> Self {
        Self {
            placement: Placement::Below,
            markers: TextMarkers::default(),
            style: MarkerStyle::default(),
            min_size: MinImageSize::default(),
            recognition: RecognitionOptions::default(),
            workers: 1,
            write_unchanged: true,
        }
    }
}
