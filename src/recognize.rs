use std::io::{Cursor, Write};
use std::path::PathBuf;
use std::process::{Command, Stdio};

use image::DynamicImage;

use crate::error::Error;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecognitionOptions {
    /// Tesseract-style language code, e.g. "eng", "fra", "deu+eng".
    pub language: String,
    /// Recognize a grayscale variant of the image instead of the original.
    pub enhanced: bool,
    /// Page segmentation mode; 3 is fully automatic.
    pub page_segmentation: u8,
}

impl Default for RecognitionOptions {
    fn default() -> Self {
        Self {
            language: "eng".to_string(),
            enhanced: false,
            page_segmentation: 3,
        }
    }
}

/// A decoded image handed to a [`Recognizer`].
#[derive(Clone, Debug)]
pub struct RasterImage {
    image: DynamicImage,
}

impl RasterImage {
    pub fn decode(data: &[u8]) -> Result<Self, Error> {
        Ok(Self {
            image: image::load_from_memory(data)?,
        })
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn grayscale(&self) -> RasterImage {
        RasterImage {
            image: DynamicImage::ImageLuma8(self.image.to_luma8()),
        }
    }

    pub fn as_dynamic(&self) -> &DynamicImage {
        &self.image
    }

    pub fn to_png(&self) -> Result<Vec<u8>, Error> {
        let mut buf = Cursor::new(Vec::new());
        self.image.write_to(&mut buf, image::ImageFormat::Png)?;
        Ok(buf.into_inner())
    }
}

impl From<DynamicImage> for RasterImage {
    fn from(image: DynamicImage) -> Self {
        Self { image }
    }
}

/// Turns pixels into text. Called once per image, possibly from several
/// threads at once for different images.
pub trait Recognizer: Send + Sync {
    fn recognize(&self, image: &RasterImage, options: &RecognitionOptions) -> Result<String, Error>;
}

impl<F> Recognizer for F
where
    F: Fn(&RasterImage, &RecognitionOptions) -> Result<String, Error> + Send + Sync,
{
    fn recognize(&self, image: &RasterImage, options: &RecognitionOptions) -> Result<String, Error> {
        self(image, options)
    }
}

/// Tesseract through `leptess`, with the image handed over as in-memory PNG.
///
/// The engine handle is not shareable between threads, so every call
/// initializes its own; the instance only remembers where to find the
/// language data.
#[cfg(feature = "tesseract")]
pub struct Tesseract {
    data_path: Option<String>,
}

#[cfg(feature = "tesseract")]
impl Tesseract {
    /// Fails if Tesseract cannot be initialized for `language`.
    pub fn new(language: &str) -> Result<Self, Error> {
        Self::with_data_path(None, language)
    }

    /// Like [`Tesseract::new`], reading language data from `data_path`
    /// instead of the default tessdata directory.
    pub fn with_data_path(data_path: Option<String>, language: &str) -> Result<Self, Error> {
        leptess::LepTess::new(data_path.as_deref(), language).map_err(|e| {
            Error::Recognition(format!(
                "Failed to initialize Tesseract with language '{language}': {e}. \
                 Please install Tesseract OCR and its language data"
            ))
        })?;
        log::info!("Tesseract OCR is available (language: {language})");
        Ok(Self { data_path })
    }
}

#[cfg(feature = "tesseract")]
impl Recognizer for Tesseract {
    fn recognize(&self, image: &RasterImage, options: &RecognitionOptions) -> Result<String, Error> {
        let png = if options.enhanced {
            image.grayscale().to_png()?
        } else {
            image.to_png()?
        };

        let mut lt = leptess::LepTess::new(self.data_path.as_deref(), &options.language)
            .map_err(|e| Error::Recognition(format!("Failed to initialize Tesseract: {e}")))?;
        lt.set_variable(
            leptess::Variable::TesseditPagesegMode,
            &options.page_segmentation.to_string(),
        )
        .map_err(|e| Error::Recognition(format!("Failed to set PSM: {e}")))?;
        lt.set_image_from_mem(&png)
            .map_err(|e| Error::Recognition(format!("Failed to set image from memory: {e}")))?;
        let text = lt
            .get_utf8_text()
            .map_err(|e| Error::Recognition(format!("Tesseract returned invalid UTF-8: {e}")))?
            .trim()
            .to_string();

        log_recognized(&text);
        Ok(text)
    }
}

fn log_recognized(text: &str) {
    if text.is_empty() {
        log::warn!("No text found in image");
    } else {
        log::info!("Successfully extracted {} characters", text.chars().count());
    }
}

/// Runs the `tesseract` executable, feeding the image as PNG on stdin.
///
/// Fallback for builds without the `tesseract` feature; prefer [`Tesseract`],
/// which links the engine through `leptess`.
pub struct TesseractCli {
    program: PathBuf,
}

impl TesseractCli {
    pub fn new() -> Result<Self, Error> {
        Self::with_program("tesseract")
    }

    /// Fails if `program --version` cannot be run.
    pub fn with_program(program: impl Into<PathBuf>) -> Result<Self, Error> {
        let program = program.into();
        let output = Command::new(&program)
            .arg("--version")
            .output()
            .map_err(|e| {
                Error::Recognition(format!(
                    "Tesseract not found ({}): {e}. Please install Tesseract OCR",
                    program.display()
                ))
            })?;
        if !output.status.success() {
            return Err(Error::Recognition(format!(
                "{} --version exited with {}",
                program.display(),
                output.status
            )));
        }
        // Older releases print the version banner on stderr.
        let banner = if output.stdout.is_empty() {
            &output.stderr
        } else {
            &output.stdout
        };
        let version = String::from_utf8_lossy(banner);
        log::info!(
            "Tesseract OCR is available: {}",
            version.lines().next().unwrap_or("unknown version")
        );
        Ok(Self { program })
    }
}

impl Recognizer for TesseractCli {
    fn recognize(&self, image: &RasterImage, options: &RecognitionOptions) -> Result<String, Error> {
        let png = if options.enhanced {
            image.grayscale().to_png()?
        } else {
            image.to_png()?
        };

        let mut child = Command::new(&self.program)
            .args(["stdin", "stdout", "-l", options.language.as_str(), "--psm"])
            .arg(options.page_segmentation.to_string())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| Error::Recognition(format!("cannot start {}: {e}", self.program.display())))?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| Error::Recognition("tesseract stdin unavailable".into()))?;
        let feeder = std::thread::spawn(move || stdin.write_all(&png));

        let output = child
            .wait_with_output()
            .map_err(|e| Error::Recognition(format!("tesseract did not finish: {e}")))?;
        if !output.status.success() {
            return Err(Error::Recognition(format!(
                "tesseract exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        match feeder.join() {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                return Err(Error::Recognition(format!("cannot feed image to tesseract: {e}")));
            }
            Err(_) => return Err(Error::Recognition("image feeder thread panicked".into())),
        }

        let text = String::from_utf8_lossy(&output.stdout).trim().to_string();
        log_recognized(&text);
        Ok(text)
    }
}
