use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use rayon::prelude::*;

use docxide_ocr::{
    ConversionOutcome, ConvertConfig, DEFAULT_PREFIX, DEFAULT_SUFFIX, Error, MinImageSize,
    Placement, RecognitionOptions, Recognizer, TextMarkers,
};

/// Convert images in Word documents to text using OCR
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// Input .docx file, or a directory of .docx files
    input: PathBuf,

    /// Output file (default: <input>_processed.docx) or, for a directory
    /// input, output directory (default: <input>/processed)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Where to place extracted text: below the image or replacing it
    #[arg(short, long, default_value = "below", value_parser = ["below", "replace"])]
    placement: String,

    /// OCR language code (e.g. eng, fra, deu)
    #[arg(short, long, default_value = "eng")]
    lang: String,

    /// Run OCR on a grayscale copy of each image
    #[arg(short, long)]
    enhanced: bool,

    /// Tesseract page segmentation mode
    #[arg(long, default_value_t = 3)]
    psm: u8,

    /// Marker inserted before extracted text (empty to omit)
    #[arg(long, default_value = DEFAULT_PREFIX)]
    prefix: String,

    /// Marker inserted after extracted text (empty to omit)
    #[arg(long, default_value = DEFAULT_SUFFIX)]
    suffix: String,

    /// Images narrower than this are not processed
    #[arg(long, default_value_t = 50)]
    min_width: u32,

    /// Images shorter than this are not processed
    #[arg(long, default_value_t = 50)]
    min_height: u32,

    /// OCR worker threads per document
    #[arg(short = 'j', long, default_value_t = 1)]
    workers: usize,

    /// Do not write output when no text was inserted
    #[arg(long)]
    skip_unchanged: bool,

    /// Directory holding Tesseract language data (default: the system tessdata)
    #[arg(long)]
    tessdata: Option<String>,

    /// Path to the tesseract executable, used only by builds without the
    /// `tesseract` feature
    #[arg(long, default_value = "tesseract")]
    tesseract: PathBuf,

    /// Logging level (RUST_LOG overrides)
    #[arg(long, default_value = "info", value_parser = ["debug", "info", "warn", "error"])]
    log_level: String,
}

impl Cli {
    fn config(&self) -> Result<ConvertConfig, String> {
        Ok(ConvertConfig {
            placement: self.placement.parse::<Placement>()?,
            markers: TextMarkers {
                prefix: self.prefix.clone(),
                suffix: self.suffix.clone(),
            },
            min_size: MinImageSize {
                width: self.min_width,
                height: self.min_height,
            },
            recognition: RecognitionOptions {
                language: self.lang.clone(),
                enhanced: self.enhanced,
                page_segmentation: self.psm,
            },
            workers: self.workers.max(1),
            write_unchanged: !self.skip_unchanged,
            ..ConvertConfig::default()
        })
    }
}

#[cfg(feature = "tesseract")]
fn engine(cli: &Cli) -> Result<Box<dyn Recognizer>, Error> {
    let engine = docxide_ocr::Tesseract::with_data_path(cli.tessdata.clone(), &cli.lang)?;
    Ok(Box::new(engine))
}

#[cfg(not(feature = "tesseract"))]
fn engine(cli: &Cli) -> Result<Box<dyn Recognizer>, Error> {
    if cli.tessdata.is_some() {
        log::warn!("--tessdata needs the `tesseract` feature; ignored by the tesseract executable fallback");
    }
    Ok(Box::new(docxide_ocr::TesseractCli::with_program(&cli.tesseract)?))
}

fn default_output(input: &Path) -> PathBuf {
    let stem = input.file_stem().and_then(|s| s.to_str()).unwrap_or("document");
    input.with_file_name(format!("{stem}_processed.docx"))
}

fn is_docx(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("docx"))
}

/// Returns true only when output was written.
fn process_file(input: &Path, output: &Path, ocr: &dyn Recognizer, config: &ConvertConfig) -> bool {
    if !is_docx(input) {
        log::error!("Input file must be a .docx file: {}", input.display());
        return false;
    }
    log::info!("Output will be saved to: {}", output.display());
    match docxide_ocr::convert_docx(input, output, ocr, config) {
        Ok(ConversionOutcome::Converted(report)) => {
            log::info!("{}", "=".repeat(60));
            log::info!("Processing completed successfully!");
            log::info!("Output saved to: {}", output.display());
            log::info!("Total images processed: {}", report.images_processed);
            log::info!("{}", "=".repeat(60));
            true
        }
        Ok(outcome) => {
            log::warn!("{}: {}", input.display(), outcome.status());
            false
        }
        Err(e) => {
            log::error!("Error processing document {}: {e}", input.display());
            false
        }
    }
}

fn process_directory(
    dir: &Path,
    output_dir: Option<&Path>,
    ocr: &dyn Recognizer,
    config: &ConvertConfig,
) -> std::io::Result<bool> {
    let mut inputs: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file() && is_docx(p))
        .filter(|p| {
            !p.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with('~'))
        })
        .collect();
    inputs.sort();

    if inputs.is_empty() {
        log::warn!("No .docx files found in {}", dir.display());
        return Ok(false);
    }
    log::info!("Found {} documents to process", inputs.len());

    let out_dir = output_dir
        .map(Path::to_path_buf)
        .unwrap_or_else(|| dir.join("processed"));
    std::fs::create_dir_all(&out_dir)?;

    let failed: Vec<String> = inputs
        .par_iter()
        .filter_map(|input| {
            let stem = input.file_stem().and_then(|s| s.to_str()).unwrap_or("document");
            let output = out_dir.join(format!("{stem}_processed.docx"));
            (!process_file(input, &output, ocr, config))
                .then(|| input.file_name().unwrap_or_default().to_string_lossy().into_owned())
        })
        .collect();

    log::info!("{}", "=".repeat(60));
    log::info!("Batch Processing Summary");
    log::info!("Total files: {}", inputs.len());
    log::info!("Successfully processed: {}", inputs.len() - failed.len());
    log::info!("Failed: {}", failed.len());
    if !failed.is_empty() {
        log::warn!("Failed files: {}", failed.join(", "));
    }
    log::info!("Output directory: {}", out_dir.display());
    log::info!("{}", "=".repeat(60));

    Ok(failed.is_empty())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&cli.log_level))
        .init();

    let config = match cli.config() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };

    if !cli.input.exists() {
        log::error!("Input not found: {}", cli.input.display());
        return ExitCode::FAILURE;
    }

    let ocr = match engine(&cli) {
        Ok(ocr) => ocr,
        Err(e) => {
            log::error!("{e}");
            return ExitCode::FAILURE;
        }
    };

    let ok = if cli.input.is_dir() {
        match process_directory(&cli.input, cli.output.as_deref(), ocr.as_ref(), &config) {
            Ok(ok) => ok,
            Err(e) => {
                log::error!("Cannot process directory {}: {e}", cli.input.display());
                false
            }
        }
    } else {
        let output = cli.output.clone().unwrap_or_else(|| default_output(&cli.input));
        process_file(&cli.input, &output, ocr.as_ref(), &config)
    };

    if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE }
}
