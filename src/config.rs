use clap::Parser;
use reqwest::Url;
use std::path::PathBuf;
use tracing::warn;

use crate::errors::{IntensifierError, Result};

pub const DEFAULT_OFFSET_SCALE: f64 = 0.08;
pub const DEFAULT_DURATION_MS: u32 = 30;

#[derive(Parser, Clone, Debug)]
#[command(version, about, long_about = None)]
pub struct Config {
    /// URL of the source image
    #[arg(short, long)]
    pub url: Option<String>,

    /// Path to a local source image
    #[arg(short, long)]
    pub path: Option<PathBuf>,

    /// Where to write the GIF (or the PNG with --only-png)
    #[arg(short, long)]
    pub output: PathBuf,

    /// Fraction of the image width/height used as shake distance, in (0, 1)
    #[arg(long, default_value_t = DEFAULT_OFFSET_SCALE)]
    pub offset_scale: f64,

    /// Display time of each frame in milliseconds
    #[arg(long, default_value_t = DEFAULT_DURATION_MS)]
    pub duration: u32,

    /// Remove the background with a segmentation model first
    #[arg(long)]
    pub remove_bg: bool,

    /// Only write the (background-removed) still image as PNG
    #[arg(long)]
    pub only_png: bool,

    /// ONNX segmentation model used by --remove-bg
    #[arg(short, long)]
    pub model_path: Option<PathBuf>,

    #[arg(short, long, default_value_t = 0)]
    pub device_id: i32,

    /// Hide the progress bar
    #[arg(short, long)]
    pub quiet: bool,
}

/// Where the source image comes from, resolved from the `-u` / `-p` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    Url(Url),
    Path(PathBuf),
}

impl Config {
    pub fn new() -> Self {
        Self::parse()
    }

    /// A config writing to `output` with every option at its default and no source.
    pub fn with_defaults(output: impl Into<PathBuf>) -> Self {
        Self {
            url: None,
            path: None,
            output: output.into(),
            offset_scale: DEFAULT_OFFSET_SCALE,
            duration: DEFAULT_DURATION_MS,
            remove_bg: false,
            only_png: false,
            model_path: None,
            device_id: 0,
            quiet: true,
        }
    }

    /// Checks every option and resolves the image source.
    ///
    /// Numeric ranges are checked before the source so a bad scale is
    /// reported even when the source is also wrong.
    pub fn validate(&self) -> Result<ImageSource> {
        if !(self.offset_scale > 0.0 && self.offset_scale < 1.0) {
            return Err(IntensifierError::configuration(format!(
                "offset scale must be between 0 and 1 (exclusive), got {}",
                self.offset_scale
            )));
        }
        if self.duration == 0 {
            return Err(IntensifierError::configuration(
                "duration must be greater than 0 ms",
            ));
        }
        if self.remove_bg {
            let model_path = self.model_path.as_ref().ok_or_else(|| {
                IntensifierError::configuration("--remove-bg requires --model-path")
            })?;
            if !model_path.is_file() {
                return Err(IntensifierError::validation(
                    "model_path",
                    format!("{} is not an existing file", model_path.display()),
                ));
            }
        }

        match (&self.url, &self.path) {
            (None, None) => Err(IntensifierError::configuration(
                "URL or path must be provided",
            )),
            (Some(url), Some(path)) => {
                warn!(path = %path.display(), "both URL and path given; using the URL");
                check_url(url).map(ImageSource::Url)
            }
            (Some(url), None) => check_url(url).map(ImageSource::Url),
            (None, Some(path)) => {
                if path.is_file() {
                    Ok(ImageSource::Path(path.clone()))
                } else {
                    Err(IntensifierError::validation(
                        "path",
                        format!("{} is an invalid filepath", path.display()),
                    ))
                }
            }
        }
    }
}

fn check_url(s: &str) -> Result<Url> {
    let invalid = || IntensifierError::validation("url", format!("{s} is an invalid url"));
    let url = Url::parse(s).map_err(|_| invalid())?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return Err(invalid());
    }
    Ok(url)
}
