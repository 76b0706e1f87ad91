use std::io::Write;
use std::path::Path;

use image::{ImageReader, RgbaImage};
use tempfile::NamedTempFile;
use tracing::info;

use crate::config::ImageSource;
use crate::errors::{IntensifierError, Result};
use crate::traits::ImageFetcher;

/// Loads the source image and normalizes it to RGBA.
///
/// Downloads are staged in a temporary file under the system temp directory
/// that is removed when this function returns, whether decoding worked or not.
pub fn acquire<F: ImageFetcher>(source: &ImageSource, fetcher: &F) -> Result<RgbaImage> {
    acquire_in(source, fetcher, &std::env::temp_dir())
}

/// [`acquire`] with downloads staged under `staging_dir`.
#[tracing::instrument(skip(fetcher))]
pub fn acquire_in<F: ImageFetcher>(
    source: &ImageSource,
    fetcher: &F,
    staging_dir: &Path,
) -> Result<RgbaImage> {
    match source {
        ImageSource::Url(url) => {
            info!("URL input");
            let bytes = fetcher.fetch(url)?;

            let mut temp =
                NamedTempFile::new_in(staging_dir).map_err(|e| IntensifierError::FileSystem {
                    path: staging_dir.to_path_buf(),
                    operation: "create temporary file".to_string(),
                    source: e,
                })?;
            temp.write_all(&bytes)
                .and_then(|()| temp.flush())
                .map_err(|e| IntensifierError::FileSystem {
                    path: temp.path().to_path_buf(),
                    operation: "write downloaded image".to_string(),
                    source: e,
                })?;

            decode(temp.path(), url.as_str())
        }
        ImageSource::Path(path) => {
            info!("Filepath input");
            decode(path, &path.display().to_string())
        }
    }
}

fn decode(path: &Path, label: &str) -> Result<RgbaImage> {
    let to_error = |operation: &str, e: Box<dyn std::error::Error + Send + Sync>| {
        IntensifierError::ImageProcessing {
            path: label.to_string(),
            operation: operation.to_string(),
            source: e,
        }
    };

    let reader = ImageReader::open(path)
        .map_err(|e| IntensifierError::FileSystem {
            path: path.to_path_buf(),
            operation: "open image".to_string(),
            source: e,
        })?
        .with_guessed_format()
        .map_err(|e| to_error("format detection", Box::new(e)))?;

    let image = reader
        .decode()
        .map_err(|e| to_error("image decoding", Box::new(e)))?;

    Ok(image.into_rgba8())
}
