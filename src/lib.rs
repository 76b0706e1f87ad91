pub mod animation;
pub mod config;
pub mod errors;
pub mod fetch;
pub mod imageops_ai;
pub mod model;
pub mod offset;
pub mod source;
pub mod traits;

pub mod mocks;

use std::path::PathBuf;

use image::RgbaImage;
use indicatif::ProgressBar;
use rand::Rng;
use tracing::info;

pub use animation::{FrameKind, FrameSequence};
pub use config::{Config, ImageSource};
pub use errors::{IntensifierError, Result};
pub use fetch::HttpFetcher;
pub use model::Model;
pub use offset::{Direction, OffsetMagnitude};
pub use traits::*;

/// What the pipeline wrote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Artifact {
    Still { path: PathBuf },
    Animation { path: PathBuf, frames: Vec<FrameKind> },
}

/// Acquire, optionally cut out, then either save the still or shake it into a GIF.
pub struct Intensifier<F: ImageFetcher, R: BackgroundRemover> {
    fetcher: F,
    remover: Option<R>,
    config: Config,
    progress: ProgressBar,
}

impl<F: ImageFetcher, R: BackgroundRemover> Intensifier<F, R> {
    /// `remover` is only consulted when `config.remove_bg` is set.
    pub fn new(fetcher: F, remover: Option<R>, config: Config) -> Self {
        Self {
            fetcher,
            remover,
            config,
            progress: ProgressBar::hidden(),
        }
    }

    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = progress;
        self
    }

    pub fn run<G: Rng + ?Sized>(&self, rng: &mut G) -> Result<Artifact> {
        let source = self.config.validate()?;
        let image = source::acquire(&source, &self.fetcher)?;
        let image = self.remove_background(image)?;
        let output = &self.config.output;

        if self.config.only_png {
            animation::save_still(&image, output)?;
            info!(path = %output.display(), "still image written");
            return Ok(Artifact::Still {
                path: output.clone(),
            });
        }

        let sequence = self.build_sequence(image, rng);
        animation::save_gif(&sequence, self.config.duration, output, &self.progress)?;
        info!(path = %output.display(), frames = sequence.len(), "animation written");

        Ok(Artifact::Animation {
            path: output.clone(),
            frames: sequence.kinds(),
        })
    }

    /// The original plus its eight offsets, already shuffled.
    pub fn build_sequence<G: Rng + ?Sized>(&self, image: RgbaImage, rng: &mut G) -> FrameSequence {
        let (width, height) = image.dimensions();
        let magnitude = OffsetMagnitude::from_scale(width, height, self.config.offset_scale);
        info!(dx = magnitude.dx, dy = magnitude.dy, "generating offsets");

        let variants = offset::generate_variants(&image, magnitude);
        let mut sequence = FrameSequence::new(image, variants);
        sequence.shuffle(rng);
        sequence
    }

    fn remove_background(&self, image: RgbaImage) -> Result<RgbaImage> {
        if !self.config.remove_bg {
            return Ok(image);
        }
        let remover = self.remover.as_ref().ok_or_else(|| {
            IntensifierError::configuration("background removal requested without a model")
        })?;
        info!("removing background");
        remover.remove_background(&image)
    }
}
