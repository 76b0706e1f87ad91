//! Frame shuffling and GIF / PNG output.

use std::io::Write;
use std::path::Path;

use gif::{DisposalMethod, Encoder, Frame, Repeat};
use image::{ImageFormat, RgbaImage};
use indicatif::ProgressBar;
use rand::seq::SliceRandom;
use rand::Rng;
use tracing::debug;

use crate::errors::{IntensifierError, Result};
use crate::offset::{Direction, ERASE_COLOR};

/// NeuQuant sample factor handed to the gif crate (1 = best, 30 = fastest).
const QUANTIZE_SPEED: i32 = 10;

/// What a frame shows: the untouched image or one of its offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameKind {
    Original,
    Offset(Direction),
}

/// The original plus its eight offsets, in display order.
#[derive(Debug, Clone)]
pub struct FrameSequence {
    frames: Vec<(FrameKind, RgbaImage)>,
}

impl FrameSequence {
    pub fn new(original: RgbaImage, variants: Vec<(Direction, RgbaImage)>) -> Self {
        let mut frames = Vec::with_capacity(variants.len() + 1);
        frames.push((FrameKind::Original, original));
        frames.extend(
            variants
                .into_iter()
                .map(|(direction, img)| (FrameKind::Offset(direction), img)),
        );
        Self { frames }
    }

    /// Uniform random permutation of the frames.
    pub fn shuffle<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.frames.shuffle(rng);
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn kinds(&self) -> Vec<FrameKind> {
        self.frames.iter().map(|(kind, _)| *kind).collect()
    }

    pub fn frames(&self) -> &[(FrameKind, RgbaImage)] {
        &self.frames
    }
}

/// GIF delays are in hundredths of a second; sub-centisecond remainders are dropped.
pub fn delay_centis(duration_ms: u32) -> u16 {
    (duration_ms / 10).min(u32::from(u16::MAX)) as u16
}

/// Writes the sequence as an infinitely looping GIF.
///
/// Every frame clears to background before the next one is drawn, so
/// transparent bands never show the previous frame.
pub fn encode_gif<W: Write>(
    sequence: &FrameSequence,
    duration_ms: u32,
    writer: W,
    progress: &ProgressBar,
) -> Result<()> {
    let Some((_, first)) = sequence.frames().first() else {
        return Err(IntensifierError::Encoding {
            operation: "gif encoding".to_string(),
            source: "no frames to encode".into(),
        });
    };
    let (width, height) = gif_dimensions(first)?;

    let mut encoder = Encoder::new(writer, width, height, &[])?;
    encoder.set_repeat(Repeat::Infinite)?;

    let delay = delay_centis(duration_ms);
    progress.set_length(sequence.len() as u64);
    for (kind, img) in sequence.frames() {
        if gif_dimensions(img)? != (width, height) {
            return Err(IntensifierError::Encoding {
                operation: "gif encoding".to_string(),
                source: format!("{kind:?} frame size differs from the first frame").into(),
            });
        }
        let mut pixels = canonical_transparency(img).into_raw();
        let mut frame = Frame::from_rgba_speed(width, height, &mut pixels, QUANTIZE_SPEED);
        frame.delay = delay;
        frame.dispose = DisposalMethod::Background;
        encoder.write_frame(&frame)?;
        debug!(?kind, "frame encoded");
        progress.inc(1);
    }
    progress.finish();

    Ok(())
}

/// Encodes to memory first so a failure never leaves a half-written file.
#[tracing::instrument(skip(sequence, progress))]
pub fn save_gif(
    sequence: &FrameSequence,
    duration_ms: u32,
    path: &Path,
    progress: &ProgressBar,
) -> Result<()> {
    let mut buffer = Vec::new();
    encode_gif(sequence, duration_ms, &mut buffer, progress)?;
    std::fs::write(path, buffer).map_err(|e| IntensifierError::FileSystem {
        path: path.to_path_buf(),
        operation: "write gif".to_string(),
        source: e,
    })
}

/// Writes a single still PNG.
#[tracing::instrument(skip(img))]
pub fn save_still(img: &RgbaImage, path: &Path) -> Result<()> {
    img.save_with_format(path, ImageFormat::Png)
        .map_err(|e| IntensifierError::ImageProcessing {
            path: path.display().to_string(),
            operation: "png save".to_string(),
            source: Box::new(e),
        })
}

fn gif_dimensions(img: &RgbaImage) -> Result<(u16, u16)> {
    let (width, height) = img.dimensions();
    match (u16::try_from(width), u16::try_from(height)) {
        (Ok(w), Ok(h)) => Ok((w, h)),
        _ => Err(IntensifierError::Encoding {
            operation: "gif encoding".to_string(),
            source: format!("{width}x{height} exceeds the GIF size limit of 65535").into(),
        }),
    }
}

/// GIF has one transparent palette entry, so every alpha-0 pixel must share
/// the same color to land on it.
fn canonical_transparency(img: &RgbaImage) -> RgbaImage {
    let mut out = img.clone();
    for pixel in out.pixels_mut() {
        if pixel[3] == 0 {
            *pixel = ERASE_COLOR;
        }
    }
    out
}
