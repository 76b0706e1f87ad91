//! Directional offset variants of a frame.
//!
//! Each variant is a cyclic shift of the source whose wrapped-in edge bands
//! are erased to transparent, so the picture looks nudged off-center.

use image::{Rgba, RgbaImage};
use tracing::warn;

use crate::imageops_ai::shift::{CyclicShift, FillRect};

/// Fill used for the wrapped-in bands.
pub const ERASE_COLOR: Rgba<u8> = Rgba([255, 255, 255, 0]);

/// Translation distance in pixels along each axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OffsetMagnitude {
    pub dx: u32,
    pub dy: u32,
}

impl OffsetMagnitude {
    /// `floor(width * scale)`, `floor(height * scale)`.
    pub fn from_scale(width: u32, height: u32, scale: f64) -> Self {
        let dx = (f64::from(width) * scale).floor() as u32;
        let dy = (f64::from(height) * scale).floor() as u32;
        if dx == 0 || dy == 0 {
            warn!(dx, dy, "offset rounds down to zero; the shake will be invisible on that axis");
        }
        Self { dx, dy }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    RightDown,
    Up,
    LeftUp,
    Down,
    RightUp,
    Right,
    LeftDown,
    Left,
}

/// Edge band wiped after shifting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strip {
    Left,
    Right,
    Top,
    Bottom,
}

impl Direction {
    pub const ALL: [Direction; 8] = [
        Direction::RightDown,
        Direction::Up,
        Direction::LeftUp,
        Direction::Down,
        Direction::RightUp,
        Direction::Right,
        Direction::LeftDown,
        Direction::Left,
    ];

    /// Signed translation for this direction.
    ///
    /// `Down` shares `Up`'s vector (content moves up). This is the observed
    /// behavior of the tool and is kept so existing output stays the same.
    pub fn translation(self, m: OffsetMagnitude) -> (i64, i64) {
        let (dx, dy) = (i64::from(m.dx), i64::from(m.dy));
        match self {
            Direction::RightDown => (dx, dy),
            Direction::Up | Direction::Down => (0, -dy),
            Direction::LeftUp => (-dx, -dy),
            Direction::RightUp => (dx, -dy),
            Direction::Right => (dx, 0),
            Direction::LeftDown => (-dx, dy),
            Direction::Left => (-dx, 0),
        }
    }

    pub fn erased_strips(self) -> &'static [Strip] {
        match self {
            Direction::RightDown => &[Strip::Left, Strip::Top],
            Direction::Up | Direction::Down => &[Strip::Bottom],
            Direction::LeftUp => &[Strip::Right, Strip::Bottom],
            Direction::RightUp => &[Strip::Left, Strip::Bottom],
            Direction::Right => &[Strip::Left],
            Direction::LeftDown => &[Strip::Right, Strip::Top],
            Direction::Left => &[Strip::Right],
        }
    }
}

impl Strip {
    /// Half-open box `[x0, y0, x1, y1)` covered by this strip.
    pub fn bounds(self, width: u32, height: u32, m: OffsetMagnitude) -> [u32; 4] {
        let dx = m.dx.min(width);
        let dy = m.dy.min(height);
        match self {
            Strip::Left => [0, 0, dx, height],
            Strip::Right => [width - dx, 0, width, height],
            Strip::Top => [0, 0, width, dy],
            Strip::Bottom => [0, height - dy, width, height],
        }
    }
}

/// One shifted copy of `img` with its wrapped edge erased.
pub fn offset_variant(img: &RgbaImage, direction: Direction, m: OffsetMagnitude) -> RgbaImage {
    let (tx, ty) = direction.translation(m);
    let mut variant = img.cyclic_shift(tx, ty);
    let (width, height) = img.dimensions();
    for strip in direction.erased_strips() {
        let [x0, y0, x1, y1] = strip.bounds(width, height, m);
        variant.fill_rect(x0, y0, x1, y1, ERASE_COLOR);
    }
    variant
}

/// All eight variants, in `Direction::ALL` order.
#[tracing::instrument(skip(img), fields(width = img.width(), height = img.height()))]
pub fn generate_variants(img: &RgbaImage, m: OffsetMagnitude) -> Vec<(Direction, RgbaImage)> {
    Direction::ALL
        .iter()
        .map(|&direction| (direction, offset_variant(img, direction, m)))
        .collect()
}
