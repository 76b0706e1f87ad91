use image::{imageops, GenericImageView, ImageBuffer, Pixel, Primitive};

/// Offset that centers a `width x height` image on a `pad_width x pad_height`
/// canvas, or `None` if it does not fit.
pub fn center_offset(width: u32, height: u32, pad_width: u32, pad_height: u32) -> Option<(u32, u32)> {
    if width > pad_width || height > pad_height {
        return None;
    }
    Some(((pad_width - width) / 2, (pad_height - height) / 2))
}

/// Centers `image` on a square canvas filled with `color`.
///
/// Returns the canvas and where the image's top-left corner landed.
pub fn square<I, P, S>(image: &I, color: P) -> (ImageBuffer<P, Vec<S>>, (u32, u32))
where
    I: GenericImageView<Pixel = P>,
    P: Pixel<Subpixel = S>,
    S: Primitive,
{
    let (width, height) = image.dimensions();
    let side = width.max(height);
    // a square of the longer side always fits
    let (x, y) = center_offset(width, height, side, side).unwrap_or((0, 0));

    let mut canvas = ImageBuffer::from_pixel(side, side, color);
    imageops::overlay(&mut canvas, image, i64::from(x), i64::from(y));
    (canvas, (x, y))
}
