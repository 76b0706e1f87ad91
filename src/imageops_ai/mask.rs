use anyhow::{anyhow, ensure, Result};
use image::{GenericImageView, ImageBuffer, Luma, Pixel, Primitive, Rgba};
use num_traits::AsPrimitive;

use crate::imageops_ai::{get_max_value, is_floating_point};

/// Cuts `image` out with `mask`: each pixel keeps its color and gets
/// `min(source alpha, mask)` as alpha, with the mask rescaled from its
/// subpixel range to the image's.
pub fn apply<I, M, SI, SM>(image: &I, mask: &M) -> Result<ImageBuffer<Rgba<SI>, Vec<SI>>>
where
    I: GenericImageView<Pixel = Rgba<SI>>,
    M: GenericImageView<Pixel = Luma<SM>>,
    Rgba<SI>: Pixel<Subpixel = SI>,
    SI: Primitive + 'static + AsPrimitive<f32>,
    SM: Primitive + 'static + AsPrimitive<f32>,
    f32: AsPrimitive<SI>,
{
    ensure!(
        image.dimensions() == mask.dimensions(),
        "Image and mask dimensions do not match: image {:?}, mask {:?}",
        image.dimensions(),
        mask.dimensions()
    );

    let sm_max: f32 = get_max_value::<SM>().as_();
    let si_max: f32 = get_max_value::<SI>().as_();
    let round = !is_floating_point::<SI>();

    let processed_pixels = image
        .pixels()
        .zip(mask.pixels())
        .flat_map(|((_, _, Rgba([red, green, blue, alpha])), (_, _, Luma([m])))| {
            let scaled = m.as_() / sm_max * si_max;
            let scaled = if round { scaled.round() } else { scaled };
            let cap: f32 = alpha.as_();
            let alpha: SI = scaled.clamp(0.0, si_max).min(cap).as_();
            [red, green, blue, alpha]
        })
        .collect::<Vec<SI>>();

    ImageBuffer::from_raw(image.width(), image.height(), processed_pixels)
        .ok_or_else(|| anyhow!("Failed to create ImageBuffer from processed pixels"))
}
