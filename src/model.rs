use std::{ops::Div, path::Path};

use crate::{
    errors::{IntensifierError, Result},
    imageops_ai::{mask, padding},
    traits::BackgroundRemover,
};
use image::{
    buffer::ConvertBuffer, imageops, imageops::FilterType, GenericImageView, ImageBuffer, Luma,
    Pixel, Primitive, Rgb, RgbImage, RgbaImage,
};
use ndarray::prelude::*;
use nshare::AsNdarray3;
use ort::value::TensorRef;
use ort::{
    execution_providers::{CUDAExecutionProvider, TensorRTExecutionProvider},
    session::{builder::SessionBuilder, Session},
};
use parking_lot::Mutex;
use tracing::info;

/// ONNX foreground segmentation model used to cut out the background.
///
/// Expects a single NCHW float input of square size and a single
/// 1-channel mask output in `[0, 1]`.
pub struct Model {
    pub image_size: u32,
    input_name: String,
    output_name: String,
    session: Mutex<Session>,
}

fn model_error(operation: impl Into<String>) -> impl FnOnce(ort::Error) -> IntensifierError {
    let operation = operation.into();
    move |e| IntensifierError::Model {
        operation,
        source: Box::new(e),
    }
}

impl Model {
    #[tracing::instrument]
    pub fn new(model_path: &Path, device_id: i32) -> Result<Self> {
        let mut session = SessionBuilder::new()
            .map_err(model_error("session builder setup"))?
            .with_execution_providers([
                TensorRTExecutionProvider::default()
                    .with_device_id(device_id)
                    .build(),
                CUDAExecutionProvider::default()
                    .with_device_id(device_id)
                    .build(),
            ])
            .map_err(model_error("execution provider setup"))?
            .with_memory_pattern(true)
            .map_err(model_error("memory pattern setup"))?
            .commit_from_file(model_path)
            .map_err(model_error(format!(
                "model load: {}",
                model_path.display()
            )))?;

        let shape_error = || IntensifierError::Model {
            operation: "model input shape lookup".to_string(),
            source: Box::new(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                "model has no usable input/output tensor shape",
            )),
        };
        let input = session.inputs.first().ok_or_else(shape_error)?;
        let input_name = input.name.clone();
        let image_size = input
            .input_type
            .tensor_shape()
            .and_then(|shape| shape.get(2).copied())
            .filter(|&size| size > 0)
            .ok_or_else(shape_error)? as u32;
        let output_name = session
            .outputs
            .first()
            .map(|output| output.name.clone())
            .ok_or_else(shape_error)?;

        // warm up
        let data = Array4::<f32>::zeros((1, 3, image_size as usize, image_size as usize));
        session
            .run(ort::inputs![input_name.as_str() => TensorRef::from_array_view(&data).map_err(model_error("warm-up tensor creation"))?])
            .map_err(model_error("warm-up run"))?;

        info!(image_size, %input_name, %output_name, "segmentation model loaded");

        Ok(Self {
            image_size,
            input_name,
            output_name,
            session: Mutex::new(session),
        })
    }

    pub fn predict(&self, tensor: ArrayView4<f32>) -> Result<Array4<f32>> {
        let mut binding = self.session.lock();
        let outputs = binding.run(ort::inputs![
            self.input_name.as_str() => TensorRef::from_array_view(&tensor.as_standard_layout())?
        ])?;
        Ok(outputs[self.output_name.as_str()]
            .try_extract_array::<f32>()?
            .into_dimensionality::<Ix4>()?
            .to_owned())
    }
}

impl BackgroundRemover for Model {
    #[tracing::instrument(skip_all, fields(width = img.width(), height = img.height()))]
    fn remove_background(&self, img: &RgbaImage) -> Result<RgbaImage> {
        let rgb_img: RgbImage = img.convert();
        let (tensor, crop) = preprocess(&rgb_img, self.image_size)?;
        let prediction = self.predict(tensor.view())?;
        let (width, height) = img.dimensions();

        let processed_mask = postprocess_mask(prediction, self.image_size, crop, width, height)?;

        mask::apply(img, &processed_mask).map_err(|e| {
            IntensifierError::ImageProcessing {
                path: "unknown".to_string(),
                operation: "mask application".to_string(),
                source: e.into(),
            }
        })
    }
}

/// Size of a `width x height` image scaled so its longer side is `side`.
pub fn fit_within(width: u32, height: u32, side: u32) -> (u32, u32) {
    let scale = |short: u32, long: u32| {
        ((f64::from(short) * f64::from(side) / f64::from(long)).round() as u32).clamp(1, side)
    };
    if width >= height {
        (side, scale(height, width.max(1)))
    } else {
        (scale(width, height), side)
    }
}

/// Scales the long side to `image_size`, pads to a centered square and
/// returns the NCHW tensor plus the `[x, y, w, h]` box the image occupies.
pub fn preprocess<S>(
    image: &ImageBuffer<Rgb<S>, Vec<S>>,
    image_size: u32,
) -> Result<(Array4<f32>, [u32; 4])>
where
    Rgb<S>: Pixel<Subpixel = S>,
    S: Into<f32> + Primitive + 'static,
{
    let (w, h) = fit_within(image.width(), image.height(), image_size);
    let image = imageops::resize(image, w, h, FilterType::Lanczos3);
    let zero = S::zero();
    let (image, (x, y)) = padding::square(&image, Rgb([zero, zero, zero]));

    let tensor = image.as_ndarray3().slice_move(s![NewAxis, ..;-1, .., ..]);
    let max = S::DEFAULT_MAX_VALUE.into();
    let tensor = if max == (<f32 as Primitive>::DEFAULT_MAX_VALUE) {
        tensor.map(|v| (*v).into())
    } else {
        tensor.map(|v| <S as Into<f32>>::into(*v).div(max))
    };

    Ok((tensor, [x, y, w, h]))
}

/// Crops the padding off a predicted mask and scales it back to the source size.
pub fn postprocess_mask(
    prediction: Array4<f32>,
    image_size: u32,
    crop: [u32; 4],
    width: u32,
    height: u32,
) -> Result<ImageBuffer<Luma<f32>, Vec<f32>>> {
    let [x, y, w, h] = crop;
    let (raw, _) = prediction.as_standard_layout().to_owned().into_raw_vec_and_offset();
    let mask: ImageBuffer<Luma<f32>, Vec<f32>> = ImageBuffer::from_raw(image_size, image_size, raw)
        .ok_or_else(|| IntensifierError::Model {
            operation: "mask reshape".to_string(),
            source: format!("mask output is not {image_size}x{image_size}").into(),
        })?;
    let mask = mask.view(x, y, w, h).to_image();
    let mut mask = imageops::resize(&mask, width, height, FilterType::Lanczos3);
    for Luma([alpha]) in mask.pixels_mut() {
        *alpha = alpha.clamp(0.0, 1.0);
    }
    Ok(mask)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fit_within_keeps_aspect() {
        assert_eq!(fit_within(30, 20, 16), (16, 11));
        assert_eq!(fit_within(20, 30, 16), (11, 16));
        assert_eq!(fit_within(8, 8, 16), (16, 16));
        assert_eq!(fit_within(1000, 1, 16), (16, 1));
    }

    #[test]
    fn test_preprocess_pads_short_side() -> Result<()> {
        let img = RgbImage::from_pixel(30, 20, Rgb([255, 255, 255]));
        let (tensor, crop) = preprocess(&img, 16)?;
        assert_eq!(tensor.shape(), &[1, 3, 16, 16]);
        assert_eq!(crop, [0, 2, 16, 11]);
        assert!(tensor.iter().all(|v| (0.0..=1.0).contains(v)));

        // padding rows are black, image rows are white
        assert_eq!(tensor[[0, 0, 0, 8]], 0.0);
        assert_eq!(tensor[[0, 0, 15, 8]], 0.0);
        assert_eq!(tensor[[0, 1, 7, 8]], 1.0);
        Ok(())
    }

    #[test]
    fn test_postprocess_mask_drops_padding() -> Result<()> {
        // rows 0..2 and 13..16 are padding predicted as foreground
        let mut prediction = Array4::<f32>::ones((1, 1, 16, 16));
        prediction.slice_mut(s![0, 0, 2..13, ..]).fill(0.0);

        let mask = postprocess_mask(prediction, 16, [0, 2, 16, 11], 30, 20)?;
        assert_eq!(mask.dimensions(), (30, 20));
        assert!(mask.pixels().all(|Luma([a])| *a == 0.0));
        Ok(())
    }

    #[test]
    fn test_postprocess_mask_resizes_and_clamps() -> Result<()> {
        let mut prediction = Array4::<f32>::zeros((1, 1, 8, 8));
        prediction.slice_mut(s![0, 0, .., 4..]).fill(1.5);

        let mask = postprocess_mask(prediction, 8, [0, 0, 8, 8], 16, 4)?;
        assert_eq!(mask.dimensions(), (16, 4));
        assert!(mask.pixels().all(|Luma([a])| (0.0..=1.0).contains(a)));
        assert_eq!(mask.get_pixel(15, 0)[0], 1.0);
        Ok(())
    }

    #[test]
    fn test_postprocess_mask_rejects_wrong_size() {
        let prediction = Array4::<f32>::zeros((1, 1, 4, 4));
        assert!(postprocess_mask(prediction, 8, [0, 0, 8, 8], 8, 8).is_err());
    }
}
