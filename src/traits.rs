use crate::errors::Result;
use image::RgbaImage;
use reqwest::Url;

/// Foreground segmentation: makes background pixels fully transparent.
///
/// The pipeline only depends on this abstraction, so the ONNX model can be
/// swapped for a mock in tests.
pub trait BackgroundRemover: Send + Sync {
    /// Returns a copy of `img` with the same dimensions whose background
    /// pixels have zero alpha.
    fn remove_background(&self, img: &RgbaImage) -> Result<RgbaImage>;
}

/// Fetches the raw bytes behind a URL.
pub trait ImageFetcher: Send + Sync {
    fn fetch(&self, url: &Url) -> Result<Vec<u8>>;
}

impl<T: BackgroundRemover + ?Sized> BackgroundRemover for &T {
    fn remove_background(&self, img: &RgbaImage) -> Result<RgbaImage> {
        (**self).remove_background(img)
    }
}

impl<T: ImageFetcher + ?Sized> ImageFetcher for &T {
    fn fetch(&self, url: &Url) -> Result<Vec<u8>> {
        (**self).fetch(url)
    }
}
