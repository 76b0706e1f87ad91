use crate::errors::{IntensifierError, Result};
use crate::traits::{BackgroundRemover, ImageFetcher};
use image::{Rgba, RgbaImage};
use parking_lot::Mutex;
use reqwest::Url;

/// Fetcher double for tests.
///
/// Serves fixed bytes for every URL and records what was requested.
#[derive(Debug, Default)]
pub struct MockFetcher {
    body: Option<Vec<u8>>,
    requests: Mutex<Vec<Url>>,
}

impl MockFetcher {
    pub fn new(body: Vec<u8>) -> Self {
        Self {
            body: Some(body),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// A fetcher whose every request fails, like an unreachable host.
    pub fn failing() -> Self {
        Self::default()
    }

    pub fn requests(&self) -> Vec<Url> {
        self.requests.lock().clone()
    }
}

impl ImageFetcher for MockFetcher {
    fn fetch(&self, url: &Url) -> Result<Vec<u8>> {
        self.requests.lock().push(url.clone());
        self.body.clone().ok_or_else(|| IntensifierError::Fetch {
            url: url.to_string(),
            source: Box::new(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "mock fetcher has no body",
            )),
        })
    }
}

/// Background remover double for tests.
///
/// Treats every pixel of `key` color as background, chroma-key style.
#[derive(Debug)]
pub struct MockBackgroundRemover {
    pub key: Rgba<u8>,
    calls: Mutex<usize>,
}

impl MockBackgroundRemover {
    pub fn new(key: Rgba<u8>) -> Self {
        Self {
            key,
            calls: Mutex::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        *self.calls.lock()
    }
}

impl BackgroundRemover for MockBackgroundRemover {
    fn remove_background(&self, img: &RgbaImage) -> Result<RgbaImage> {
        *self.calls.lock() += 1;
        let mut out = img.clone();
        for pixel in out.pixels_mut() {
            if *pixel == self.key {
                pixel.0[3] = 0;
            }
        }
        Ok(out)
    }
}
