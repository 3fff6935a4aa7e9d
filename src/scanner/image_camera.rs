use crate::core::error::ScannerError;
use crate::scanner::camera::{Camera, FacingMode, Frame, VideoStream};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::debug;

/// A camera whose only picture is an image file on disk.
///
/// Lets the scan loop run against photos of session codes on hosts with no
/// video device. The facing mode is recorded but has no effect.
#[derive(Clone, Debug)]
pub struct ImageFileCamera {
    path: PathBuf,
}

impl ImageFileCamera {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Load any supported image as a greyscale frame
pub fn load_frame(path: &Path) -> Result<Frame, ScannerError> {
    let image = image::open(path)
        .map_err(|e| ScannerError::Device(format!("{}: {}", path.display(), e)))?
        .to_luma8();
    let (width, height) = image.dimensions();
    Ok(Frame::new(width, height, image.into_raw()))
}

#[cfg(test)]
pub(crate) fn write_png(dir: &Path, name: &str, frame: &Frame) -> PathBuf {
    let path = dir.join(name);
    image::GrayImage::from_raw(frame.width, frame.height, frame.luma.clone())
        .unwrap()
        .save(&path)
        .unwrap();
    path
}

#[async_trait]
impl Camera for ImageFileCamera {
    fn is_supported(&self) -> bool {
        true
    }

    async fn open(&self, facing: FacingMode) -> Result<Box<dyn VideoStream>, ScannerError> {
        let path = self.path.clone();
        let frame = tokio::task::spawn_blocking(move || load_frame(&path))
            .await
            .map_err(|e| ScannerError::Device(e.to_string()))??;

        debug!(
            path = %self.path.display(),
            width = frame.width,
            height = frame.height,
            "Image loaded as camera frame"
        );
        Ok(Box::new(StillStream {
            facing,
            frame: Some(frame),
        }))
    }
}

/// Serves the same frame on every tick until released
struct StillStream {
    facing: FacingMode,
    frame: Option<Frame>,
}

impl VideoStream for StillStream {
    fn facing_mode(&self) -> FacingMode {
        self.facing
    }

    fn latest_frame(&self) -> Option<Frame> {
        self.frame.clone()
    }

    fn release(&mut self) {
        self.frame = None;
    }
}
