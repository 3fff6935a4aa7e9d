use crate::core::error::ScannerError;
use async_trait::async_trait;

/// Which physical camera to open
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FacingMode {
    /// Rear camera
    Environment,
    /// Front camera
    User,
}

impl FacingMode {
    pub fn opposite(self) -> Self {
        match self {
            FacingMode::Environment => FacingMode::User,
            FacingMode::User => FacingMode::Environment,
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "environment" | "back" => Some(FacingMode::Environment),
            "user" | "front" => Some(FacingMode::User),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FacingMode::Environment => "environment",
            FacingMode::User => "user",
        }
    }
}

/// A grayscale snapshot of the video stream
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    /// Row-major luma, `width * height` bytes
    pub luma: Vec<u8>,
}

impl Frame {
    pub fn new(width: u32, height: u32, luma: Vec<u8>) -> Self {
        Self { width, height, luma }
    }
}

/// The video input device. Only one stream may be open at a time.
#[async_trait]
pub trait Camera: Send + Sync {
    /// Whether this host can capture video at all
    fn is_supported(&self) -> bool;

    async fn open(&self, facing: FacingMode) -> Result<Box<dyn VideoStream>, ScannerError>;
}

/// An open device stream
pub trait VideoStream: Send {
    fn facing_mode(&self) -> FacingMode;

    /// Most recent frame drawn from the stream, if one is available yet
    fn latest_frame(&self) -> Option<Frame>;

    /// Give the device back. Idempotent.
    fn release(&mut self);
}
