use crate::scanner::camera::Frame;
use async_trait::async_trait;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

/// Payload and location of a code found in one frame
#[derive(Clone, Debug, PartialEq)]
pub struct Decoded {
    pub data: String,
    /// Top-left, top-right, bottom-right, bottom-left
    pub corners: [Point; 4],
}

/// One successful decode as seen by the host page
#[derive(Clone, Debug, PartialEq)]
pub struct ScanResult {
    pub data: String,
    /// Nanoseconds since the Unix epoch
    pub timestamp: i64,
    pub corners: [Point; 4],
}

impl ScanResult {
    pub fn from_decoded(decoded: Decoded, timestamp: i64) -> Self {
        Self {
            data: decoded.data,
            timestamp,
            corners: decoded.corners,
        }
    }
}

/// Finds a machine-readable code in a frame.
///
/// `None` means nothing was recognised in this frame; the scanner simply
/// tries again on the next tick.
#[async_trait]
pub trait FrameDecoder: Send + Sync {
    async fn decode(&self, frame: Frame) -> Option<Decoded>;
}
