use crate::scanner::camera::Frame;
use crate::scanner::decoder::{Decoded, FrameDecoder, Point};
use async_trait::async_trait;
use rqrr::PreparedImage;
use tracing::{trace, warn};

/// QR decoder over greyscale frames, backed by `rqrr`
#[derive(Clone, Copy, Debug, Default)]
pub struct QrDecoder;

#[async_trait]
impl FrameDecoder for QrDecoder {
    async fn decode(&self, frame: Frame) -> Option<Decoded> {
        // Grid detection is CPU bound
        match tokio::task::spawn_blocking(move || decode_frame(&frame)).await {
            Ok(decoded) => decoded,
            Err(e) => {
                warn!(error = %e, "Decode task failed");
                None
            }
        }
    }
}

/// First readable QR code in `frame`, if any
pub fn decode_frame(frame: &Frame) -> Option<Decoded> {
    let (width, height) = (frame.width as usize, frame.height as usize);
    if width == 0 || height == 0 || frame.luma.len() < width * height {
        return None;
    }

    let mut prepared =
        PreparedImage::prepare_from_greyscale(width, height, |x, y| frame.luma[y * width + x]);

    prepared.detect_grids().into_iter().find_map(|grid| match grid.decode() {
        Ok((_, data)) => Some(Decoded {
            data,
            corners: grid.bounds.map(|p| Point {
                x: p.x as f32,
                y: p.y as f32,
            }),
        }),
        Err(e) => {
            trace!(error = ?e, "Grid found but not readable");
            None
        }
    })
}

/// Render `data` as a QR code with a four-module quiet zone
#[cfg(test)]
pub(crate) fn render_qr(data: &str) -> Frame {
    use qrcode::{Color, QrCode};

    const SCALE: usize = 4;
    const QUIET: usize = 4;

    let code = QrCode::new(data.as_bytes()).unwrap();
    let modules = code.width();
    let colors = code.to_colors();
    let side = (modules + 2 * QUIET) * SCALE;

    let mut luma = vec![255u8; side * side];
    for (i, color) in colors.iter().enumerate() {
        if *color != Color::Dark {
            continue;
        }
        let (mx, my) = (i % modules + QUIET, i / modules + QUIET);
        for dy in 0..SCALE {
            let row = (my * SCALE + dy) * side;
            luma[row + mx * SCALE..row + (mx + 1) * SCALE].fill(0);
        }
    }

    Frame::new(side as u32, side as u32, luma)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decodes_rendered_code() {
        let frame = render_qr("QR-7");
        let decoded = decode_frame(&frame).unwrap();

        assert_eq!(decoded.data, "QR-7");
        let side = frame.width as f32;
        for corner in decoded.corners {
            assert!(corner.x >= 0.0 && corner.x <= side);
            assert!(corner.y >= 0.0 && corner.y <= side);
        }
    }

    #[test]
    fn test_blank_frame_has_no_code() {
        let frame = Frame::new(64, 64, vec![255; 64 * 64]);
        assert_eq!(decode_frame(&frame), None);
    }

    #[test]
    fn test_short_buffer_is_ignored() {
        let frame = Frame::new(64, 64, vec![0; 10]);
        assert_eq!(decode_frame(&frame), None);
        assert_eq!(decode_frame(&Frame::new(0, 0, Vec::new())), None);
    }

    #[tokio::test]
    async fn test_async_decode_keeps_url_payload() {
        let url = "https://example.org/checkin?session=3";
        let decoded = QrDecoder.decode(render_qr(url)).await.unwrap();
        assert_eq!(decoded.data, url);
    }
}
