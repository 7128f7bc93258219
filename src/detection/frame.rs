//! Frame capture and model input preparation.

use image::RgbImage;
use image::imageops::{self, FilterType};
use ndarray::Array4;

use crate::geometry::Size;

/// A captured video frame at native resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct CapturedFrame {
    image: RgbImage,
}

impl CapturedFrame {
    pub fn new(image: RgbImage) -> Self {
        Self { image }
    }

    /// Wrap a packed RGB buffer. Returns None if the length does not match.
    pub fn from_raw(width: u32, height: u32, pixels: Vec<u8>) -> Option<Self> {
        RgbImage::from_raw(width, height, pixels).map(Self::new)
    }

    /// A uniformly colored frame.
    pub fn solid(width: u32, height: u32, rgb: [u8; 3]) -> Self {
        Self::new(RgbImage::from_pixel(width, height, image::Rgb(rgb)))
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Native dimensions in pixels.
    pub fn size(&self) -> Size {
        Size::new(self.image.width() as f32, self.image.height() as f32)
    }

    pub fn image(&self) -> &RgbImage {
        &self.image
    }
}

/// Source of the currently displayed video frame.
pub trait FrameSource {
    /// Whether a frame can be captured right now.
    fn is_ready(&self) -> bool;

    /// Capture the displayed frame at native resolution.
    fn capture(&self) -> Option<CapturedFrame>;
}

/// A frame source that always hands out the same frame (or nothing).
#[derive(Debug, Clone, Default)]
pub struct StaticFrame {
    frame: Option<CapturedFrame>,
}

impl StaticFrame {
    pub fn new(frame: CapturedFrame) -> Self {
        Self { frame: Some(frame) }
    }

    /// A mid-gray frame of the given size.
    pub fn blank(width: u32, height: u32) -> Self {
        Self::new(CapturedFrame::solid(width, height, [114, 114, 114]))
    }

    /// A source that is never ready.
    pub fn not_ready() -> Self {
        Self { frame: None }
    }

    pub fn set_frame(&mut self, frame: Option<CapturedFrame>) {
        self.frame = frame;
    }
}

impl FrameSource for StaticFrame {
    fn is_ready(&self) -> bool {
        self.frame
            .as_ref()
            .is_some_and(|f| f.width() > 0 && f.height() > 0)
    }

    fn capture(&self) -> Option<CapturedFrame> {
        if self.is_ready() {
            self.frame.clone()
        } else {
            None
        }
    }
}

/// Resize a frame to the square model input and lay it out as an NCHW
/// `[1, 3, size, size]` tensor with values in [0, 1].
pub fn preprocess(frame: &CapturedFrame, input_size: u32) -> Array4<f32> {
    let resized = imageops::resize(frame.image(), input_size, input_size, FilterType::Triangle);
    let side = input_size as usize;

    Array4::from_shape_fn((1, 3, side, side), |(_, channel, y, x)| {
        resized.get_pixel(x as u32, y as u32)[channel] as f32 / 255.0
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_frame_readiness() {
        let ready = StaticFrame::blank(32, 16);
        assert!(ready.is_ready());
        let frame = ready.capture().unwrap();
        assert_eq!(frame.size(), Size::new(32.0, 16.0));

        let not_ready = StaticFrame::not_ready();
        assert!(!not_ready.is_ready());
        assert!(not_ready.capture().is_none());
    }

    #[test]
    fn test_from_raw_checks_length() {
        assert!(CapturedFrame::from_raw(2, 2, vec![0; 12]).is_some());
        assert!(CapturedFrame::from_raw(2, 2, vec![0; 11]).is_none());
    }

    #[test]
    fn test_preprocess_layout_and_range() {
        let frame = CapturedFrame::solid(40, 20, [255, 0, 51]);
        let tensor = preprocess(&frame, 8);

        assert_eq!(tensor.shape(), &[1, 3, 8, 8]);
        assert!((tensor[[0, 0, 3, 3]] - 1.0).abs() < 1e-6);
        assert_eq!(tensor[[0, 1, 0, 7]], 0.0);
        assert!((tensor[[0, 2, 7, 0]] - 0.2).abs() < 1e-6);
    }
}
