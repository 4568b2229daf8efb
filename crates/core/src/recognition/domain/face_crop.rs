use image::imageops::{self, FilterType};
use ndarray::ArrayView2;

use crate::shared::constants::CLASSIFIER_INPUT_SIZE;
use crate::shared::frame::Frame;
use crate::shared::rect::Rect;

/// Classifier input: a face resized to 112x112, single channel, intensity
/// normalized to `[0, 1]`, stored row-major.
#[derive(Clone, Debug, PartialEq)]
pub struct FaceCrop {
    pixels: Vec<f32>,
}

impl FaceCrop {
    pub const SIDE: u32 = CLASSIFIER_INPUT_SIZE;

    /// Cuts `rect` out of `frame` and converts it to classifier input.
    ///
    /// The box is clamped to the frame first. Returns `None` when nothing
    /// is left to crop or the frame is not RGB.
    pub fn extract(frame: &Frame, rect: &Rect) -> Option<Self> {
        let rect = rect.clamped(frame.width(), frame.height());
        if !rect.is_valid() {
            return None;
        }
        let image = frame.as_rgb_image()?;
        let face = imageops::crop_imm(
            &image,
            rect.x1 as u32,
            rect.y1 as u32,
            rect.width() as u32,
            rect.height() as u32,
        )
        .to_image();

        // Cubic resize in color, then collapse to luma.
        let resized = imageops::resize(&face, Self::SIDE, Self::SIDE, FilterType::CatmullRom);
        let gray = imageops::grayscale(&resized);
        let pixels = gray.pixels().map(|p| p.0[0] as f32 / 255.0).collect();
        Some(Self { pixels })
    }

    /// Wraps already-normalized pixels. `None` unless there are exactly 112x112.
    pub fn from_pixels(pixels: Vec<f32>) -> Option<Self> {
        let side = Self::SIDE as usize;
        (pixels.len() == side * side).then_some(Self { pixels })
    }

    pub fn pixels(&self) -> &[f32] {
        &self.pixels
    }

    /// `[row, col]` view of the crop.
    pub fn as_ndarray(&self) -> ArrayView2<'_, f32> {
        let side = Self::SIDE as usize;
        ArrayView2::from_shape((side, side), &self.pixels)
            .expect("FaceCrop always holds SIDE x SIDE pixels")
    }
}
