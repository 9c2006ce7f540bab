// ============================================================
// Layer 4 - Pixel Normaliser
// ============================================================
// Scales raw u8 intensities to [0, 1] and then standardises
// them with a single global mean / std:
//
//   x = (p / 255 - mean) / std
//
// The statistics are fitted on the training split only and
// saved next to the checkpoint, so evaluation and prediction
// see exactly the same input distribution as training did.

use serde::{Deserialize, Serialize};

use crate::data::dataset::MnistItem;
use crate::domain::image::LabeledImage;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Normalizer {
    pub mean: f32,
    pub std:  f32,
}

impl Default for Normalizer {
    /// Identity after scaling: mean 0, std 1
    fn default() -> Self {
        Self { mean: 0.0, std: 1.0 }
    }
}

impl Normalizer {
    pub fn new(mean: f32, std: f32) -> Self {
        Self { mean, std }
    }

    /// Compute the global pixel mean and (population) std.
    /// Accumulates in f64 so 47M MNIST pixels do not lose precision.
    pub fn fit(images: &[LabeledImage]) -> Self {
        let mut count = 0u64;
        let mut sum   = 0.0f64;
        let mut sq    = 0.0f64;

        for img in images {
            for &p in &img.pixels {
                let x = p as f64 / 255.0;
                sum   += x;
                sq    += x * x;
                count += 1;
            }
        }

        if count == 0 {
            return Self::default();
        }

        let mean = sum / count as f64;
        let var  = (sq / count as f64 - mean * mean).max(0.0);
        let std  = var.sqrt();
        // A constant image set has no spread; dividing by 1 keeps it finite.
        let std  = if std > f64::EPSILON { std } else { 1.0 };

        tracing::info!("Fitted normaliser: mean={:.4}, std={:.4}", mean, std);
        Self { mean: mean as f32, std: std as f32 }
    }

    pub fn normalize_pixel(&self, p: u8) -> f32 {
        (p as f32 / 255.0 - self.mean) / self.std
    }

    pub fn apply(&self, img: &LabeledImage) -> MnistItem {
        MnistItem {
            pixels: img.pixels.iter().map(|&p| self.normalize_pixel(p)).collect(),
            label:  img.label as usize,
        }
    }

    pub fn apply_all(&self, images: &[LabeledImage]) -> Vec<MnistItem> {
        images.iter().map(|img| self.apply(img)).collect()
    }
}
