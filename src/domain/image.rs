// ============================================================
// Layer 3 - Labelled Image Domain Type
// ============================================================
// One raw greyscale image together with its class label.
// Pixels are stored row-major, exactly as they appear in the
// source file, before any scaling or normalisation.

use serde::{Deserialize, Serialize};

/// Which half of a dataset to load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Split {
    Train,
    Test,
}

impl std::fmt::Display for Split {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Split::Train => write!(f, "train"),
            Split::Test  => write!(f, "test"),
        }
    }
}

/// A raw image with its ground-truth label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabeledImage {
    pub width:  usize,
    pub height: usize,

    /// Raw intensities, 0 = background, 255 = full ink
    pub pixels: Vec<u8>,

    /// Class index, 0..=9 for MNIST digits
    pub label:  u8,
}

impl LabeledImage {
    pub fn new(width: usize, height: usize, pixels: Vec<u8>, label: u8) -> Self {
        Self { width, height, pixels, label }
    }

    pub fn pixel_count(&self) -> usize {
        self.width * self.height
    }
}
