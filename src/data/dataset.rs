use burn::data::dataset::Dataset;
use serde::{Deserialize, Serialize};

/// One normalised image, flattened row-major, with its class index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MnistItem {
    pub pixels: Vec<f32>,
    pub label:  usize,
}

impl MnistItem {
    pub fn width(&self) -> usize {
        self.pixels.len()
    }
}

pub struct MnistDataset {
    items: Vec<MnistItem>,
}

impl MnistDataset {
    pub fn new(items: Vec<MnistItem>) -> Self { Self { items } }

    pub fn item_count(&self) -> usize { self.items.len() }
}

impl Dataset<MnistItem> for MnistDataset {
    fn get(&self, index: usize) -> Option<MnistItem> {
        self.items.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.items.len()
    }
}
