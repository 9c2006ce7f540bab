// ============================================================
// Layer 4 - MNIST Batcher
// ============================================================
// Implements Burn's Batcher trait to turn a Vec<MnistItem>
// into tensors the model can consume.
//
//   Input:  N items, each with W normalised pixels
//   Output: images  [N, W]  (float)
//           targets [N]     (int, class index)
//
// The model's first step reshapes the flat rows back into
// [N, C, H, W] images, so batching stays a plain concatenation.
//
// Reference: Burn Book §4 (Batcher)

use burn::{
    data::dataloader::batcher::Batcher,
    prelude::*,
};

use crate::data::dataset::MnistItem;

/// A batch of images ready for the model forward pass.
#[derive(Debug, Clone)]
pub struct MnistBatch<B: Backend> {
    /// Flattened images, shape [batch_size, width]
    pub images:  Tensor<B, 2>,

    /// Ground-truth classes, shape [batch_size]
    pub targets: Tensor<B, 1, Int>,
}

#[derive(Clone, Debug)]
pub struct MnistBatcher<B: Backend> {
    pub device: B::Device,
}

impl<B: Backend> MnistBatcher<B> {
    pub fn new(device: B::Device) -> Self {
        Self { device }
    }
}

impl<B: Backend> Batcher<MnistItem, MnistBatch<B>> for MnistBatcher<B> {
    fn batch(&self, items: Vec<MnistItem>) -> MnistBatch<B> {
        let batch_size = items.len();
        let width      = items.first().map(MnistItem::width).unwrap_or(0);

        let flat: Vec<f32> = items
            .iter()
            .flat_map(|item| item.pixels.iter().copied())
            .collect();

        let labels: Vec<i64> = items.iter().map(|item| item.label as i64).collect();

        let images = Tensor::<B, 2>::from_data(
            TensorData::new(flat, [batch_size, width]), &self.device,
        );
        let targets = Tensor::<B, 1, Int>::from_data(
            TensorData::new(labels, [batch_size]), &self.device,
        );

        MnistBatch { images, targets }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    #[test]
    fn test_batch_shapes_and_labels() {
        let device  = Default::default();
        let batcher = MnistBatcher::<NdArray>::new(device);
        let items   = (0..3)
            .map(|i| MnistItem { pixels: vec![i as f32; 784], label: i })
            .collect();

        let batch = batcher.batch(items);
        assert_eq!(batch.images.dims(), [3, 784]);
        assert_eq!(batch.targets.dims(), [3]);

        let labels = batch.targets.into_data().to_vec::<i64>().unwrap();
        assert_eq!(labels, vec![0, 1, 2]);
    }
}
