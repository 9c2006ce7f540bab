// ============================================================
// Layer 5 - Evaluator
// ============================================================
// Rebuilds the trained model from a checkpoint and runs it
// without autodiff: accuracy / loss over a whole dataset, or a
// class prediction with probabilities for a single image.

use anyhow::Result;
use burn::{
    data::dataloader::DataLoaderBuilder,
    nn::loss::CrossEntropyLossConfig,
    prelude::*,
    tensor::activation::softmax,
};

use crate::data::{batcher::MnistBatcher, dataset::{MnistDataset, MnistItem}};
use crate::infra::checkpoint::CheckpointManager;
use crate::ml::model::{CnnConfig, CnnModel};

#[derive(Debug, Clone, PartialEq)]
pub struct EvalReport {
    pub loss:     f64,
    pub accuracy: f64,
    pub samples:  usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub digit:         usize,
    pub confidence:    f32,
    pub probabilities: Vec<f32>,
}

pub struct Evaluator<B: Backend> {
    config: CnnConfig,
    model:  CnnModel<B>,
    device: B::Device,
}

impl<B: Backend> Evaluator<B> {
    pub fn new(config: CnnConfig, model: CnnModel<B>, device: B::Device) -> Self {
        Self { config, model, device }
    }

    /// Architecture the loaded weights belong to.
    pub fn config(&self) -> &CnnConfig {
        &self.config
    }

    pub fn from_checkpoint(ckpt: &CheckpointManager, device: &B::Device) -> Result<Self> {
        let cfg   = ckpt.load_config()?;
        let model = cfg.model.init::<B>(device)?;
        let model = ckpt.load_model(model, device)?;
        tracing::info!("Model loaded from checkpoint");
        Ok(Self::new(cfg.model, model, device.clone()))
    }

    /// Mean cross-entropy and accuracy over every item of `dataset`.
    pub fn evaluate(&self, dataset: MnistDataset, batch_size: usize) -> Result<EvalReport> {
        let loader = DataLoaderBuilder::new(MnistBatcher::<B>::new(self.device.clone()))
            .batch_size(batch_size)
            .build(dataset);

        let mut loss_sum = 0.0f64;
        let mut batches  = 0usize;
        let mut correct  = 0usize;
        let mut samples  = 0usize;

        for batch in loader.iter() {
            let logits = self.model.forward(batch.images);
            let ce     = CrossEntropyLossConfig::new().init(&self.device);

            loss_sum += ce.forward(logits.clone(), batch.targets.clone())
                .into_scalar().elem::<f64>();
            batches  += 1;
            samples  += batch.targets.dims()[0];

            let hits: i64 = logits.argmax(1).flatten::<1>(0, 1)
                .equal(batch.targets)
                .int().sum().into_scalar().elem::<i64>();
            correct += hits as usize;
        }

        anyhow::ensure!(samples > 0, "Cannot evaluate on an empty dataset");

        Ok(EvalReport {
            loss:     loss_sum / batches as f64,
            accuracy: correct as f64 / samples as f64,
            samples,
        })
    }

    pub fn predict(&self, item: &MnistItem) -> Result<Prediction> {
        let input = Tensor::<B, 2>::from_data(
            TensorData::new(item.pixels.clone(), [1, item.width()]), &self.device,
        );

        let probabilities: Vec<f32> = softmax(self.model.forward(input), 1)
            .into_data()
            .to_vec::<f32>()
            .map_err(|e| anyhow::anyhow!("Cannot read probabilities: {e:?}"))?;

        let (digit, confidence) = probabilities
            .iter()
            .copied()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(&b.1))
            .ok_or_else(|| anyhow::anyhow!("Model produced no outputs"))?;

        tracing::debug!("Predicted {} with p={:.4}", digit, confidence);
        Ok(Prediction { digit, confidence, probabilities })
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;
    use crate::application::train_use_case::TrainConfig;

    fn dataset(n: usize) -> MnistDataset {
        MnistDataset::new(
            (0..n).map(|i| MnistItem { pixels: vec![(i % 3) as f32; 784], label: i % 10 }).collect(),
        )
    }

    fn evaluator() -> Evaluator<NdArray> {
        let device = Default::default();
        let cfg    = CnnConfig::mnist(vec![4, 4, 4, 4]);
        let model  = cfg.init::<NdArray>(&device).unwrap();
        Evaluator::new(cfg, model, device)
    }

    #[test]
    fn test_evaluate_counts_every_sample() {
        let report = evaluator().evaluate(dataset(7), 3).unwrap();
        assert_eq!(report.samples, 7);
        assert!(report.loss.is_finite());
        assert!((0.0..=1.0).contains(&report.accuracy));
    }

    #[test]
    fn test_evaluate_empty_dataset_fails() {
        assert!(evaluator().evaluate(dataset(0), 3).is_err());
    }

    #[test]
    fn test_predict_returns_distribution() {
        let pred = evaluator().predict(&MnistItem { pixels: vec![0.5; 784], label: 0 }).unwrap();
        assert_eq!(pred.probabilities.len(), 10);
        let total: f32 = pred.probabilities.iter().sum();
        assert!((total - 1.0).abs() < 1e-4);
        assert!(pred.digit < 10);
        assert_eq!(pred.confidence, pred.probabilities[pred.digit]);
    }

    #[test]
    fn test_from_checkpoint() {
        let dir    = std::env::temp_dir().join(format!("cnn_mnist_eval_{}", std::process::id()));
        let device = Default::default();
        let ckpt   = CheckpointManager::new(&dir).unwrap();

        let cfg = TrainConfig { model: CnnConfig::mnist(vec![4, 4, 4, 4]), ..TrainConfig::default() };
        ckpt.save_config(&cfg).unwrap();
        let model = cfg.model.init::<NdArray>(&device).unwrap();
        ckpt.save_model(&model, 1).unwrap();

        let eval = Evaluator::<NdArray>::from_checkpoint(&ckpt, &device).unwrap();
        assert_eq!(eval.evaluate(dataset(4), 2).unwrap().samples, 4);

        std::fs::remove_dir_all(&dir).ok();
    }
}
