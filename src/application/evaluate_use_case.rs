// ============================================================
// Layer 2 - EvaluateUseCase
// ============================================================
// Loads the newest checkpoint together with the config and
// normaliser saved at training time, then scores the test
// split or classifies one of its images.

use anyhow::Result;

use crate::application::train_use_case::{check_image_shape, check_labels};
use crate::data::{dataset::MnistDataset, preprocessor::Normalizer};
use crate::domain::{image::{LabeledImage, Split}, traits::ImageSource};
use crate::infra::checkpoint::CheckpointManager;
use crate::ml::evaluator::{EvalReport, Evaluator, Prediction};

pub struct EvaluateUseCase<B: burn::prelude::Backend, S: ImageSource> {
    evaluator:  Evaluator<B>,
    normalizer: Normalizer,
    source:     S,
}

impl<B: burn::prelude::Backend, S: ImageSource> EvaluateUseCase<B, S> {
    pub fn new(checkpoint_dir: &str, source: S, device: &B::Device) -> Result<Self> {
        let ckpt       = CheckpointManager::open(checkpoint_dir)?;
        let evaluator  = Evaluator::from_checkpoint(&ckpt, device)?;
        let normalizer = ckpt.load_normalizer()?;
        Ok(Self { evaluator, normalizer, source })
    }

    fn test_images(&self) -> Result<Vec<LabeledImage>> {
        let images = self.source.load(Split::Test)?;
        if let Some(first) = images.first() {
            check_image_shape(self.evaluator.config(), first.width, first.height, first.pixel_count())?;
        }
        check_labels(self.evaluator.config(), &images)?;
        Ok(images)
    }

    /// Loss and accuracy over the whole test split.
    pub fn evaluate(&self, batch_size: usize) -> Result<EvalReport> {
        let images  = self.test_images()?;
        let dataset = MnistDataset::new(self.normalizer.apply_all(&images));
        tracing::info!("Evaluating on {} test images", dataset.item_count());
        self.evaluator.evaluate(dataset, batch_size)
    }

    /// Classify the test image at `index`; returns the prediction and the true label.
    pub fn predict(&self, index: usize) -> Result<(Prediction, u8)> {
        let images = self.test_images()?;
        let image  = images.get(index).ok_or_else(|| {
            anyhow::anyhow!("Index {index} out of range, test split has {} images", images.len())
        })?;
        let prediction = self.evaluator.predict(&self.normalizer.apply(image))?;
        Ok((prediction, image.label))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;
    use crate::application::train_use_case::TrainConfig;
    use crate::domain::traits::InMemorySource;
    use crate::ml::model::CnnConfig;

    fn prepared_checkpoint(tag: &str) -> std::path::PathBuf {
        let dir    = std::env::temp_dir().join(format!("cnn_mnist_evaluc_{tag}_{}", std::process::id()));
        let device = Default::default();
        let ckpt   = CheckpointManager::new(&dir).unwrap();

        let cfg = TrainConfig { model: CnnConfig::mnist(vec![4, 4, 4, 4]), ..TrainConfig::default() };
        ckpt.save_config(&cfg).unwrap();
        ckpt.save_normalizer(&Normalizer::new(0.1, 0.3)).unwrap();
        ckpt.save_model(&cfg.model.init::<NdArray>(&device).unwrap(), 1).unwrap();
        dir
    }

    fn source() -> InMemorySource {
        let test = (0..5u8).map(|i| LabeledImage::new(28, 28, vec![i * 40; 784], i)).collect();
        InMemorySource::new(vec![], test)
    }

    #[test]
    fn test_evaluate_and_predict() {
        let dir = prepared_checkpoint("ok");
        let use_case = EvaluateUseCase::<NdArray, _>::new(
            dir.to_str().unwrap(), source(), &Default::default(),
        ).unwrap();

        assert_eq!(use_case.evaluate(2).unwrap().samples, 5);

        let (pred, label) = use_case.predict(3).unwrap();
        assert_eq!(label, 3);
        assert_eq!(pred.probabilities.len(), 10);

        assert!(use_case.predict(5).is_err());
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_wrong_image_size_rejected() {
        let dir    = prepared_checkpoint("shape");
        let source = InMemorySource::new(vec![], vec![LabeledImage::new(10, 10, vec![0; 100], 0)]);
        let use_case = EvaluateUseCase::<NdArray, _>::new(
            dir.to_str().unwrap(), source, &Default::default(),
        ).unwrap();

        assert!(use_case.evaluate(2).is_err());
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_label_outside_saved_classes_rejected() {
        let dir    = std::env::temp_dir().join(format!("cnn_mnist_evaluc_labels_{}", std::process::id()));
        let device = Default::default();
        let ckpt   = CheckpointManager::new(&dir).unwrap();

        let cfg = TrainConfig { model: CnnConfig::new(28, 1, 3, vec![4, 4, 4, 4]), ..TrainConfig::default() };
        ckpt.save_config(&cfg).unwrap();
        ckpt.save_normalizer(&Normalizer::default()).unwrap();
        ckpt.save_model(&cfg.model.init::<NdArray>(&device).unwrap(), 1).unwrap();

        let test = vec![
            LabeledImage::new(28, 28, vec![0; 784], 9),
            LabeledImage::new(28, 28, vec![0; 784], 1),
        ];
        let use_case = EvaluateUseCase::<NdArray, _>::new(
            dir.to_str().unwrap(), InMemorySource::new(vec![], test), &device,
        ).unwrap();

        let err = use_case.evaluate(2).unwrap_err();
        assert!(err.to_string().contains("label 9"));
        assert!(use_case.predict(1).is_err());

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_missing_checkpoint_dir() {
        let result = EvaluateUseCase::<NdArray, _>::new(
            "/definitely/not/a/checkpoint/dir", source(), &Default::default(),
        );
        assert!(result.is_err());
    }
}
