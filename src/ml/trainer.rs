// ============================================================
// Layer 5 - Training Loop
// ============================================================
// Train + validation loop using Burn's DataLoader.
//
//   - Training runs on an AutodiffBackend so loss.backward()
//     can produce gradients for every conv / dense parameter
//   - model.valid() drops autodiff for the validation pass,
//     so the validation batcher uses B::InnerBackend
//   - argmax(1) returns [batch, 1]; flatten before .equal()
//
// Reference: Burn Book §5 (Custom Training Loop)

use anyhow::Result;
use burn::{
    data::dataloader::DataLoaderBuilder,
    module::AutodiffModule,
    nn::loss::CrossEntropyLossConfig,
    optim::{AdamConfig, GradientsParams, Optimizer, SgdConfig},
    prelude::*,
    tensor::backend::AutodiffBackend,
};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::application::train_use_case::TrainConfig;
use crate::data::{batcher::MnistBatcher, dataset::MnistDataset};
use crate::infra::{
    checkpoint::CheckpointManager,
    metrics::{EpochMetrics, MetricsLogger},
};
use crate::ml::model::{CnnModel, CONV_STAGES};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptimizerKind {
    Sgd,
    Adam,
}

impl FromStr for OptimizerKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "sgd"  => Ok(Self::Sgd),
            "adam" => Ok(Self::Adam),
            other  => anyhow::bail!("unknown optimizer '{other}', expected 'sgd' or 'adam'"),
        }
    }
}

/// Everything one epoch loop needs besides the model and optimiser.
pub struct TrainContext<'a, B: AutodiffBackend> {
    pub cfg:           &'a TrainConfig,
    pub train_dataset: MnistDataset,
    pub val_dataset:   MnistDataset,
    pub ckpt:          &'a CheckpointManager,
    pub metrics:       &'a MetricsLogger,
    pub device:        B::Device,
}

/// Build the model and optimiser named by the config, then fit.
pub fn train_loop<B: AutodiffBackend>(ctx: TrainContext<'_, B>) -> Result<Vec<EpochMetrics>> {
    let model: CnnModel<B> = ctx.cfg.model.init(&ctx.device)?;
    tracing::info!(
        "Model ready: filters={:?}, {} parameters",
        &ctx.cfg.model.n_filters[..CONV_STAGES], model.num_params()
    );

    match ctx.cfg.optimizer {
        OptimizerKind::Sgd => {
            let optim = SgdConfig::new().init::<B, CnnModel<B>>();
            fit(ctx, model, optim)
        }
        OptimizerKind::Adam => {
            let optim = AdamConfig::new().with_epsilon(1e-8).init::<B, CnnModel<B>>();
            fit(ctx, model, optim)
        }
    }
}

fn fit<B, O>(
    ctx:       TrainContext<'_, B>,
    mut model: CnnModel<B>,
    mut optim: O,
) -> Result<Vec<EpochMetrics>>
where
    B: AutodiffBackend,
    O: Optimizer<CnnModel<B>, B>,
{
    let cfg = ctx.cfg;

    let train_loader = DataLoaderBuilder::new(MnistBatcher::<B>::new(ctx.device.clone()))
        .batch_size(cfg.batch_size)
        .shuffle(cfg.seed)
        .num_workers(cfg.num_workers)
        .build(ctx.train_dataset);

    let val_loader = DataLoaderBuilder::new(MnistBatcher::<B::InnerBackend>::new(ctx.device.clone()))
        .batch_size(cfg.batch_size)
        .num_workers(cfg.num_workers)
        .build(ctx.val_dataset);

    let mut history       = Vec::with_capacity(cfg.epochs);
    let mut best_val_loss = f64::INFINITY;

    for epoch in 1..=cfg.epochs {

        // ── Training phase ────────────────────────────────────────────────────
        let mut train_loss_sum = 0.0f64;
        let mut train_batches  = 0usize;

        for batch in train_loader.iter() {
            let out = model.forward_classification(batch.images, batch.targets);

            train_loss_sum += out.loss.clone().into_scalar().elem::<f64>();
            train_batches  += 1;

            let grads = out.loss.backward();
            let grads = GradientsParams::from_grads(grads, &model);
            model = optim.step(cfg.lr, model, grads);
        }

        let train_loss = if train_batches > 0 {
            train_loss_sum / train_batches as f64
        } else { f64::NAN };

        // ── Validation phase ──────────────────────────────────────────────────
        let model_valid = model.valid();

        let mut val_loss_sum  = 0.0f64;
        let mut val_batches   = 0usize;
        let mut correct       = 0usize;
        let mut total_samples = 0usize;

        for batch in val_loader.iter() {
            let logits = model_valid.forward(batch.images);
            let ce     = CrossEntropyLossConfig::new().init(&logits.device());

            val_loss_sum += ce.forward(logits.clone(), batch.targets.clone())
                .into_scalar().elem::<f64>();
            val_batches  += 1;

            total_samples += batch.targets.dims()[0];
            let hits: i64 = logits.argmax(1).flatten::<1>(0, 1)
                .equal(batch.targets)
                .int().sum().into_scalar().elem::<i64>();
            correct += hits as usize;
        }

        let val_loss     = if val_batches   > 0 { val_loss_sum / val_batches as f64 } else { f64::NAN };
        let val_accuracy = if total_samples > 0 { correct as f64 / total_samples as f64 } else { 0.0 };

        let m = EpochMetrics::new(epoch, train_loss, val_loss, val_accuracy);
        println!(
            "Epoch {:>3}/{} | train_loss={:.4} | val_loss={:.4} | val_acc={:.2}%",
            epoch, cfg.epochs, m.train_loss, m.val_loss, m.val_accuracy * 100.0,
        );

        if m.is_improvement(best_val_loss) {
            tracing::info!("Validation loss improved to {:.4}", m.val_loss);
            best_val_loss = m.val_loss;
        }

        ctx.metrics.log(&m)?;
        ctx.ckpt.save_model(&model_valid, epoch)?;
        tracing::info!("Checkpoint saved for epoch {}", epoch);
        history.push(m);
    }

    tracing::info!("Training complete!");
    Ok(history)
}
