// ============================================================
// Layer 1 - CLI / Presentation Layer
// ============================================================
// Parses arguments with clap and routes each subcommand to a
// use case. Printing results happens here and nowhere else.
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

pub mod commands;

use anyhow::Result;
use burn::prelude::Module;
use clap::Parser;
use commands::{Commands, EvaluateArgs, PredictArgs, SummaryArgs, TrainArgs};

use crate::data::idx::IdxLoader;
use crate::ml::{model::CnnConfig, InferBackend, TrainBackend};

#[derive(Parser, Debug)]
#[command(
    name = "cnn-mnist",
    version,
    about = "Train a small convolutional network on MNIST digits, then evaluate it."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Train(args)    => run_train(args),
            Commands::Evaluate(args) => run_evaluate(args),
            Commands::Predict(args)  => run_predict(args),
            Commands::Summary(args)  => run_summary(args),
        }
    }
}

fn run_train(args: TrainArgs) -> Result<()> {
    use crate::application::train_use_case::TrainUseCase;

    tracing::info!("Starting training on images in: {}", args.data_dir);

    let source   = IdxLoader::new(&args.data_dir);
    let device   = burn::backend::wgpu::WgpuDevice::default();
    let use_case = TrainUseCase::<TrainBackend, _>::new(args.into(), source, device);
    let history  = use_case.execute()?;

    if let Some(last) = history.last() {
        println!(
            "Training complete. Final val_acc={:.2}%. Checkpoint saved.",
            last.val_accuracy * 100.0
        );
    }
    Ok(())
}

fn run_evaluate(args: EvaluateArgs) -> Result<()> {
    use crate::application::evaluate_use_case::EvaluateUseCase;

    let device   = burn::backend::wgpu::WgpuDevice::default();
    let use_case = EvaluateUseCase::<InferBackend, _>::new(
        &args.checkpoint_dir, IdxLoader::new(&args.data_dir), &device,
    )?;

    let report = use_case.evaluate(args.batch_size)?;
    println!(
        "Test images: {} | loss={:.4} | accuracy={:.2}%",
        report.samples, report.loss, report.accuracy * 100.0
    );
    Ok(())
}

fn run_predict(args: PredictArgs) -> Result<()> {
    use crate::application::evaluate_use_case::EvaluateUseCase;

    let device   = burn::backend::wgpu::WgpuDevice::default();
    let use_case = EvaluateUseCase::<InferBackend, _>::new(
        &args.checkpoint_dir, IdxLoader::new(&args.data_dir), &device,
    )?;

    let (pred, label) = use_case.predict(args.index)?;
    println!("\nImage #{}: predicted {} (p={:.3}), label {}",
        args.index, pred.digit, pred.confidence, label);
    for (digit, p) in pred.probabilities.iter().enumerate() {
        println!("  {digit}: {p:.4}");
    }
    Ok(())
}

fn run_summary(args: SummaryArgs) -> Result<()> {
    let cfg: CnnConfig = args.model.into();
    let shapes = cfg.layer_shapes()?;

    let device = burn::backend::ndarray::NdArrayDevice::default();
    let model  = cfg.init::<burn::backend::NdArray>(&device)?;

    println!("{:<8} output shape", "layer");
    println!("{:<8} [batch, {}]", "input", cfg.input_width());
    for shape in &shapes {
        let dims: Vec<String> = shape.dims.iter().map(usize::to_string).collect();
        println!("{:<8} [batch, {}]", shape.name, dims.join(", "));
    }
    println!("\nTrainable parameters: {}", model.num_params());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::train_use_case::TrainConfig;

    #[test]
    fn test_train_defaults() {
        let cli = Cli::try_parse_from(["cnn-mnist", "train"]).unwrap();
        let Commands::Train(args) = cli.command else { panic!("expected train") };
        let cfg: TrainConfig = args.into();
        assert_eq!(cfg.model.n_filters, vec![8, 16, 32, 32]);
        assert_eq!(cfg.optimizer, crate::ml::trainer::OptimizerKind::Sgd);
        assert_eq!(cfg.batch_size, 512);
    }

    #[test]
    fn test_n_filters_are_comma_separated() {
        let cli = Cli::try_parse_from([
            "cnn-mnist", "summary", "--n-filters", "4,8,16,16", "--channel-out", "3",
        ]).unwrap();
        let Commands::Summary(args) = cli.command else { panic!("expected summary") };
        let cfg: CnnConfig = args.model.into();
        assert_eq!(cfg.n_filters, vec![4, 8, 16, 16]);
        assert_eq!(cfg.channel_out, 3);
    }

    #[test]
    fn test_unknown_optimizer_rejected() {
        assert!(Cli::try_parse_from(["cnn-mnist", "train", "--optimizer", "lbfgs"]).is_err());
    }

    #[test]
    fn test_predict_requires_index() {
        assert!(Cli::try_parse_from(["cnn-mnist", "predict"]).is_err());
    }

    #[test]
    fn test_summary_runs_for_defaults() {
        let cli = Cli::try_parse_from(["cnn-mnist", "summary"]).unwrap();
        assert!(cli.run().is_ok());
    }

    #[test]
    fn test_summary_rejects_short_filter_list() {
        let cli = Cli::try_parse_from(["cnn-mnist", "summary", "--n-filters", "8,16"]).unwrap();
        assert!(cli.run().is_err());
    }
}
