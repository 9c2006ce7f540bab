// ============================================================
// Layer 1 - CLI Commands and Arguments
// ============================================================
// Defines the subcommands `train`, `evaluate`, `predict` and
// `summary` together with their flags.
//
// Reference: Rust Book §12 (Building a CLI Program)

use clap::{Args, Subcommand};

use crate::application::train_use_case::TrainConfig;
use crate::ml::{model::CnnConfig, trainer::OptimizerKind};

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Train the CNN on MNIST IDX files
    Train(TrainArgs),

    /// Report loss and accuracy of the latest checkpoint on the test split
    Evaluate(EvaluateArgs),

    /// Classify a single test image with the latest checkpoint
    Predict(PredictArgs),

    /// Print the layer shapes and parameter count of a configuration
    Summary(SummaryArgs),
}

/// Flags shared by every command that builds a model.
#[derive(Args, Debug, Clone)]
pub struct ModelArgs {
    /// Input images are size_in x size_in
    #[arg(long, default_value_t = 28)]
    pub size_in: usize,

    #[arg(long, default_value_t = 1)]
    pub channel_in: usize,

    /// Number of classes
    #[arg(long, default_value_t = 10)]
    pub channel_out: usize,

    /// Filters per convolution stage, comma separated (at least four)
    #[arg(long, value_delimiter = ',', default_values_t = vec![8, 16, 32, 32])]
    pub n_filters: Vec<usize>,
}

impl From<ModelArgs> for CnnConfig {
    fn from(a: ModelArgs) -> Self {
        CnnConfig::new(a.size_in, a.channel_in, a.channel_out, a.n_filters)
    }
}

#[derive(Args, Debug)]
pub struct TrainArgs {
    /// Directory holding the decompressed MNIST IDX files
    #[arg(long, default_value = "data/mnist")]
    pub data_dir: String,

    /// Directory to save checkpoints, config and metrics
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: String,

    #[arg(long, default_value_t = 3)]
    pub epochs: usize,

    #[arg(long, default_value_t = 512)]
    pub batch_size: usize,

    #[arg(long, default_value_t = 0.4)]
    pub lr: f64,

    /// sgd or adam
    #[arg(long, default_value = "sgd")]
    pub optimizer: OptimizerKind,

    /// Fraction of the train split held out for validation
    #[arg(long, default_value_t = 0.1)]
    pub val_fraction: f64,

    /// Seed for the validation split and batch shuffling
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Data loader worker threads
    #[arg(long, default_value_t = 2)]
    pub num_workers: usize,

    #[command(flatten)]
    pub model: ModelArgs,
}

/// The application layer never sees clap types.
impl From<TrainArgs> for TrainConfig {
    fn from(a: TrainArgs) -> Self {
        TrainConfig {
            data_dir:       a.data_dir,
            checkpoint_dir: a.checkpoint_dir,
            epochs:         a.epochs,
            batch_size:     a.batch_size,
            lr:             a.lr,
            optimizer:      a.optimizer,
            val_fraction:   a.val_fraction,
            seed:           a.seed,
            num_workers:    a.num_workers,
            model:          a.model.into(),
        }
    }
}

#[derive(Args, Debug)]
pub struct EvaluateArgs {
    #[arg(long, default_value = "data/mnist")]
    pub data_dir: String,

    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: String,

    #[arg(long, default_value_t = 512)]
    pub batch_size: usize,
}

#[derive(Args, Debug)]
pub struct PredictArgs {
    #[arg(long, default_value = "data/mnist")]
    pub data_dir: String,

    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: String,

    /// Position of the image in the test split
    #[arg(long)]
    pub index: usize,
}

#[derive(Args, Debug)]
pub struct SummaryArgs {
    #[command(flatten)]
    pub model: ModelArgs,
}
