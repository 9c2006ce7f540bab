// ============================================================
// Layer 4 - Data Pipeline
// ============================================================
// Everything from raw IDX files to tensor batches:
//
//   IDX files
//       │
//       ▼
//   IdxLoader         → parses images + labels
//       │
//       ▼
//   Normalizer        → scales and standardises pixels
//       │
//       ▼
//   split_train_val   → holds out a validation fraction
//       │
//       ▼
//   MnistDataset      → implements Burn's Dataset trait
//       │
//       ▼
//   MnistBatcher      → stacks items into tensor batches
//       │
//       ▼
//   DataLoader        → feeds batches to the training loop
//
// Reference: Burn Book §4 (Datasets and Dataloaders)

/// Reads MNIST IDX image/label files
pub mod idx;

/// Fits and applies pixel normalisation statistics
pub mod preprocessor;

/// Implements Burn's Dataset trait for normalised images
pub mod dataset;

/// Implements Burn's Batcher trait to create tensor batches
pub mod batcher;

/// Shuffles and splits data into train/validation sets
pub mod splitter;
