// ============================================================
// Layer 6 - Infrastructure Layer
// ============================================================
// Cross-cutting persistence used by training and evaluation:
//
//   checkpoint.rs  - model weights (Burn CompactRecorder) plus
//                    the run config and normaliser as JSON, so
//                    evaluation can rebuild the same model
//
//   metrics.rs     - per-epoch loss/accuracy appended to a CSV
//
// Reference: Burn Book §5 (Checkpointing)

/// Model checkpoint saving and loading
pub mod checkpoint;

/// Training metrics CSV logger
pub mod metrics;
