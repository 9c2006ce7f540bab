// ============================================================
// Layer 5 - ML / Model Layer (Burn)
// ============================================================
// All Burn model and training code lives here.
//
//   model.rs     - CnnConfig + CnnModel
//                  reshape → 4 × (conv + ReLU, stride 2)
//                  → 2x2 average pool → flatten → dense
//
//   trainer.rs   - epoch loop: forward, cross-entropy,
//                  backward, optimiser step, validation,
//                  metrics + checkpoint per epoch
//
//   evaluator.rs - loads a checkpoint, scores a dataset,
//                  predicts single images
//
// Reference: Burn Book §3 (Building Blocks), §5 (Training)

/// Convolutional classifier architecture
pub mod model;

/// Training loop with validation and checkpointing
pub mod trainer;

/// Checkpoint evaluation and single-image prediction
pub mod evaluator;

/// Backend used at runtime for inference / evaluation
pub type InferBackend = burn::backend::Wgpu;

/// Backend used at runtime for training
pub type TrainBackend = burn::backend::Autodiff<InferBackend>;
