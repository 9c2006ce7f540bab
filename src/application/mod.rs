// ============================================================
// Layer 2 - Application / Use Cases
// ============================================================
// Orchestrates the other layers to accomplish one goal.
//
// Rules for this layer:
//   - No model math here (that's Layer 5)
//   - No argument parsing or printing (that's Layer 1)
//   - Only workflow coordination

// The training workflow
pub mod train_use_case;

// Scoring / querying a trained checkpoint
pub mod evaluate_use_case;
