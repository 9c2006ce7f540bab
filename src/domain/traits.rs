// ============================================================
// Layer 3 - Core Traits (Abstractions)
// ============================================================
// The application layer only talks to `ImageSource`, so the
// IDX file loader can be swapped for an in-memory source in
// tests (or another on-disk format later) without touching
// the use cases.
//
// Reference: Rust Book §10 (Traits: Defining Shared Behaviour)

use anyhow::Result;
use crate::domain::image::{LabeledImage, Split};

// ─── ImageSource ──────────────────────────────────────────────────────────────
/// Any component that can produce labelled images for a split.
///
/// Implementations:
///   - IdxLoader      → reads MNIST IDX files from a directory
///   - InMemorySource → fixed images held in memory (tests)
pub trait ImageSource {
    /// Load every image of the requested split.
    fn load(&self, split: Split) -> Result<Vec<LabeledImage>>;
}

/// An `ImageSource` over images already held in memory.
#[cfg(test)]
#[derive(Debug, Clone, Default)]
pub struct InMemorySource {
    pub train: Vec<LabeledImage>,
    pub test:  Vec<LabeledImage>,
}

#[cfg(test)]
impl InMemorySource {
    pub fn new(train: Vec<LabeledImage>, test: Vec<LabeledImage>) -> Self {
        Self { train, test }
    }
}

#[cfg(test)]
impl ImageSource for InMemorySource {
    fn load(&self, split: Split) -> Result<Vec<LabeledImage>> {
        Ok(match split {
            Split::Train => self.train.clone(),
            Split::Test  => self.test.clone(),
        })
    }
}
