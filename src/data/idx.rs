// ============================================================
// Layer 4 - IDX Loader
// ============================================================
// Reads the MNIST digit files from a directory.
//
// IDX container layout (all integers big-endian u32):
//
//   images:  magic 0x00000803 | count | rows | cols | count*rows*cols bytes
//   labels:  magic 0x00000801 | count | count bytes
//
// The loader expects the four standard (decompressed) files:
//
//   data/mnist/
//     train-images-idx3-ubyte
//     train-labels-idx1-ubyte
//     t10k-images-idx3-ubyte
//     t10k-labels-idx1-ubyte
//
// Reference: Rust Book §9 (Error Handling)

use anyhow::{Context, Result};
use std::{
    fs,
    path::{Path, PathBuf},
};
use thiserror::Error;

use crate::domain::image::{LabeledImage, Split};
use crate::domain::traits::ImageSource;

pub const IMAGES_MAGIC: u32 = 0x0000_0803;
pub const LABELS_MAGIC: u32 = 0x0000_0801;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum IdxError {
    #[error("bad magic number {found:#010x}, expected {expected:#010x}")]
    BadMagic { expected: u32, found: u32 },

    #[error("file truncated: header declares {expected} bytes of data, found {found}")]
    Truncated { expected: usize, found: usize },

    #[error("header declares {count} images of {rows}x{cols}, more than fits in memory")]
    TooLarge { count: usize, rows: usize, cols: usize },

    #[error("{images} images but {labels} labels")]
    CountMismatch { images: usize, labels: usize },
}

/// Decoded image file: dimensions plus one flat pixel buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdxImages {
    pub count:  usize,
    pub rows:   usize,
    pub cols:   usize,
    pub pixels: Vec<u8>,
}

fn read_u32(bytes: &[u8], offset: usize) -> Result<u32, IdxError> {
    bytes
        .get(offset..offset + 4)
        .map(|b| u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
        .ok_or(IdxError::Truncated { expected: offset + 4, found: bytes.len() })
}

fn check_magic(bytes: &[u8], expected: u32) -> Result<(), IdxError> {
    let found = read_u32(bytes, 0)?;
    if found != expected {
        return Err(IdxError::BadMagic { expected, found });
    }
    Ok(())
}

/// Parse an `idx3-ubyte` image file.
pub fn parse_images(bytes: &[u8]) -> Result<IdxImages, IdxError> {
    check_magic(bytes, IMAGES_MAGIC)?;
    let count = read_u32(bytes, 4)? as usize;
    let rows  = read_u32(bytes, 8)? as usize;
    let cols  = read_u32(bytes, 12)? as usize;

    let payload  = &bytes[16..];
    let expected = count
        .checked_mul(rows)
        .and_then(|n| n.checked_mul(cols))
        .ok_or(IdxError::TooLarge { count, rows, cols })?;
    if payload.len() < expected {
        return Err(IdxError::Truncated { expected, found: payload.len() });
    }

    Ok(IdxImages { count, rows, cols, pixels: payload[..expected].to_vec() })
}

/// Parse an `idx1-ubyte` label file.
pub fn parse_labels(bytes: &[u8]) -> Result<Vec<u8>, IdxError> {
    check_magic(bytes, LABELS_MAGIC)?;
    let count   = read_u32(bytes, 4)? as usize;
    let payload = &bytes[8..];
    if payload.len() < count {
        return Err(IdxError::Truncated { expected: count, found: payload.len() });
    }
    Ok(payload[..count].to_vec())
}

/// Zip an image file and a label file into labelled images.
pub fn combine(images: IdxImages, labels: Vec<u8>) -> Result<Vec<LabeledImage>, IdxError> {
    if images.count != labels.len() {
        return Err(IdxError::CountMismatch { images: images.count, labels: labels.len() });
    }
    let per_image = images.rows * images.cols;
    if per_image == 0 {
        return Ok(Vec::new());
    }

    Ok(images
        .pixels
        .chunks_exact(per_image)
        .zip(labels)
        .map(|(px, label)| LabeledImage::new(images.cols, images.rows, px.to_vec(), label))
        .collect())
}

/// Loads MNIST IDX files from a directory.
/// Implements the ImageSource trait from Layer 3.
pub struct IdxLoader {
    dir: PathBuf,
}

impl IdxLoader {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn file_names(split: Split) -> (&'static str, &'static str) {
        match split {
            Split::Train => ("train-images-idx3-ubyte", "train-labels-idx1-ubyte"),
            Split::Test  => ("t10k-images-idx3-ubyte", "t10k-labels-idx1-ubyte"),
        }
    }

    fn read(path: &Path) -> Result<Vec<u8>> {
        fs::read(path).with_context(|| {
            format!(
                "Cannot read '{}'. Download and decompress the MNIST files into this directory.",
                path.display()
            )
        })
    }
}

impl ImageSource for IdxLoader {
    fn load(&self, split: Split) -> Result<Vec<LabeledImage>> {
        let (images_name, labels_name) = Self::file_names(split);
        let images_path = self.dir.join(images_name);
        let labels_path = self.dir.join(labels_name);

        let images = parse_images(&Self::read(&images_path)?)
            .with_context(|| format!("Invalid image file '{}'", images_path.display()))?;
        let labels = parse_labels(&Self::read(&labels_path)?)
            .with_context(|| format!("Invalid label file '{}'", labels_path.display()))?;

        tracing::debug!(
            "Parsed {} {}x{} images from '{}'",
            images.count, images.rows, images.cols, images_path.display()
        );

        let samples = combine(images, labels)?;
        tracing::info!("Loaded {} {} images", samples.len(), split);
        Ok(samples)
    }
}
