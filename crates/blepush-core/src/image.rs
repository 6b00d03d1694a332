//! Payload buffer and image sources
//!
//! The payload is read exactly once, when the session starts transmitting.
//! Its length is checked against the configured payload size; a short or
//! long image is an error and is never padded or truncated.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ImageError;

// ----------------------------------------------------------------------------
// Payload
// ----------------------------------------------------------------------------

/// Immutable, explicitly-sized byte buffer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payload(Arc<[u8]>);

impl Payload {
    /// Wrap `bytes`, rejecting anything that is not exactly `expected_len` long
    pub fn with_expected_len(bytes: Vec<u8>, expected_len: usize) -> Result<Self, ImageError> {
        if bytes.len() != expected_len {
            return Err(ImageError::LengthMismatch {
                expected: expected_len,
                actual: bytes.len(),
            });
        }
        Ok(Self(bytes.into()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl AsRef<[u8]> for Payload {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

// ----------------------------------------------------------------------------
// Image Sources
// ----------------------------------------------------------------------------

/// Supplies the payload to transmit
///
/// Implementations must not block the calling runtime.
#[async_trait]
pub trait ImageSource: Send + Sync {
    async fn read(&self) -> Result<Payload, ImageError>;
}

/// On-disk encoding of an image file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    /// Bytes stored verbatim
    #[default]
    Raw,
    /// ASCII hex dump; whitespace, commas and `0x` prefixes are ignored
    Hex,
}

/// Reads the payload from a file
#[derive(Debug, Clone)]
pub struct FileImageSource {
    path: PathBuf,
    format: ImageFormat,
    expected_len: usize,
}

impl FileImageSource {
    pub fn new(path: impl Into<PathBuf>, format: ImageFormat, expected_len: usize) -> Self {
        Self {
            path: path.into(),
            format,
            expected_len,
        }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

#[async_trait]
impl ImageSource for FileImageSource {
    async fn read(&self) -> Result<Payload, ImageError> {
        let raw = tokio::fs::read(&self.path).await.map_err(|source| ImageError::Io {
            path: self.path.display().to_string(),
            source,
        })?;

        let bytes = match self.format {
            ImageFormat::Raw => raw,
            ImageFormat::Hex => decode_hex_dump(&raw)?,
        };

        tracing::debug!(
            "Read {} byte image from {}",
            bytes.len(),
            self.path.display()
        );
        Payload::with_expected_len(bytes, self.expected_len)
    }
}

/// Serves a payload held in memory
#[derive(Debug, Clone)]
pub struct MemoryImageSource {
    bytes: Vec<u8>,
    expected_len: usize,
}

impl MemoryImageSource {
    pub fn new(bytes: Vec<u8>, expected_len: usize) -> Self {
        Self {
            bytes,
            expected_len,
        }
    }
}

#[async_trait]
impl ImageSource for MemoryImageSource {
    async fn read(&self) -> Result<Payload, ImageError> {
        Payload::with_expected_len(self.bytes.clone(), self.expected_len)
    }
}

/// Decode an ASCII hex dump such as `0x1F, 0x8B, ...` or `1f8b...`
pub fn decode_hex_dump(text: &[u8]) -> Result<Vec<u8>, ImageError> {
    let mut digits = Vec::with_capacity(text.len());
    let mut i = 0;
    while i < text.len() {
        let c = text[i];
        if c == b'0' && matches!(text.get(i + 1), Some(b'x' | b'X')) {
            i += 2;
            continue;
        }
        if !(c.is_ascii_whitespace() || c == b',') {
            digits.push(c);
        }
        i += 1;
    }
    Ok(hex::decode(digits)?)
}
