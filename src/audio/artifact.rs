use std::sync::Arc;

use super::format;

/// A finished, immutable audio object tagged with its container type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioArtifact {
    payload: Arc<[u8]>,
    mime_type: String,
}

impl AudioArtifact {
    pub fn new(payload: impl Into<Vec<u8>>, mime_type: impl Into<String>) -> Self {
        Self {
            payload: Arc::from(payload.into()),
            mime_type: mime_type.into(),
        }
    }

    /// Concatenate capture chunks in arrival order
    pub fn from_chunks(chunks: &[Vec<u8>], mime_type: impl Into<String>) -> Self {
        let total: usize = chunks.iter().map(Vec::len).sum();
        let mut payload = Vec::with_capacity(total);
        for chunk in chunks {
            payload.extend_from_slice(chunk);
        }
        Self::new(payload, mime_type)
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn len(&self) -> usize {
        self.payload.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    pub fn file_extension(&self) -> &'static str {
        format::file_extension(&self.mime_type)
    }
}
