//! The `pass.json` payload.

use crate::{Error, Result};

/// Raw `pass.json` bytes, known to parse as a JSON object.
///
/// The schema of the pass itself is not checked; only that the bytes are
/// a syntactically valid JSON object. The bytes are kept verbatim so the
/// archived payload hashes to the manifest digest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayloadDocument {
    bytes: Vec<u8>,
}

impl PayloadDocument {
    /// Validate and wrap a payload.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPayload`] if the bytes are not JSON or the
    /// top-level value is not an object.
    pub fn new(bytes: impl Into<Vec<u8>>) -> Result<Self> {
        let bytes = bytes.into();

        let value: serde_json::Value = serde_json::from_slice(&bytes)
            .map_err(|e| Error::InvalidPayload(format!("This is not a JSON string: {}", e)))?;

        if !value.is_object() {
            return Err(Error::InvalidPayload(
                "Top-level JSON value must be an object".into(),
            ));
        }

        Ok(Self { bytes })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}
