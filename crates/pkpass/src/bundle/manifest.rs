//! `manifest.json` generation.
//!
//! The manifest maps every file in the pass bundle (except the manifest and
//! the signature) to the lowercase hex SHA-1 of its content. It is the only
//! thing that gets signed, so any tampering with a bundled file breaks the
//! digest match.

use super::{AssetSet, PayloadDocument, PAYLOAD_ENTRY};
use crate::{Error, Result};
use serde::Serialize;
use sha1::{Digest, Sha1};
use std::collections::BTreeMap;

/// Lowercase hex SHA-1 of `data`.
pub fn sha1_hex(data: &[u8]) -> String {
    let mut hasher = Sha1::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Entry name to content digest map for one pass.
///
/// Serializes as a flat JSON object with keys in sorted order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Manifest {
    digests: BTreeMap<String, String>,
}

impl Manifest {
    /// Digest recorded for `name`.
    pub fn digest(&self, name: &str) -> Option<&str> {
        self.digests.get(name).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.digests.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.digests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.digests.is_empty()
    }

    /// Serialize to the `manifest.json` bytes that get signed and archived.
    pub fn to_json(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }
}

/// Builds a [`Manifest`] from a payload and its assets.
#[derive(Debug, Default, Clone, Copy)]
pub struct ManifestBuilder;

impl ManifestBuilder {
    pub fn new() -> Self {
        Self
    }

    /// Hash the payload and every asset.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingIcon`] before reading any asset if no entry is
    /// named `icon.png` (any case), or [`Error::AssetNotFound`] if a file-backed
    /// asset has disappeared.
    pub fn build(&self, payload: &PayloadDocument, assets: &AssetSet) -> Result<Manifest> {
        if !assets.has_icon() {
            return Err(Error::MissingIcon);
        }

        let mut digests = BTreeMap::new();
        digests.insert(PAYLOAD_ENTRY.to_string(), sha1_hex(payload.as_bytes()));

        for (name, source) in assets.iter() {
            let data = source.read()?;
            digests.insert(name.to_string(), sha1_hex(&data));
        }

        tracing::debug!(entries = digests.len(), "manifest built");

        Ok(Manifest { digests })
    }
}
