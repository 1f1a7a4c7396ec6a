//! Pass bundle contents.
//!
//! This module provides:
//! - [`PayloadDocument`]: the validated `pass.json` bytes
//! - [`AssetSet`]: images and localized resources keyed by entry name
//! - [`ManifestBuilder`] / [`Manifest`]: SHA-1 digests of everything above
//!
//! # Bundle Layout
//!
//! | Entry | Written by |
//! |-------|------------|
//! | `pass.json` | [`PayloadDocument`] |
//! | `manifest.json` | [`Manifest::to_json`] |
//! | `signature` | [`crate::crypto::SignatureEngine`] |
//! | everything else | [`AssetSet`] |
//!
//! # Examples
//!
//! ```
//! use pkpass::bundle::{AssetSet, ManifestBuilder, PayloadDocument};
//!
//! let payload = PayloadDocument::new(r#"{"formatVersion":1}"#)?;
//! let mut assets = AssetSet::new();
//! assets.insert("icon.png", vec![0u8; 100])?;
//!
//! let manifest = ManifestBuilder::new().build(&payload, &assets)?;
//! assert_eq!(manifest.len(), 2);
//! # Ok::<(), pkpass::Error>(())
//! ```

pub mod assets;
pub mod manifest;
pub mod payload;

pub use assets::{AssetSet, AssetSource};
pub use manifest::{sha1_hex, Manifest, ManifestBuilder};
pub use payload::PayloadDocument;

/// Entry name of the pass payload.
pub const PAYLOAD_ENTRY: &str = "pass.json";

/// Entry name of the digest manifest.
pub const MANIFEST_ENTRY: &str = "manifest.json";

/// Entry name of the detached signature.
pub const SIGNATURE_ENTRY: &str = "signature";

/// Asset every pass must carry, compared case-insensitively.
pub const ICON_ENTRY: &str = "icon.png";

/// Returns true if `name` is written by the builder rather than taken from assets.
pub fn is_reserved_entry(name: &str) -> bool {
    matches!(name, PAYLOAD_ENTRY | MANIFEST_ENTRY | SIGNATURE_ENTRY)
}
