//! Pass archive creation.
//!
//! Writes the `.pkpass` zip: `signature`, `manifest.json`, `pass.json`, then
//! every asset in sorted name order. Entries carry a fixed timestamp so the
//! same inputs always produce the same archive bytes.
//!
//! # Examples
//!
//! ```no_run
//! use pkpass::archive::{ArchiveBuilder, CompressionLevel};
//! # fn demo(
//! #     payload: &pkpass::PayloadDocument,
//! #     manifest_json: &[u8],
//! #     signature: &pkpass::Signature,
//! #     assets: &pkpass::AssetSet,
//! # ) -> pkpass::Result<()> {
//! ArchiveBuilder::new()
//!     .compression_level(CompressionLevel::new(9))
//!     .pack("pass.pkpass", payload, manifest_json, signature, assets)?;
//! # Ok(())
//! # }
//! ```

use crate::bundle::{AssetSet, PayloadDocument, MANIFEST_ENTRY, PAYLOAD_ENTRY, SIGNATURE_ENTRY};
use crate::crypto::Signature;
use crate::{Error, Result};
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipWriter};

/// Deflate level applied to every archive entry.
///
/// `0` stores entries uncompressed; `1`-`9` deflate them. Passes are small and
/// mostly PNG data, so the level mainly trades CPU for a few bytes.
///
/// ```
/// use pkpass::archive::CompressionLevel;
///
/// assert_eq!(CompressionLevel::new(12), CompressionLevel::new(9));
/// assert_eq!(CompressionLevel::default(), CompressionLevel::DEFAULT);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompressionLevel(u32);

impl CompressionLevel {
    /// Entries stored as-is.
    pub const STORED: CompressionLevel = CompressionLevel(0);

    /// Deflate level 6, the `-z` default of the CLI.
    pub const DEFAULT: CompressionLevel = CompressionLevel(6);

    /// Clamped to 9.
    #[must_use]
    pub fn new(level: u32) -> Self {
        CompressionLevel(level.min(9))
    }

    #[must_use]
    pub fn level(&self) -> u32 {
        self.0
    }

    /// Per-entry zip options. The timestamp is pinned so output is reproducible.
    fn file_options(&self) -> SimpleFileOptions {
        let options = SimpleFileOptions::default().last_modified_time(DateTime::default());

        if self.0 == 0 {
            options.compression_method(CompressionMethod::Stored)
        } else {
            options
                .compression_method(CompressionMethod::Deflated)
                .compression_level(Some(self.0 as i64))
        }
    }
}

impl Default for CompressionLevel {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Packs pass contents into a zip archive.
#[derive(Debug, Clone, Copy, Default)]
pub struct ArchiveBuilder {
    compression_level: CompressionLevel,
}

impl ArchiveBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn compression_level(mut self, level: CompressionLevel) -> Self {
        self.compression_level = level;
        self
    }

    /// Write the archive to `output_path`.
    ///
    /// `manifest_json` must be the exact bytes that were signed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ArchiveCreationFailure`] if the file cannot be created
    /// or any entry cannot be written. The partial file is removed first.
    pub fn pack(
        &self,
        output_path: impl AsRef<Path>,
        payload: &PayloadDocument,
        manifest_json: &[u8],
        signature: &Signature,
        assets: &AssetSet,
    ) -> Result<()> {
        let output_path = output_path.as_ref();

        let result = self.write_archive(output_path, payload, manifest_json, signature, assets);

        if let Err(ref e) = result {
            if output_path.exists() {
                if let Err(remove_err) = fs::remove_file(output_path) {
                    tracing::warn!(
                        path = %output_path.display(),
                        error = %remove_err,
                        "failed to remove partial archive"
                    );
                }
            }
            tracing::debug!(error = %e, "archive creation failed");
        }

        result
    }

    fn write_archive(
        &self,
        output_path: &Path,
        payload: &PayloadDocument,
        manifest_json: &[u8],
        signature: &Signature,
        assets: &AssetSet,
    ) -> Result<()> {
        let file = File::create(output_path).map_err(|e| {
            Error::ArchiveCreationFailure(format!(
                "Could not open {} for writing: {}",
                output_path.display(),
                e
            ))
        })?;
        let mut zip = ZipWriter::new(file);
        let options = self.compression_level.file_options();

        let reserved: [(&str, &[u8]); 3] = [
            (SIGNATURE_ENTRY, signature.as_bytes()),
            (MANIFEST_ENTRY, manifest_json),
            (PAYLOAD_ENTRY, payload.as_bytes()),
        ];

        for (name, data) in reserved {
            add_entry(&mut zip, name, data, options)?;
        }

        for (name, source) in assets.iter() {
            let data = source.read()?;
            add_entry(&mut zip, name, &data, options)?;
        }

        zip.finish()
            .map_err(|e| Error::ArchiveCreationFailure(format!("Failed to finalize archive: {}", e)))?;

        Ok(())
    }
}

fn add_entry(
    zip: &mut ZipWriter<File>,
    name: &str,
    data: &[u8],
    options: SimpleFileOptions,
) -> Result<()> {
    zip.start_file(name, options)
        .map_err(|e| Error::ArchiveCreationFailure(format!("Could not add {}: {}", name, e)))?;
    zip.write_all(data)
        .map_err(|e| Error::ArchiveCreationFailure(format!("Could not write {}: {}", name, e)))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundle::{sha1_hex, ManifestBuilder};
    use std::io::Read;
    use tempfile::TempDir;
    use zip::ZipArchive;

    struct Contents {
        payload: PayloadDocument,
        manifest_json: Vec<u8>,
        signature: Signature,
        assets: AssetSet,
    }

    fn contents() -> Contents {
        let payload = PayloadDocument::new(r#"{"formatVersion":1}"#).unwrap();
        let mut assets = AssetSet::new();
        assets.insert("icon.png", vec![1u8; 100]).unwrap();
        assets.insert("en.lproj/pass.strings", b"\"k\" = \"v\";".to_vec()).unwrap();
        let manifest_json = ManifestBuilder::new()
            .build(&payload, &assets)
            .unwrap()
            .to_json()
            .unwrap();

        Contents {
            payload,
            manifest_json,
            signature: Signature::from(vec![0x30, 0x80, 0x01, 0x02]),
            assets,
        }
    }

    fn read_entry(archive: &mut ZipArchive<File>, name: &str) -> Vec<u8> {
        let mut entry = archive.by_name(name).unwrap();
        let mut buf = Vec::new();
        entry.read_to_end(&mut buf).unwrap();
        buf
    }

    #[test]
    fn test_pack_entries_in_order() {
        let temp_dir = TempDir::new().unwrap();
        let output = temp_dir.path().join("pass.pkpass");
        let c = contents();

        ArchiveBuilder::new()
            .pack(&output, &c.payload, &c.manifest_json, &c.signature, &c.assets)
            .unwrap();

        let mut archive = ZipArchive::new(File::open(&output).unwrap()).unwrap();
        let names: Vec<String> = (0..archive.len())
            .map(|i| archive.by_index(i).unwrap().name().to_string())
            .collect();
        assert_eq!(
            names,
            vec![
                "signature",
                "manifest.json",
                "pass.json",
                "en.lproj/pass.strings",
                "icon.png"
            ]
        );

        assert_eq!(read_entry(&mut archive, "signature"), vec![0x30, 0x80, 0x01, 0x02]);
        assert_eq!(read_entry(&mut archive, "manifest.json"), c.manifest_json);
        assert_eq!(read_entry(&mut archive, "pass.json"), c.payload.as_bytes());
        assert_eq!(read_entry(&mut archive, "icon.png"), vec![1u8; 100]);
    }

    #[test]
    fn test_pack_is_deterministic() {
        let temp_dir = TempDir::new().unwrap();
        let first = temp_dir.path().join("first.pkpass");
        let second = temp_dir.path().join("second.pkpass");
        let c = contents();

        let builder = ArchiveBuilder::new();
        builder
            .pack(&first, &c.payload, &c.manifest_json, &c.signature, &c.assets)
            .unwrap();
        builder
            .pack(&second, &c.payload, &c.manifest_json, &c.signature, &c.assets)
            .unwrap();

        assert_eq!(fs::read(first).unwrap(), fs::read(second).unwrap());
    }

    #[test]
    fn test_pack_no_compression() {
        let temp_dir = TempDir::new().unwrap();
        let output = temp_dir.path().join("stored.pkpass");
        let c = contents();

        ArchiveBuilder::new()
            .compression_level(CompressionLevel::STORED)
            .pack(&output, &c.payload, &c.manifest_json, &c.signature, &c.assets)
            .unwrap();

        let mut archive = ZipArchive::new(File::open(&output).unwrap()).unwrap();
        let entry = archive.by_name("icon.png").unwrap();
        assert_eq!(entry.compression(), CompressionMethod::Stored);
    }

    #[test]
    fn test_pack_unwritable_output() {
        let c = contents();
        let result = ArchiveBuilder::new().pack(
            "/nonexistent/dir/pass.pkpass",
            &c.payload,
            &c.manifest_json,
            &c.signature,
            &c.assets,
        );
        assert!(matches!(result, Err(Error::ArchiveCreationFailure(_))));
    }

    #[test]
    fn test_pack_removes_partial_archive() {
        let temp_dir = TempDir::new().unwrap();
        let output = temp_dir.path().join("pass.pkpass");
        let mut c = contents();
        c.assets
            .insert_file("strip.png", temp_dir.path().join("missing.png"))
            .unwrap();

        let result = ArchiveBuilder::new().pack(
            &output,
            &c.payload,
            &c.manifest_json,
            &c.signature,
            &c.assets,
        );
        assert!(matches!(result, Err(Error::AssetNotFound(_))));
        assert!(!output.exists());
    }

    #[test]
    fn test_compression_level() {
        assert_eq!(CompressionLevel::STORED.level(), 0);
        assert_eq!(CompressionLevel::DEFAULT.level(), 6);
        assert_eq!(CompressionLevel::new(15).level(), 9);
        assert_eq!(CompressionLevel::new(5).level(), 5);
        assert_eq!(CompressionLevel::default(), CompressionLevel::DEFAULT);
    }

    #[test]
    fn test_loaded_assets_match_manifest_after_file_changes() {
        let temp_dir = TempDir::new().unwrap();
        let icon = temp_dir.path().join("icon.png");
        fs::write(&icon, b"v1").unwrap();

        let mut assets = AssetSet::new();
        assets.add_file(&icon).unwrap();
        let assets = assets.load().unwrap();

        let payload = PayloadDocument::new(r#"{"formatVersion":1}"#).unwrap();
        let manifest = ManifestBuilder::new().build(&payload, &assets).unwrap();

        fs::write(&icon, b"v2").unwrap();

        let output = temp_dir.path().join("pass.pkpass");
        ArchiveBuilder::new()
            .pack(
                &output,
                &payload,
                &manifest.to_json().unwrap(),
                &Signature::from(vec![0x30]),
                &assets,
            )
            .unwrap();

        let mut archive = ZipArchive::new(File::open(&output).unwrap()).unwrap();
        let archived = read_entry(&mut archive, "icon.png");
        assert_eq!(archived, b"v1");
        assert_eq!(manifest.digest("icon.png"), Some(sha1_hex(&archived).as_str()));
    }
}
