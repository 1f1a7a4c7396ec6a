//! Pass assets: images and localized resources.

use super::{is_reserved_entry, ICON_ENTRY};
use crate::{Error, Result};
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Where an asset's bytes come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetSource {
    /// Bytes held in memory.
    Bytes(Vec<u8>),
    /// File read when the asset is hashed and again when it is archived.
    File(PathBuf),
}

impl AssetSource {
    /// Read the asset content.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AssetNotFound`] if a file-backed asset no longer exists.
    pub fn read(&self) -> Result<Cow<'_, [u8]>> {
        match self {
            AssetSource::Bytes(bytes) => Ok(Cow::Borrowed(bytes)),
            AssetSource::File(path) => match fs::read(path) {
                Ok(data) => Ok(Cow::Owned(data)),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    Err(Error::AssetNotFound(path.clone()))
                }
                Err(e) => Err(Error::Io(e)),
            },
        }
    }
}

/// Assets of a pass, keyed by their entry name inside the bundle.
///
/// Entry names use `/` as separator (`en.lproj/pass.strings`) and are kept
/// in sorted order, so iteration and packaging are deterministic. Adding an
/// asset under an existing name replaces it.
///
/// # Examples
///
/// ```no_run
/// use pkpass::bundle::AssetSet;
///
/// let mut assets = AssetSet::new();
/// assets.add_file("resources/icon.png")?;
/// assets.add_directory("resources/localized")?;
/// assets.insert("logo.png", std::fs::read("logo.png")?)?;
/// assert!(assets.has_icon());
/// # Ok::<(), pkpass::Error>(())
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssetSet {
    entries: BTreeMap<String, AssetSource>,
}

impl AssetSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add in-memory content under `name`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ReservedEntryName`] for `pass.json`, `manifest.json` or `signature`.
    pub fn insert(&mut self, name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Result<()> {
        let name = normalize_name(name.into())?;
        self.entries.insert(name, AssetSource::Bytes(bytes.into()));
        Ok(())
    }

    /// Add a file under an explicit entry name.
    ///
    /// The file is not touched until the asset is hashed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ReservedEntryName`] for reserved names.
    pub fn insert_file(&mut self, name: impl Into<String>, path: impl AsRef<Path>) -> Result<()> {
        let name = normalize_name(name.into())?;
        self.entries
            .insert(name, AssetSource::File(path.as_ref().to_path_buf()));
        Ok(())
    }

    /// Add a file under its base name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AssetNotFound`] if `path` is not an existing regular file,
    /// or [`Error::ReservedEntryName`] if its base name is reserved.
    pub fn add_file(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        if !path.is_file() {
            return Err(Error::AssetNotFound(path.to_path_buf()));
        }

        let name = path
            .file_name()
            .ok_or_else(|| Error::AssetNotFound(path.to_path_buf()))?
            .to_string_lossy()
            .into_owned();

        self.insert_file(name, path)
    }

    /// Add every regular file below `dir`, named by its path relative to `dir`.
    ///
    /// Symlinks are not followed and `.DS_Store` files are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AssetNotFound`] if `dir` is not a directory, or an I/O
    /// error if walking it fails.
    pub fn add_directory(&mut self, dir: impl AsRef<Path>) -> Result<()> {
        let dir = dir.as_ref();

        if !dir.is_dir() {
            return Err(Error::AssetNotFound(dir.to_path_buf()));
        }

        for entry in WalkDir::new(dir).follow_links(false).sort_by_file_name() {
            let entry = entry.map_err(|e| {
                Error::Io(io::Error::other(format!("Failed to walk directory: {}", e)))
            })?;

            if !entry.file_type().is_file() || entry.file_name() == ".DS_Store" {
                continue;
            }

            let relative = entry.path().strip_prefix(dir).map_err(|_| {
                Error::Io(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    "Failed to compute relative path",
                ))
            })?;

            let name = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");

            self.insert_file(name, entry.path())?;
        }

        Ok(())
    }

    /// Whether some entry is named `icon.png`, ignoring case.
    pub fn has_icon(&self) -> bool {
        self.entries
            .keys()
            .any(|name| name.eq_ignore_ascii_case(ICON_ENTRY))
    }

    /// Read every file-backed asset into memory.
    ///
    /// The returned set holds only [`AssetSource::Bytes`], so hashing and
    /// packaging it see the same content even if the files change on disk.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AssetNotFound`] if an asset file has disappeared.
    pub fn load(&self) -> Result<AssetSet> {
        let mut entries = BTreeMap::new();

        for (name, source) in &self.entries {
            let data = source.read()?.into_owned();
            entries.insert(name.clone(), AssetSource::Bytes(data));
        }

        Ok(AssetSet { entries })
    }

    pub fn get(&self, name: &str) -> Option<&AssetSource> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Entries in sorted name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &AssetSource)> {
        self.entries.iter().map(|(name, source)| (name.as_str(), source))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn normalize_name(name: String) -> Result<String> {
    let name = name.replace('\\', "/");
    let name = name.trim_start_matches('/');

    if name.is_empty() || name.ends_with('/') {
        return Err(Error::Config(format!("Invalid asset name: {:?}", name)));
    }
    if is_reserved_entry(name) {
        return Err(Error::ReservedEntryName(name.to_string()));
    }

    Ok(name.to_string())
}
