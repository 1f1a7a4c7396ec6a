//! Error types for pass building.
//!
//! This module defines the [`enum@Error`] enum covering every failure a build
//! can hit, from missing inputs and bad credentials to packaging problems.
//!
//! # See Also
//!
//! - [`crate::Result`] - Convenience type alias using this error

use std::path::PathBuf;
use thiserror::Error;

/// Error type for pass building.
///
/// All public functions in this crate return [`crate::Result<T>`], which uses this error type.
/// Each pipeline stage fails fast with one of these variants; nothing is retried.
///
/// # Examples
///
/// ```no_run
/// use pkpass::{Error, PassBuilder};
///
/// let result = PassBuilder::new()
///     .certificate("certificate.p12")
///     .password("secret")
///     .json(r#"{"formatVersion":1}"#)
///     .asset_file("icon.png")
///     .build();
/// match result {
///     Ok(pass) => println!("{} bytes", pass.content_length()),
///     Err(Error::MissingIcon) => eprintln!("icon.png is required"),
///     Err(Error::CredentialReadFailure(msg)) => eprintln!("bad credentials: {msg}"),
///     Err(e) => eprintln!("Other error: {e}"),
/// }
/// ```
#[derive(Debug, Error)]
pub enum Error {
    /// I/O operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The configured credential container path does not exist.
    #[error("Certificate file does not exist: {}", .0.display())]
    CertificateNotFound(PathBuf),

    /// The pass payload is not a JSON object.
    #[error("Invalid pass payload: {0}")]
    InvalidPayload(String),

    /// An asset file does not exist or is not a regular file.
    #[error("Asset file does not exist: {}", .0.display())]
    AssetNotFound(PathBuf),

    /// No asset is named `icon.png` (case-insensitive).
    #[error("Missing required icon.png file")]
    MissingIcon,

    /// An asset tried to use a name reserved for the pass structure.
    ///
    /// `pass.json`, `manifest.json` and `signature` are written by the builder itself.
    #[error("Asset name is reserved: {0}")]
    ReservedEntryName(String),

    /// The PKCS#12 container could not be decoded.
    ///
    /// Wrong password, malformed container, missing key or certificate,
    /// or a key that does not match the certificate.
    #[error("Could not read the certificate: {0}")]
    CredentialReadFailure(String),

    /// An intermediate certificate was configured but its material is absent.
    #[error("Intermediate certificate does not exist: {0}")]
    MissingIntermediateCertificate(String),

    /// Required credentials not configured.
    ///
    /// Building was attempted without calling [`crate::PassBuilder::certificate`]
    /// or [`crate::PassBuilder::certificate_bytes`].
    #[error("Missing credentials: {0}")]
    MissingCredentials(String),

    /// Producing or normalizing the signature failed.
    #[error("Signing failed: {0}")]
    Signing(String),

    /// The archive could not be opened for writing or an entry could not be added.
    #[error("Could not create pass archive: {0}")]
    ArchiveCreationFailure(String),

    /// Packaging reported success but the archive is missing or zero bytes long.
    #[error("Pass archive is missing or empty: {}", .0.display())]
    EmptyOutput(PathBuf),

    /// Invalid builder configuration.
    #[error("Configuration error: {0}")]
    Config(String),
}
