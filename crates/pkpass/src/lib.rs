//! Build signed Apple Wallet pass bundles (`.pkpass`).
//!
//! A pass bundle is a zip archive holding a `pass.json` payload, its image
//! assets, a `manifest.json` of SHA-1 digests for every file, and a detached
//! PKCS#7 `signature` over the manifest.
//!
//! The pipeline lives in four modules, driven by [`PassBuilder`]:
//!
//! - [`bundle`]: payload validation, asset collection and the manifest
//! - [`crypto`]: PKCS#12 credentials and manifest signing
//! - [`archive`]: zip packaging
//! - [`workspace`]: per-build temporary directory
//!
//! # Examples
//!
//! ```no_run
//! use pkpass::PassBuilder;
//!
//! let pass = PassBuilder::new()
//!     .certificate("certificate.p12")
//!     .password("secret")
//!     .intermediate_certificate("AppleWWDRCA.pem")
//!     .json(std::fs::read("pass.json")?)
//!     .asset_file("icon.png")
//!     .name("ticket.pkpass")
//!     .build()?;
//!
//! pass.write_to("ticket.pkpass")?;
//! # Ok::<(), pkpass::Error>(())
//! ```

pub mod archive;
pub mod builder;
pub mod bundle;
pub mod crypto;
pub mod error;
pub mod workspace;

pub use archive::{ArchiveBuilder, CompressionLevel};
pub use builder::{BuildStage, PassArchive, PassBuilder};
pub use bundle::{AssetSet, Manifest, ManifestBuilder, PayloadDocument};
pub use crypto::{CertificateSource, CredentialBundle, Signature, SignatureEngine, SignatureFormat};
pub use error::Error;
pub use workspace::{Workspace, WorkspaceFile};

pub type Result<T> = std::result::Result<T, Error>;
