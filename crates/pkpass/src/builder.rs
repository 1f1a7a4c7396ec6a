//! PassBuilder API
//!
//! Provides a builder pattern interface for producing signed `.pkpass` archives.
//! One call to [`PassBuilder::build`] runs the whole pipeline inside its own
//! [`Workspace`]:
//!
//! `Start → ManifestBuilt → Signed → Archived → Validated → Done`
//!
//! Any stage may fail; the workspace is removed on every exit path.

use crate::archive::{ArchiveBuilder, CompressionLevel};
use crate::bundle::{AssetSet, ManifestBuilder, PayloadDocument};
use crate::crypto::{CertificateSource, SignatureEngine, SignatureFormat};
use crate::workspace::{Workspace, WorkspaceFile};
use crate::{Error, Result};
use secrecy::SecretString;
use std::fs;
use std::path::{Path, PathBuf};

/// MIME type of a pass archive.
pub const PKPASS_MIME_TYPE: &str = "application/vnd.apple.pkpass";

/// Display name used when none is configured.
pub const DEFAULT_PASS_NAME: &str = "pass.pkpass";

/// Pipeline stages, in order. Any stage before `Done` can move to `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildStage {
    Start,
    ManifestBuilt,
    Signed,
    Archived,
    Validated,
    Done,
    Failed,
}

/// A finished pass archive.
///
/// Besides the bytes, it carries what an HTTP layer needs to serve the pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassArchive {
    name: String,
    bytes: Vec<u8>,
}

impl PassArchive {
    /// Display name, used as the download file name.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Always `application/vnd.apple.pkpass`.
    pub fn content_type(&self) -> &'static str {
        PKPASS_MIME_TYPE
    }

    pub fn content_length(&self) -> usize {
        self.bytes.len()
    }

    /// `Content-Disposition` header value offering the pass as a download.
    pub fn content_disposition(&self) -> String {
        format!("attachment; filename=\"{}\"", self.name.replace('"', "\\\""))
    }

    /// Write the archive bytes to `path`.
    pub fn write_to(&self, path: impl AsRef<Path>) -> Result<()> {
        fs::write(path, &self.bytes)?;
        Ok(())
    }
}

#[derive(Debug, Clone)]
enum PendingAsset {
    Bytes(String, Vec<u8>),
    File(PathBuf),
    Directory(PathBuf),
}

/// Signed pass builder.
///
/// Setters only record configuration; files are read and validated when
/// [`build`](Self::build) runs, and every problem surfaces as its [`Error`].
///
/// # Example
///
/// ```no_run
/// use pkpass::PassBuilder;
///
/// let pass = PassBuilder::new()
///     .certificate("certificate.p12")
///     .password("secret")
///     .intermediate_certificate("AppleWWDRCA.pem")
///     .json(r#"{"formatVersion":1,"passTypeIdentifier":"pass.com.example"}"#)
///     .asset_file("images/icon.png")
///     .asset_file("images/logo.png")
///     .temp_dir("/var/tmp")
///     .build()?;
///
/// assert_eq!(pass.content_type(), "application/vnd.apple.pkpass");
/// # Ok::<(), pkpass::Error>(())
/// ```
#[derive(Clone)]
pub struct PassBuilder {
    certificate: Option<CertificateSource>,
    password: Option<SecretString>,
    intermediate: Option<CertificateSource>,
    payload: Option<Vec<u8>>,
    assets: AssetSet,
    pending_assets: Vec<PendingAsset>,
    temp_dir: PathBuf,
    name: Option<String>,
    compression_level: CompressionLevel,
    signature_format: SignatureFormat,
}

impl PassBuilder {
    /// Create a new builder using the system temporary directory.
    pub fn new() -> Self {
        Self {
            certificate: None,
            password: None,
            intermediate: None,
            payload: None,
            assets: AssetSet::new(),
            pending_assets: Vec::new(),
            temp_dir: std::env::temp_dir(),
            name: None,
            compression_level: CompressionLevel::DEFAULT,
            signature_format: SignatureFormat::Der,
        }
    }

    /// Set the PKCS#12 (.p12) file holding the Pass Type ID certificate and key.
    pub fn certificate(mut self, path: impl AsRef<Path>) -> Self {
        self.certificate = Some(CertificateSource::path(path));
        self
    }

    /// Set the PKCS#12 container from memory.
    pub fn certificate_bytes(mut self, p12: impl Into<Vec<u8>>) -> Self {
        self.certificate = Some(CertificateSource::Bytes(p12.into()));
        self
    }

    /// Set the PKCS#12 password.
    ///
    /// The password is stored securely and will be zeroized when dropped.
    /// Defaults to the empty string.
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(SecretString::new(password.into()));
        self
    }

    /// Set the intermediate certificate file (Apple WWDR), PEM or DER.
    pub fn intermediate_certificate(mut self, path: impl AsRef<Path>) -> Self {
        self.intermediate = Some(CertificateSource::path(path));
        self
    }

    /// Set the intermediate certificate from memory, PEM or DER.
    pub fn intermediate_certificate_bytes(mut self, certificate: impl Into<Vec<u8>>) -> Self {
        self.intermediate = Some(CertificateSource::Bytes(certificate.into()));
        self
    }

    /// Set the `pass.json` content.
    pub fn json(mut self, json: impl Into<Vec<u8>>) -> Self {
        self.payload = Some(json.into());
        self
    }

    /// Add an in-memory asset under `name`.
    pub fn asset(mut self, name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        self.pending_assets
            .push(PendingAsset::Bytes(name.into(), bytes.into()));
        self
    }

    /// Add an asset file under its base name.
    pub fn asset_file(mut self, path: impl AsRef<Path>) -> Self {
        self.pending_assets
            .push(PendingAsset::File(path.as_ref().to_path_buf()));
        self
    }

    /// Add every file below `dir`, named relative to `dir`.
    pub fn asset_directory(mut self, dir: impl AsRef<Path>) -> Self {
        self.pending_assets
            .push(PendingAsset::Directory(dir.as_ref().to_path_buf()));
        self
    }

    /// Replace the base asset set. Assets added individually are applied on top.
    pub fn assets(mut self, assets: AssetSet) -> Self {
        self.assets = assets;
        self
    }

    /// Set the directory under which build workspaces are created.
    pub fn temp_dir(mut self, path: impl AsRef<Path>) -> Self {
        self.temp_dir = path.as_ref().to_path_buf();
        self
    }

    /// Set the display name of the produced pass (default `pass.pkpass`).
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set ZIP compression level (0-9).
    pub fn compression_level(mut self, level: u32) -> Self {
        self.compression_level = CompressionLevel::new(level);
        self
    }

    /// Choose how the signature bytes are obtained.
    pub fn signature_format(mut self, format: SignatureFormat) -> Self {
        self.signature_format = format;
        self
    }

    /// Validate the builder configuration.
    ///
    /// Returns an error if:
    /// - No PKCS#12 container is configured
    /// - No pass JSON is configured
    pub fn validate(&self) -> Result<()> {
        if self.certificate.is_none() {
            return Err(Error::MissingCredentials(
                "Must specify a PKCS#12 certificate".into(),
            ));
        }

        if self.payload.is_none() {
            return Err(Error::InvalidPayload("No pass JSON configured".into()));
        }

        Ok(())
    }

    /// Build the signed pass.
    ///
    /// # Errors
    ///
    /// Returns the first error hit, in pipeline order:
    /// - Configuration: [`Error::MissingCredentials`], [`Error::CertificateNotFound`],
    ///   [`Error::InvalidPayload`], [`Error::AssetNotFound`], [`Error::ReservedEntryName`]
    /// - Manifest: [`Error::MissingIcon`]
    /// - Signing: [`Error::CredentialReadFailure`], [`Error::MissingIntermediateCertificate`],
    ///   [`Error::Signing`]
    /// - Packaging: [`Error::ArchiveCreationFailure`], [`Error::EmptyOutput`]
    pub fn build(&self) -> Result<PassArchive> {
        self.validate()?;

        let payload = self.load_payload()?;
        let assets = self.load_assets()?;
        let container = self.load_container()?;

        let mut workspace = Workspace::acquire(&self.temp_dir)?;
        let mut stage = BuildStage::Start;

        match self.run(&mut workspace, &mut stage, &payload, &assets, &container) {
            Ok(bytes) => {
                workspace.release();
                Ok(PassArchive {
                    name: self
                        .name
                        .clone()
                        .unwrap_or_else(|| DEFAULT_PASS_NAME.to_string()),
                    bytes,
                })
            }
            Err(e) => {
                let completed = stage;
                advance(&mut stage, BuildStage::Failed, &workspace);
                tracing::warn!(
                    ?completed,
                    workspace = workspace.id(),
                    error = %e,
                    "pass build failed"
                );
                Err(e)
            }
        }
    }

    fn run(
        &self,
        workspace: &mut Workspace,
        stage: &mut BuildStage,
        payload: &PayloadDocument,
        assets: &AssetSet,
        container: &[u8],
    ) -> Result<Vec<u8>> {
        let manifest = ManifestBuilder::new().build(payload, assets)?;
        let manifest_json = manifest.to_json()?;
        fs::write(workspace.path(WorkspaceFile::Manifest), &manifest_json)?;
        advance(stage, BuildStage::ManifestBuilt, workspace);

        let default_password = SecretString::new(String::new());
        let password = self.password.as_ref().unwrap_or(&default_password);
        let signature = SignatureEngine::new()
            .format(self.signature_format)
            .sign(&manifest_json, container, password, self.intermediate.as_ref())?;
        fs::write(workspace.path(WorkspaceFile::Signature), signature.as_bytes())?;
        advance(stage, BuildStage::Signed, workspace);

        let archive_path = workspace.path(WorkspaceFile::Archive);
        ArchiveBuilder::new()
            .compression_level(self.compression_level)
            .pack(&archive_path, payload, &manifest_json, &signature, assets)?;
        advance(stage, BuildStage::Archived, workspace);

        validate_archive(&archive_path)?;
        advance(stage, BuildStage::Validated, workspace);

        let bytes = fs::read(&archive_path)?;
        advance(stage, BuildStage::Done, workspace);

        Ok(bytes)
    }

    fn load_payload(&self) -> Result<PayloadDocument> {
        let json = self
            .payload
            .as_ref()
            .ok_or_else(|| Error::InvalidPayload("No pass JSON configured".into()))?;
        PayloadDocument::new(json.clone())
    }

    /// Base asset set plus everything added through the individual setters,
    /// read into memory once so the manifest and the archive share the bytes.
    fn load_assets(&self) -> Result<AssetSet> {
        let mut assets = self.assets.clone();

        for pending in &self.pending_assets {
            match pending {
                PendingAsset::Bytes(name, bytes) => assets.insert(name.clone(), bytes.clone())?,
                PendingAsset::File(path) => assets.add_file(path)?,
                PendingAsset::Directory(dir) => assets.add_directory(dir)?,
            }
        }

        if !assets.has_icon() {
            return Err(Error::MissingIcon);
        }

        assets.load()
    }

    fn load_container(&self) -> Result<Vec<u8>> {
        let source = self.certificate.as_ref().ok_or_else(|| {
            Error::MissingCredentials("Must specify a PKCS#12 certificate".into())
        })?;

        source.read()
    }
}

impl Default for PassBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Size of the packed archive.
///
/// A missing or zero-byte file is [`Error::EmptyOutput`], whatever the
/// underlying I/O error was.
fn validate_archive(path: &Path) -> Result<u64> {
    match fs::metadata(path) {
        Ok(metadata) if metadata.len() > 0 => Ok(metadata.len()),
        _ => Err(Error::EmptyOutput(path.to_path_buf())),
    }
}

fn advance(stage: &mut BuildStage, next: BuildStage, workspace: &Workspace) {
    tracing::debug!(from = ?*stage, to = ?next, workspace = workspace.id(), "build stage");
    *stage = next;
}
