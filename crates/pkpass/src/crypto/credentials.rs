//! Signing credentials: PKCS#12 container and intermediate certificate.

use crate::{Error, Result};
use openssl::pkcs12::Pkcs12;
use openssl::pkey::{PKey, Private};
use openssl::x509::X509;
use secrecy::{ExposeSecret, SecretString};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Where certificate material comes from.
///
/// Paths are only read when the build runs, so a builder can be configured
/// before the files exist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CertificateSource {
    /// File on disk.
    Path(PathBuf),
    /// Bytes already in memory.
    Bytes(Vec<u8>),
}

impl CertificateSource {
    pub fn path(path: impl AsRef<Path>) -> Self {
        CertificateSource::Path(path.as_ref().to_path_buf())
    }

    /// Read the material as-is; an existing empty file yields empty bytes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CertificateNotFound`] if the path does not exist.
    pub fn read(&self) -> Result<Vec<u8>> {
        match self {
            CertificateSource::Path(path) => match fs::read(path) {
                Ok(data) => Ok(data),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    Err(Error::CertificateNotFound(path.clone()))
                }
                Err(e) => Err(Error::Io(e)),
            },
            CertificateSource::Bytes(bytes) => Ok(bytes.clone()),
        }
    }

    /// Human-readable origin for error messages.
    pub fn describe(&self) -> String {
        match self {
            CertificateSource::Path(path) => path.display().to_string(),
            CertificateSource::Bytes(_) => "<in-memory certificate>".to_string(),
        }
    }
}

/// Certificate, private key and optional intermediate certificate for one signing call.
///
/// # Security
///
/// Holds the private key. It is dropped as soon as the signature has been
/// produced and is never written to the workspace.
pub struct CredentialBundle {
    /// Pass Type ID certificate.
    pub certificate: X509,

    /// Private key matching [`Self::certificate`].
    pub private_key: PKey<Private>,

    /// Intermediate CA (Apple WWDR) embedded in the signature when present.
    pub intermediate: Option<X509>,
}

impl CredentialBundle {
    /// Decode a PKCS#12 container.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CredentialReadFailure`] if:
    /// - The data is not a PKCS#12 container
    /// - The password is incorrect
    /// - The container lacks a certificate or a private key
    /// - The private key does not match the certificate
    pub fn from_p12(p12_data: &[u8], password: &SecretString) -> Result<Self> {
        let pkcs12 = Pkcs12::from_der(p12_data)
            .map_err(|e| Error::CredentialReadFailure(format!("Invalid PKCS#12: {}", e)))?;

        let parsed = pkcs12
            .parse2(password.expose_secret())
            .map_err(|e| Error::CredentialReadFailure(format!("Failed to parse PKCS#12: {}", e)))?;

        let certificate = parsed
            .cert
            .ok_or_else(|| Error::CredentialReadFailure("No certificate in PKCS#12".into()))?;

        let private_key = parsed
            .pkey
            .ok_or_else(|| Error::CredentialReadFailure("No private key in PKCS#12".into()))?;

        Self::validate_key_pair(&certificate, &private_key)?;

        Ok(Self {
            certificate,
            private_key,
            intermediate: None,
        })
    }

    /// Attach the intermediate certificate, PEM or DER encoded.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingIntermediateCertificate`] if the file does not
    /// exist or the material is empty, or [`Error::CredentialReadFailure`] if it
    /// cannot be parsed.
    pub fn with_intermediate(mut self, source: &CertificateSource) -> Result<Self> {
        let data = match source.read() {
            Ok(data) if !data.is_empty() => data,
            Ok(_) | Err(Error::CertificateNotFound(_)) => {
                return Err(Error::MissingIntermediateCertificate(source.describe()))
            }
            Err(e) => return Err(e),
        };

        let certificate = X509::from_pem(&data)
            .or_else(|_| X509::from_der(&data))
            .map_err(|e| {
                Error::CredentialReadFailure(format!(
                    "Failed to load intermediate certificate {}: {}",
                    source.describe(),
                    e
                ))
            })?;

        self.intermediate = Some(certificate);
        Ok(self)
    }

    /// Validate that the private key matches the certificate's public key
    fn validate_key_pair(cert: &X509, private_key: &PKey<Private>) -> Result<()> {
        let cert_public_key = cert.public_key().map_err(|e| {
            Error::CredentialReadFailure(format!(
                "Failed to extract public key from certificate: {}",
                e
            ))
        })?;

        if !private_key.public_eq(&cert_public_key) {
            return Err(Error::CredentialReadFailure(
                "Private key does not match certificate public key".into(),
            ));
        }

        Ok(())
    }
}
