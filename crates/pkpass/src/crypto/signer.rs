//! Detached PKCS#7 signing of `manifest.json`.

use super::credentials::{CertificateSource, CredentialBundle};
use super::smime;
use crate::{Error, Result};
use openssl::pkcs7::{Pkcs7, Pkcs7Flags};
use openssl::stack::Stack;
use openssl::x509::X509;
use secrecy::SecretString;

/// How the engine obtains DER bytes from OpenSSL.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SignatureFormat {
    /// Serialize the PKCS#7 structure to DER directly.
    #[default]
    Der,
    /// Write an S/MIME envelope and decode the `smime.p7s` attachment.
    ///
    /// Compatibility path for signers that can only produce S/MIME output.
    SmimeEnvelope,
}

/// Raw DER bytes of a detached PKCS#7 signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature(Vec<u8>);

impl Signature {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<u8>> for Signature {
    fn from(der: Vec<u8>) -> Self {
        Signature(der)
    }
}

impl AsRef<[u8]> for Signature {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Signs manifest bytes with a Pass Type ID certificate.
///
/// # Examples
///
/// ```no_run
/// use pkpass::crypto::{CertificateSource, SignatureEngine};
/// use secrecy::SecretString;
///
/// let p12 = std::fs::read("certificate.p12")?;
/// let wwdr = CertificateSource::path("AppleWWDRCA.pem");
/// let signature = SignatureEngine::new().sign(
///     br#"{"pass.json":"..."}"#,
///     &p12,
///     &SecretString::new("secret".to_string()),
///     Some(&wwdr),
/// )?;
/// println!("{} signature bytes", signature.len());
/// # Ok::<(), pkpass::Error>(())
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct SignatureEngine {
    format: SignatureFormat,
}

impl SignatureEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn format(mut self, format: SignatureFormat) -> Self {
        self.format = format;
        self
    }

    /// Decode the credentials and sign `manifest`.
    ///
    /// The container is decoded first, then the intermediate certificate is
    /// resolved, and only then is anything signed.
    ///
    /// # Errors
    ///
    /// - [`Error::CredentialReadFailure`] if the container or password is bad
    /// - [`Error::MissingIntermediateCertificate`] if `intermediate` is absent
    /// - [`Error::Signing`] if OpenSSL fails or the envelope cannot be decoded
    pub fn sign(
        &self,
        manifest: &[u8],
        container: &[u8],
        password: &SecretString,
        intermediate: Option<&CertificateSource>,
    ) -> Result<Signature> {
        let mut credentials = CredentialBundle::from_p12(container, password)?;

        if let Some(source) = intermediate {
            credentials = credentials.with_intermediate(source)?;
        }

        self.sign_with(manifest, &credentials)
    }

    /// Sign `manifest` with already decoded credentials.
    pub fn sign_with(&self, manifest: &[u8], credentials: &CredentialBundle) -> Result<Signature> {
        let mut extra_certs = Stack::<X509>::new()
            .map_err(|e| Error::Signing(format!("Failed to allocate certificate stack: {}", e)))?;

        if let Some(ref intermediate) = credentials.intermediate {
            extra_certs
                .push(intermediate.clone())
                .map_err(|e| Error::Signing(format!("Failed to add intermediate certificate: {}", e)))?;
        }

        let flags = Pkcs7Flags::BINARY | Pkcs7Flags::DETACHED;

        let pkcs7 = Pkcs7::sign(
            &credentials.certificate,
            &credentials.private_key,
            &extra_certs,
            manifest,
            flags,
        )
        .map_err(|e| Error::Signing(format!("Failed to sign manifest: {}", e)))?;

        let der = match self.format {
            SignatureFormat::Der => pkcs7
                .to_der()
                .map_err(|e| Error::Signing(format!("Failed to encode signature: {}", e)))?,
            SignatureFormat::SmimeEnvelope => {
                let envelope = pkcs7
                    .to_smime(manifest, flags)
                    .map_err(|e| Error::Signing(format!("Failed to write S/MIME envelope: {}", e)))?;
                smime::extract_signature(&envelope)?
            }
        };

        tracing::debug!(format = ?self.format, bytes = der.len(), "manifest signed");

        Ok(Signature(der))
    }
}
