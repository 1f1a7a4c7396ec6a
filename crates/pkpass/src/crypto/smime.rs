//! Recover the DER signature from an S/MIME detached-signature envelope.
//!
//! OpenSSL's S/MIME writer emits `multipart/signed` text whose last part is
//! the base64-encoded PKCS#7 blob:
//!
//! ```text
//! ------3C5F0B1A...
//! Content-Type: application/x-pkcs7-signature; name="smime.p7s"
//! Content-Transfer-Encoding: base64
//! Content-Disposition: attachment; filename="smime.p7s"
//!
//! MIIG...
//!
//! ------3C5F0B1A...--
//! ```
//!
//! Extraction relies on those exact markers. It only backs
//! [`SignatureFormat::SmimeEnvelope`](super::SignatureFormat::SmimeEnvelope);
//! the default path takes DER straight from OpenSSL.

use crate::{Error, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;

/// Introduces the signature attachment.
pub const ATTACHMENT_MARKER: &str = "filename=\"smime.p7s\"";

/// Prefix of every boundary line OpenSSL writes.
pub const BOUNDARY_MARKER: &str = "------";

/// Extract and decode the signature attachment of an S/MIME envelope.
///
/// Takes the text after the last [`ATTACHMENT_MARKER`] up to the next
/// [`BOUNDARY_MARKER`], drops whitespace and line breaks, and base64-decodes it.
/// The last marker is used so signed content can never shadow the header.
///
/// # Errors
///
/// Returns [`Error::Signing`] if either marker is missing, the attachment is
/// empty, or its body is not valid base64.
pub fn extract_signature(envelope: &[u8]) -> Result<Vec<u8>> {
    let text = String::from_utf8_lossy(envelope);

    let start = text
        .rfind(ATTACHMENT_MARKER)
        .map(|pos| pos + ATTACHMENT_MARKER.len())
        .ok_or_else(|| Error::Signing("S/MIME envelope has no smime.p7s attachment".into()))?;

    let rest = &text[start..];
    let end = rest
        .find(BOUNDARY_MARKER)
        .ok_or_else(|| Error::Signing("S/MIME envelope attachment is not terminated".into()))?;

    let body: String = rest[..end]
        .trim()
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();

    if body.is_empty() {
        return Err(Error::Signing("S/MIME envelope attachment is empty".into()));
    }

    STANDARD
        .decode(body.as_bytes())
        .map_err(|e| Error::Signing(format!("Invalid base64 in S/MIME attachment: {}", e)))
}
