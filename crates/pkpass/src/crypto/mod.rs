//! Credentials and manifest signing.
//!
//! - [`credentials`]: PKCS#12 decoding and the optional intermediate certificate
//! - [`signer`]: detached PKCS#7 signatures over `manifest.json`
//! - [`smime`]: decoding of S/MIME envelopes for the compatibility path

pub mod credentials;
pub mod signer;
pub mod smime;

pub use credentials::{CertificateSource, CredentialBundle};
pub use signer::{Signature, SignatureEngine, SignatureFormat};
