//! Vardr trust store - custom certificate import and CA bundle assembly.
//!
//! The pieces are used in sequence by the supervisor: [`DigestTracker`]
//! decides whether anything changed since the last import, [`validate_all`]
//! checks every candidate certificate, and [`BundleBuilder`] writes the
//! system anchors plus the valid certificates to the output bundle.

pub mod bundle;
pub mod certs;
pub mod digest;
pub mod lock;
pub mod summary;
pub mod system;
pub mod validate;

#[cfg(test)]
pub(crate) mod testutil;

pub use bundle::BundleBuilder;
pub use certs::{CertificateFile, CertificateSet};
pub use digest::{DigestCheck, DigestTracker, NO_CERTS_DIGEST};
pub use lock::InstanceLock;
pub use summary::ImportSummary;
pub use system::resolve_system_bundle;
pub use validate::{validate, validate_all, Validated, ValidationResult};

/// File extension of importable certificates.
pub const CERT_EXTENSION: &str = "crt";
