//! Structural validation of candidate certificates.

use crate::certs::{CertificateFile, CertificateSet};
use openssl::x509::store::X509StoreBuilder;
use openssl::x509::X509;
use std::fmt;
use vardr_common::Logger;

/// Outcome of validating one certificate file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationResult {
    Valid,
    Invalid(String),
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationResult::Valid)
    }
}

impl fmt::Display for ValidationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationResult::Valid => write!(f, "SUCCESS"),
            ValidationResult::Invalid(reason) => write!(f, "FAILED: {}", reason),
        }
    }
}

/// Check that a file holds PEM X.509 data a trust store accepts.
///
/// Every certificate in the file is parsed and added to a throwaway
/// trust store. No chain building or revocation checks are done.
pub fn validate(cert: &CertificateFile) -> ValidationResult {
    if let Some(error) = cert.read_error() {
        return ValidationResult::Invalid(error.to_string());
    }
    match load_into_trust_store(cert.content()) {
        Ok(()) => ValidationResult::Valid,
        Err(reason) => ValidationResult::Invalid(reason),
    }
}

fn load_into_trust_store(pem: &[u8]) -> Result<(), String> {
    let certs = X509::stack_from_pem(pem).map_err(|e| e.to_string())?;
    if certs.is_empty() {
        return Err("no certificate found in PEM data".to_string());
    }

    let mut store = X509StoreBuilder::new().map_err(|e| e.to_string())?;
    for cert in certs {
        store.add_cert(cert).map_err(|e| e.to_string())?;
    }
    Ok(())
}

/// A certificate paired with its validation outcome.
#[derive(Debug, Clone)]
pub struct Validated<'a> {
    pub cert: &'a CertificateFile,
    pub result: ValidationResult,
}

/// Validate every certificate in the set, in order.
///
/// An invalid certificate is reported and kept in the output with its
/// reason; it never stops the remaining ones from being checked.
pub fn validate_all<'a>(set: &'a CertificateSet, log: &Logger) -> Vec<Validated<'a>> {
    set.files()
        .iter()
        .map(|cert| {
            log.info(format!(
                "Processing {} from {}",
                cert.alias(),
                cert.file_name()
            ));
            let result = validate(cert);
            match &result {
                ValidationResult::Valid => {
                    log.info(format!("Successfully validated {}", cert.alias()));
                }
                ValidationResult::Invalid(reason) => {
                    log.warn(format!("Could not validate {}: {}", cert.alias(), reason));
                }
            }
            Validated { cert, result }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{self, CORP_ROOT, MALFORMED, PARTNER_CA, SYSTEM_BUNDLE};
    use tempfile::tempdir;

    fn file(name: &str, content: &[u8]) -> CertificateFile {
        CertificateFile::new(format!("/certs/{}", name), content.to_vec())
    }

    #[test]
    fn test_valid_certificate() {
        assert_eq!(validate(&file("corp-root.crt", CORP_ROOT)), ValidationResult::Valid);
    }

    #[test]
    fn test_multi_certificate_pem_is_valid() {
        assert!(validate(&file("bundle.crt", SYSTEM_BUNDLE)).is_valid());
    }

    #[test]
    fn test_garbage_is_invalid() {
        let result = validate(&file("junk.crt", b"this is not a certificate"));
        assert!(!result.is_valid());
    }

    #[test]
    fn test_bad_base64_body_is_invalid() {
        let result = validate(&file("broken.crt", MALFORMED));
        assert!(matches!(result, ValidationResult::Invalid(_)));
    }

    #[test]
    fn test_empty_file_is_invalid() {
        match validate(&file("empty.crt", b"")) {
            ValidationResult::Invalid(reason) => assert!(!reason.is_empty()),
            ValidationResult::Valid => panic!("empty file accepted"),
        }
    }

    #[test]
    fn test_unreadable_file_is_invalid() {
        let error = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "permission denied");
        let cert = CertificateFile::unreadable("/certs/locked.crt", &error);
        assert_eq!(
            validate(&cert),
            ValidationResult::Invalid("permission denied".to_string())
        );
    }

    #[test]
    fn test_display_matches_summary_format() {
        assert_eq!(ValidationResult::Valid.to_string(), "SUCCESS");
        assert_eq!(
            ValidationResult::Invalid("bad".into()).to_string(),
            "FAILED: bad"
        );
    }

    #[test]
    fn test_one_bad_file_does_not_block_others() {
        let dir = tempdir().unwrap();
        let certs = testutil::write_certs(
            dir.path(),
            &[("a.crt", CORP_ROOT), ("b.crt", MALFORMED), ("c.crt", PARTNER_CA)],
        );
        let set = CertificateSet::load(&certs, &Logger::discard());
        let results = validate_all(&set, &Logger::discard());

        let outcome: Vec<(&str, bool)> = results
            .iter()
            .map(|v| (v.cert.alias(), v.result.is_valid()))
            .collect();
        assert_eq!(outcome, vec![("a", true), ("b", false), ("c", true)]);
    }
}
