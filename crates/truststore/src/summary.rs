//! Per-run import statistics.

use crate::validate::Validated;
use serde::Serialize;
use std::collections::BTreeMap;

/// Counts and per-alias outcomes of one import pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub successful_imports: usize,
    pub failed_imports: usize,
    pub total_certificates: usize,
    /// Alias to `SUCCESS` or `FAILED: <reason>`.
    pub results: BTreeMap<String, String>,
}

impl ImportSummary {
    pub fn from_validated(validated: &[Validated<'_>]) -> Self {
        let mut summary = Self::default();
        for v in validated {
            if v.result.is_valid() {
                summary.successful_imports += 1;
            } else {
                summary.failed_imports += 1;
            }
            summary
                .results
                .insert(v.cert.alias().to_string(), v.result.to_string());
        }
        summary.total_certificates = validated.len();
        summary
    }

    /// One-line human summary.
    pub fn headline(&self) -> String {
        format!(
            "Certificate processing completed: {} successful, {} failed",
            self.successful_imports, self.failed_imports
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::certs::CertificateFile;
    use crate::validate::ValidationResult;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_counts_and_results() {
        let a = CertificateFile::new("/certs/a.crt", vec![]);
        let b = CertificateFile::new("/certs/b.crt", vec![]);
        let validated = vec![
            Validated {
                cert: &a,
                result: ValidationResult::Valid,
            },
            Validated {
                cert: &b,
                result: ValidationResult::Invalid("bad encoding".into()),
            },
        ];

        let summary = ImportSummary::from_validated(&validated);
        assert_eq!(summary.successful_imports, 1);
        assert_eq!(summary.failed_imports, 1);
        assert_eq!(summary.total_certificates, 2);
        assert_eq!(summary.results["a"], "SUCCESS");
        assert_eq!(summary.results["b"], "FAILED: bad encoding");
        assert_eq!(
            summary.headline(),
            "Certificate processing completed: 1 successful, 1 failed"
        );
    }

    #[test]
    fn test_unreadable_file_counts_as_failure() {
        let a = CertificateFile::new("/certs/a.crt", crate::testutil::CORP_ROOT.to_vec());
        let error = std::io::Error::from_raw_os_error(5);
        let b = CertificateFile::unreadable("/certs/b.crt", &error);
        let validated: Vec<Validated<'_>> = [&a, &b]
            .into_iter()
            .map(|cert| Validated {
                cert,
                result: crate::validate::validate(cert),
            })
            .collect();

        let summary = ImportSummary::from_validated(&validated);
        assert_eq!(summary.successful_imports, 1);
        assert_eq!(summary.failed_imports, 1);
        assert_eq!(summary.total_certificates, 2);
        assert_eq!(summary.results["a"], "SUCCESS");
        assert!(summary.results["b"].starts_with("FAILED: "));
    }

    #[test]
    fn test_serializes_flat_fields() {
        let summary = ImportSummary {
            successful_imports: 2,
            failed_imports: 0,
            total_certificates: 2,
            results: BTreeMap::new(),
        };
        let value = serde_json::to_value(&summary).unwrap();
        assert_eq!(value["successful_imports"], 2);
        assert_eq!(value["total_certificates"], 2);
        assert!(value["results"].is_object());
    }
}
