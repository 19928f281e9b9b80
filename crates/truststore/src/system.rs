//! Location of the platform's default CA bundle.

use std::path::{Path, PathBuf};
use tracing::debug;
use vardr_common::{Error, Result};

/// Well-known system bundle locations, most common first.
pub const SYSTEM_BUNDLE_CANDIDATES: &[&str] = &[
    // Debian, Ubuntu, Alpine, Gentoo, Arch
    "/etc/ssl/certs/ca-certificates.crt",
    // Fedora, RHEL, CentOS
    "/etc/pki/ca-trust/extracted/pem/tls-ca-bundle.pem",
    "/etc/pki/tls/certs/ca-bundle.crt",
    // openSUSE
    "/etc/ssl/ca-bundle.pem",
    "/var/lib/ca-certificates/ca-bundle.pem",
    // Alpine, generic OpenSSL
    "/etc/ssl/cert.pem",
    "/usr/lib/ssl/cert.pem",
    // FreeBSD
    "/usr/local/share/certs/ca-root-nss.crt",
];

/// Resolve the system CA bundle.
///
/// An explicit path wins and must exist. Otherwise the first existing entry of
/// [`SYSTEM_BUNDLE_CANDIDATES`] is used.
pub fn resolve_system_bundle(explicit: Option<&Path>) -> Result<PathBuf> {
    match explicit {
        Some(path) => resolve_from(&[path.to_path_buf()]),
        None => {
            let candidates: Vec<PathBuf> =
                SYSTEM_BUNDLE_CANDIDATES.iter().map(PathBuf::from).collect();
            resolve_from(&candidates)
        }
    }
}

fn resolve_from(candidates: &[PathBuf]) -> Result<PathBuf> {
    for candidate in candidates {
        if candidate.is_file() {
            debug!("Using system CA bundle {:?}", candidate);
            return Ok(candidate.clone());
        }
    }
    let searched = candidates
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ");
    Err(Error::SystemBundleNotFound { searched })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_explicit_path_wins() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ca.pem");
        std::fs::write(&path, "pem").unwrap();
        assert_eq!(resolve_system_bundle(Some(&path)).unwrap(), path);
    }

    #[test]
    fn test_missing_explicit_path_errors() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing.pem");
        let err = resolve_system_bundle(Some(&path)).unwrap_err();
        assert!(matches!(err, Error::SystemBundleNotFound { .. }));
        assert!(err.to_string().contains("missing.pem"));
    }

    #[test]
    fn test_first_existing_candidate() {
        let dir = tempdir().unwrap();
        let second = dir.path().join("second.pem");
        let third = dir.path().join("third.pem");
        std::fs::write(&second, "pem").unwrap();
        std::fs::write(&third, "pem").unwrap();

        let candidates = vec![dir.path().join("first.pem"), second.clone(), third];
        assert_eq!(resolve_from(&candidates).unwrap(), second);
    }
}
