//! Change detection for the certificates directory.
//!
//! The digest of the certificate set is stored in a small record file after
//! every import. On the next start, an equal digest means the bundle on disk
//! is already current and the import can be skipped.

use crate::certs::CertificateSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;
use vardr_common::Logger;

/// Digest reported when the certificates directory does not exist.
pub const NO_CERTS_DIGEST: &str = "no-certs";

/// Outcome of comparing the stored record with the current certificates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DigestCheck {
    /// Digest of the certificates currently on disk.
    pub current: String,
    /// True only when a record exists and equals `current`.
    pub unchanged: bool,
}

/// Computes and persists the certificate-set digest.
#[derive(Debug, Clone)]
pub struct DigestTracker {
    certs_dir: PathBuf,
    record_path: PathBuf,
}

impl DigestTracker {
    pub fn new(certs_dir: impl Into<PathBuf>, record_path: impl Into<PathBuf>) -> Self {
        Self {
            certs_dir: certs_dir.into(),
            record_path: record_path.into(),
        }
    }

    pub fn record_path(&self) -> &Path {
        &self.record_path
    }

    /// Digest of the certificates directory as it is now.
    pub fn compute_digest(&self, log: &Logger) -> String {
        CertificateSet::load(&self.certs_dir, log).digest()
    }

    /// The persisted digest, trimmed. `Ok(None)` when no record exists.
    pub fn stored(&self) -> io::Result<Option<String>> {
        match fs::read_to_string(&self.record_path) {
            Ok(content) => Ok(Some(content.trim().to_string())),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Compare the stored record with a fresh digest.
    ///
    /// A missing or unreadable record always counts as changed.
    pub fn check(&self, log: &Logger) -> DigestCheck {
        let current = self.compute_digest(log);
        let unchanged = match self.stored() {
            Ok(Some(stored)) => stored == current,
            Ok(None) => {
                debug!("No digest record at {:?}", self.record_path);
                false
            }
            Err(e) => {
                log.warn(format!("Error checking certificate hash: {}", e));
                false
            }
        };
        debug!(current = %current, unchanged, "Certificate digest checked");
        DigestCheck { current, unchanged }
    }

    /// Shorthand for `check(log).unchanged`.
    pub fn unchanged(&self, log: &Logger) -> bool {
        self.check(log).unchanged
    }

    /// Overwrite the record with `digest`. Failures are logged, not returned.
    pub fn persist(&self, digest: &str, log: &Logger) {
        if let Err(e) = fs::write(&self.record_path, digest) {
            log.warn(format!("Error saving certificate hash: {}", e));
            return;
        }
        debug!("Saved certificate digest to {:?}", self.record_path);
    }
}
