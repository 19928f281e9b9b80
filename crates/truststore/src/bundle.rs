//! CA bundle assembly.
//!
//! The bundle is the system CA bundle followed by every valid custom
//! certificate, each appended after a newline. It is written to a uniquely
//! named temporary file in the output directory and persisted over the
//! output so readers never see a partial bundle. If anything goes wrong,
//! the system bundle is copied verbatim instead, so the output path always
//! holds a usable bundle.

use crate::summary::ImportSummary;
use crate::validate::Validated;
use std::fs;
use std::io::{self, Write};
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, warn};
use vardr_common::{Error, Logger, Result};

/// Mode of the written bundle; the child may run as another user.
const BUNDLE_MODE: u32 = 0o644;

/// Writes the combined CA bundle.
#[derive(Debug, Clone)]
pub struct BundleBuilder {
    system_bundle: PathBuf,
    output: PathBuf,
}

impl BundleBuilder {
    pub fn new(system_bundle: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            system_bundle: system_bundle.into(),
            output: output.into(),
        }
    }

    /// Assemble and write the bundle from already-validated certificates.
    ///
    /// Returns an error only when even the system-only fallback could not be
    /// written.
    pub fn build(&self, validated: &[Validated<'_>], log: &Logger) -> Result<ImportSummary> {
        let summary = ImportSummary::from_validated(validated);
        let written = self.assemble(validated, log).and_then(|(content, added)| {
            self.write_replacing(&content)?;
            Ok(added)
        });
        self.settle(written, log)?;
        Ok(summary)
    }

    /// Log the outcome of a write attempt, falling back to the system bundle
    /// when it failed.
    fn settle(&self, written: Result<usize>, log: &Logger) -> Result<()> {
        match written {
            Ok(added) => {
                log.info(format!(
                    "Created custom CA bundle with {} additional certificates",
                    added
                ));
            }
            Err(e) => {
                log.error(format!("Error creating custom CA bundle: {}", e));
                self.write_fallback()?;
                log.warn(format!(
                    "Using unmodified system CA bundle at {}",
                    self.output.display()
                ));
            }
        }
        Ok(())
    }

    fn assemble(&self, validated: &[Validated<'_>], log: &Logger) -> Result<(Vec<u8>, usize)> {
        let mut content = fs::read(&self.system_bundle).map_err(|e| {
            Error::Bundle(format!(
                "cannot read system CA bundle {}: {}",
                self.system_bundle.display(),
                e
            ))
        })?;

        let mut added = 0;
        for v in validated {
            if !v.result.is_valid() {
                debug!("Leaving {} out of the bundle: {}", v.cert.alias(), v.result);
                continue;
            }
            content.push(b'\n');
            content.extend_from_slice(v.cert.content());
            added += 1;
            log.info(format!("Added certificate: {}", v.cert.file_name()));
        }

        Ok((content, added))
    }

    fn write_replacing(&self, content: &[u8]) -> Result<()> {
        let parent = match self.output.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(parent)?;

        let cannot_write = |e: io::Error| {
            Error::Bundle(format!("cannot write {}: {}", self.output.display(), e))
        };
        let mut tmp = NamedTempFile::new_in(parent).map_err(cannot_write)?;
        tmp.write_all(content).map_err(cannot_write)?;
        tmp.as_file()
            .set_permissions(fs::Permissions::from_mode(BUNDLE_MODE))
            .map_err(cannot_write)?;
        tmp.as_file().sync_all().map_err(cannot_write)?;
        tmp.persist(&self.output).map_err(|e| cannot_write(e.error))?;

        debug!("Wrote {} bytes to {:?}", content.len(), self.output);
        Ok(())
    }

    fn write_fallback(&self) -> Result<()> {
        fs::copy(&self.system_bundle, &self.output).map_err(|e| {
            warn!("Fallback copy failed: {}", e);
            Error::Bundle(format!(
                "fallback copy of {} to {} failed: {}",
                self.system_bundle.display(),
                self.output.display(),
                e
            ))
        })?;
        Ok(())
    }
}
