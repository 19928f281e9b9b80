//! Discovery and loading of custom certificate files.

use crate::digest::NO_CERTS_DIGEST;
use crate::CERT_EXTENSION;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;
use vardr_common::{hash, Logger};

/// A certificate file read from the certificates directory.
///
/// A file that could not be read keeps its place in the set with the read
/// error, so it is still reported as a failed import.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateFile {
    path: PathBuf,
    alias: String,
    content: Vec<u8>,
    read_error: Option<String>,
}

impl CertificateFile {
    /// Build from a path and its raw content. The alias is the file stem.
    pub fn new(path: impl Into<PathBuf>, content: Vec<u8>) -> Self {
        let path = path.into();
        let alias = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            path,
            alias,
            content,
            read_error: None,
        }
    }

    /// Placeholder for a file whose content could not be read.
    pub fn unreadable(path: impl Into<PathBuf>, error: &io::Error) -> Self {
        Self {
            read_error: Some(error.to_string()),
            ..Self::new(path, Vec::new())
        }
    }

    /// Read a certificate file from disk.
    pub fn read(path: &Path) -> io::Result<Self> {
        let content = fs::read(path)?;
        Ok(Self::new(path, content))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn alias(&self) -> &str {
        &self.alias
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    pub fn content(&self) -> &[u8] {
        &self.content
    }

    /// Why the file could not be read, if it could not.
    pub fn read_error(&self) -> Option<&str> {
        self.read_error.as_deref()
    }
}

/// The certificate files present in a directory, sorted by file name.
#[derive(Debug, Clone)]
pub struct CertificateSet {
    dir: PathBuf,
    present: bool,
    files: Vec<CertificateFile>,
}

impl CertificateSet {
    /// Load every `*.crt` file in `dir`.
    ///
    /// A missing directory yields an empty set with `dir_present() == false`.
    /// Files that cannot be read are reported and kept as unreadable entries.
    pub fn load(dir: &Path, log: &Logger) -> Self {
        if !dir.is_dir() {
            debug!("Certificates directory {:?} does not exist", dir);
            return Self {
                dir: dir.to_path_buf(),
                present: false,
                files: Vec::new(),
            };
        }

        let paths = match list_certificate_paths(dir) {
            Ok(paths) => paths,
            Err(e) => {
                log.warn(format!(
                    "Error listing certificates in {}: {}",
                    dir.display(),
                    e
                ));
                Vec::new()
            }
        };

        let mut files = Vec::with_capacity(paths.len());
        for path in paths {
            match CertificateFile::read(&path) {
                Ok(cert) => files.push(cert),
                Err(e) => {
                    log.warn(format!("Error reading certificate: {} - {}", path.display(), e));
                    files.push(CertificateFile::unreadable(path, &e));
                }
            }
        }

        debug!("Loaded {} certificate file(s) from {:?}", files.len(), dir);
        Self {
            dir: dir.to_path_buf(),
            present: true,
            files,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Whether the certificates directory existed when loaded.
    pub fn dir_present(&self) -> bool {
        self.present
    }

    pub fn files(&self) -> &[CertificateFile] {
        &self.files
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// SHA-256 over the contents of every readable file, in file-name order.
    ///
    /// Returns [`NO_CERTS_DIGEST`] when the directory is missing.
    pub fn digest(&self) -> String {
        if !self.present {
            return NO_CERTS_DIGEST.to_string();
        }
        hash::sha256_chunks(
            self.files
                .iter()
                .filter(|cert| cert.read_error.is_none())
                .map(CertificateFile::content),
        )
    }
}

/// Regular files with the certificate extension, sorted by file name.
fn list_certificate_paths(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let is_cert = path
            .extension()
            .map(|ext| ext == CERT_EXTENSION)
            .unwrap_or(false);
        if is_cert && path.is_file() {
            paths.push(path);
        }
    }
    paths.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(paths)
}
