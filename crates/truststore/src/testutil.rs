//! Certificate fixtures for unit tests.

use std::fs;
use std::path::{Path, PathBuf};

pub const CORP_ROOT: &[u8] = include_bytes!("../tests/fixtures/corp-root.crt");
pub const PARTNER_CA: &[u8] = include_bytes!("../tests/fixtures/partner-ca.crt");
pub const SYSTEM_BUNDLE: &[u8] = include_bytes!("../tests/fixtures/system-ca-bundle.pem");

pub const MALFORMED: &[u8] =
    b"-----BEGIN CERTIFICATE-----\nbm90IGEgY2VydGlmaWNhdGU=\n-----END CERTIFICATE-----\n";

/// Write `files` into `dir/certs` and return that directory.
pub fn write_certs(dir: &Path, files: &[(&str, &[u8])]) -> PathBuf {
    let certs = dir.join("certs");
    fs::create_dir_all(&certs).unwrap();
    for (name, content) in files {
        fs::write(certs.join(name), content).unwrap();
    }
    certs
}

/// Write the fixture system bundle into `dir` and return its path.
pub fn write_system_bundle(dir: &Path) -> PathBuf {
    let path = dir.join("system-ca-bundle.pem");
    fs::write(&path, SYSTEM_BUNDLE).unwrap();
    path
}
