//! Discovery of the application entry file.
//!
//! Detection is a ranked list of [`EntryPointDetector`] strategies. The
//! default ranking first looks for conventional file names, then falls back
//! to scanning file contents for a FastAPI marker.

use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

/// Extension of candidate entry files.
pub const ENTRY_EXTENSION: &str = "py";

/// Conventional entry file stems, highest priority first.
pub const CONVENTIONAL_ENTRY_NAMES: &[&str] = &["main", "app", "application", "api", "server"];

/// Substrings that identify a file declaring a FastAPI application.
pub const FASTAPI_MARKERS: &[&str] = &["FastAPI", "from fastapi"];

/// A strategy for finding the entry file in a directory.
pub trait EntryPointDetector: Send + Sync {
    /// Short name used in diagnostics.
    fn name(&self) -> &'static str;

    /// File name (not path) of the detected entry file, if any.
    fn detect(&self, dir: &Path) -> Option<String>;
}

/// Picks the first existing file from a fixed priority list.
#[derive(Debug, Clone)]
pub struct ConventionalNames {
    file_names: Vec<String>,
}

impl ConventionalNames {
    pub fn new<I, S>(stems: I, extension: &str) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            file_names: stems
                .into_iter()
                .map(|s| format!("{}.{}", s.as_ref(), extension))
                .collect(),
        }
    }
}

impl Default for ConventionalNames {
    fn default() -> Self {
        Self::new(CONVENTIONAL_ENTRY_NAMES.iter().copied(), ENTRY_EXTENSION)
    }
}

impl EntryPointDetector for ConventionalNames {
    fn name(&self) -> &'static str {
        "conventional-names"
    }

    fn detect(&self, dir: &Path) -> Option<String> {
        self.file_names
            .iter()
            .find(|name| dir.join(name).is_file())
            .cloned()
    }
}

/// Picks the first file, by name, whose content contains a marker.
#[derive(Debug, Clone)]
pub struct MarkerScan {
    extension: String,
    markers: Vec<String>,
}

impl MarkerScan {
    pub fn new<I, S>(extension: &str, markers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            extension: extension.to_string(),
            markers: markers.into_iter().map(Into::into).collect(),
        }
    }

    fn candidates(&self, dir: &Path) -> Vec<PathBuf> {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                debug!("Cannot scan {:?}: {}", dir, e);
                return Vec::new();
            }
        };

        let mut paths: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                path.is_file()
                    && path
                        .extension()
                        .map(|ext| ext == self.extension.as_str())
                        .unwrap_or(false)
            })
            .collect();
        paths.sort();
        paths
    }
}

impl Default for MarkerScan {
    fn default() -> Self {
        Self::new(ENTRY_EXTENSION, FASTAPI_MARKERS.iter().copied())
    }
}

impl EntryPointDetector for MarkerScan {
    fn name(&self) -> &'static str {
        "marker-scan"
    }

    fn detect(&self, dir: &Path) -> Option<String> {
        for path in self.candidates(dir) {
            let content = match fs::read_to_string(&path) {
                Ok(content) => content,
                Err(e) => {
                    trace!("Skipping unreadable {:?}: {}", path, e);
                    continue;
                }
            };
            if self.markers.iter().any(|m| content.contains(m.as_str())) {
                return path.file_name().map(|n| n.to_string_lossy().into_owned());
            }
        }
        None
    }
}

/// Runs the detectors in rank order over the application directory.
pub struct Locator {
    dir: PathBuf,
    detectors: Vec<Box<dyn EntryPointDetector>>,
}

impl Locator {
    /// Locator with the default ranking: conventional names, then marker scan.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self::with_detectors(
            dir,
            vec![
                Box::new(ConventionalNames::default()),
                Box::new(MarkerScan::default()),
            ],
        )
    }

    pub fn with_detectors(
        dir: impl Into<PathBuf>,
        detectors: Vec<Box<dyn EntryPointDetector>>,
    ) -> Self {
        Self {
            dir: dir.into(),
            detectors,
        }
    }

    /// The entry file name, or `None` when no detector matched.
    pub fn locate(&self) -> Option<String> {
        for detector in &self.detectors {
            if let Some(found) = detector.detect(&self.dir) {
                debug!(detector = detector.name(), entry = %found, "Entry file located");
                return Some(found);
            }
        }
        debug!("No entry file in {:?}", self.dir);
        None
    }
}
