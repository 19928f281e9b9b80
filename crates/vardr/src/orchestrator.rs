//! Startup state machine.
//!
//! ```text
//! CheckDigest -> { LocateApp | Rebuild -> LocateApp }
//! LocateApp   -> { Exit(1) | Launch }
//! Launch      -> Exit(child code | 1)
//! ```
//!
//! Each transition is a plain function of the previous step's result, so the
//! decisions can be tested without touching the filesystem.

use crate::config::Config;
use anyhow::{Context, Result};
use vardr_common::Logger;
use vardr_launcher::{LaunchSpec, Locator};
use vardr_truststore::{
    resolve_system_bundle, validate_all, BundleBuilder, CertificateSet, DigestCheck,
    DigestTracker, ImportSummary, InstanceLock, Validated,
};

/// Exit code for setup, locator and spawn failures.
pub const FATAL_EXIT: i32 = 1;

/// Supervisor states.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum State {
    CheckDigest,
    Rebuild,
    LocateApp,
    Launch { entry: String },
    Exit(i32),
}

/// Skip the import when the certificates are unchanged.
pub fn after_check(check: &DigestCheck) -> State {
    if check.unchanged {
        State::LocateApp
    } else {
        State::Rebuild
    }
}

/// A missing entry file is fatal.
pub fn after_locate(entry: Option<String>) -> State {
    match entry {
        Some(entry) => State::Launch { entry },
        None => State::Exit(FATAL_EXIT),
    }
}

/// The child's code on a normal exit, [`FATAL_EXIT`] if it never ran.
pub fn after_launch<E>(result: std::result::Result<i32, E>) -> State {
    match result {
        Ok(code) => State::Exit(code),
        Err(_) => State::Exit(FATAL_EXIT),
    }
}

/// Drives one supervisor run from digest check to child exit.
pub struct Orchestrator {
    config: Config,
    log: Logger,
}

impl Orchestrator {
    pub fn new(config: Config, log: Logger) -> Self {
        Self { config, log }
    }

    /// Run to completion and return the process exit code.
    pub async fn run(&self) -> i32 {
        self.log.info("Starting certificate import process...");

        let mut lock = self.acquire_lock();
        let mut state = State::CheckDigest;
        loop {
            tracing::debug!(?state, "Entering state");
            state = match state {
                State::CheckDigest => {
                    let check = self.tracker().check(&self.log);
                    let next = after_check(&check);
                    if next == State::LocateApp {
                        self.log.info("Certificates unchanged, skipping import");
                    }
                    next
                }
                State::Rebuild => {
                    self.rebuild();
                    State::LocateApp
                }
                State::LocateApp => {
                    // The shared files are settled; let other instances proceed.
                    drop(lock.take());
                    self.log.info("Starting FastAPI application...");
                    let next = after_locate(Locator::new(&self.config.app_dir).locate());
                    if let State::Exit(_) = next {
                        self.log.error(format!(
                            "No FastAPI application found. Please ensure your app.py or main.py exists in {}",
                            self.config.app_dir.display()
                        ));
                    }
                    next
                }
                State::Launch { entry } => {
                    let result = self.launch(&entry).await;
                    if let Err(e) = &result {
                        self.log.error(format!("Failed to start FastAPI application: {}", e));
                    }
                    after_launch(result)
                }
                State::Exit(code) => return code,
            };
        }
    }

    fn tracker(&self) -> DigestTracker {
        DigestTracker::new(&self.config.certs_dir, &self.config.digest_file)
    }

    fn acquire_lock(&self) -> Option<InstanceLock> {
        let path = InstanceLock::path_for(&self.config.digest_file);
        let locked = InstanceLock::try_acquire(&path).and_then(|held| match held {
            Some(lock) => Ok(lock),
            None => {
                self.log.info("Waiting for another instance to finish importing certificates...");
                InstanceLock::acquire(&path)
            }
        });
        match locked {
            Ok(lock) => Some(lock),
            Err(e) => {
                self.log.warn(format!("Proceeding without instance lock: {}", e));
                None
            }
        }
    }

    /// Validate, build and persist. The digest is recorded only once the
    /// bundle (or its system-only fallback) is on disk.
    fn rebuild(&self) {
        let set = CertificateSet::load(&self.config.certs_dir, &self.log);
        self.announce(&set);

        let validated = validate_all(&set, &self.log);
        match self.build_bundle(&validated) {
            Ok(summary) => {
                if !set.is_empty() {
                    self.log.info(summary.headline());
                    self.log.structured("certificate_import_summary", &summary);
                }
                self.tracker().persist(&set.digest(), &self.log);
            }
            Err(e) => {
                self.log.error(format!("{:#}", e));
            }
        }
    }

    fn announce(&self, set: &CertificateSet) {
        if !set.dir_present() {
            self.log.info("No certificates directory found");
        } else if set.is_empty() {
            self.log.info(format!(
                "No certificates found in {} directory",
                set.dir().display()
            ));
        } else {
            self.log.info(format!("Found {} certificate(s)...", set.len()));
        }
    }

    fn build_bundle(&self, validated: &[Validated<'_>]) -> Result<ImportSummary> {
        let system = resolve_system_bundle(self.config.system_bundle.as_deref())
            .context("Error creating custom CA bundle")?;
        let summary = BundleBuilder::new(system, &self.config.bundle_path)
            .build(validated, &self.log)
            .context("Error creating custom CA bundle")?;
        Ok(summary)
    }

    async fn launch(&self, entry: &str) -> vardr_common::Result<i32> {
        self.log.info(format!("Starting FastAPI application: {}", entry));
        let spec = LaunchSpec::for_entry(entry, &self.config.server, &self.config.bundle_path)
            .in_dir(&self.config.app_dir);
        vardr_launcher::launch(&spec, &self.log).await
    }
}
