//! Command line and environment for the child application server.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::process::Command;

/// Variables pointed at the custom CA bundle: OpenSSL's trust file and the
/// bundles read by `requests` and curl-based clients.
pub const TRUST_BUNDLE_VARS: &[&str] = &["SSL_CERT_FILE", "REQUESTS_CA_BUNDLE", "CURL_CA_BUNDLE"];

/// Interpreter settings forced for the child.
pub const PYTHON_RUNTIME_VARS: &[(&str, &str)] = &[
    ("PYTHONUNBUFFERED", "1"),
    ("PYTHONDONTWRITEBYTECODE", "1"),
];

/// Address the server binds to.
pub const BIND_ALL_HOST: &str = "0.0.0.0";

/// Settings for the ASGI server invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerSettings {
    /// Python interpreter to run.
    pub python: String,
    /// Name of the application object inside the entry module.
    pub app_object: String,
    pub host: String,
    pub port: u16,
    pub workers: u32,
    /// Extra uvicorn options, whitespace separated.
    pub extra_options: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            python: "python".to_string(),
            app_object: "app".to_string(),
            host: BIND_ALL_HOST.to_string(),
            port: 8000,
            workers: 1,
            extra_options: String::new(),
        }
    }
}

/// Everything needed to spawn the child. Built fresh for each run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchSpec {
    program: String,
    args: Vec<String>,
    env: BTreeMap<String, String>,
    working_dir: Option<PathBuf>,
}

impl LaunchSpec {
    /// Spec for serving `entry_file` with uvicorn.
    pub fn for_entry(entry_file: &str, settings: &ServerSettings, bundle_path: &Path) -> Self {
        let mut args = vec![
            "-m".to_string(),
            "uvicorn".to_string(),
            module_target(entry_file, &settings.app_object),
            "--host".to_string(),
            settings.host.clone(),
            "--port".to_string(),
            settings.port.to_string(),
            "--workers".to_string(),
            settings.workers.to_string(),
        ];
        args.extend(split_options(&settings.extra_options));

        Self {
            program: settings.python.clone(),
            args,
            env: env_overlay(bundle_path),
            working_dir: None,
        }
    }

    #[cfg(test)]
    pub(crate) fn from_parts(
        program: impl Into<String>,
        args: Vec<String>,
        env: BTreeMap<String, String>,
    ) -> Self {
        Self {
            program: program.into(),
            args,
            env,
            working_dir: None,
        }
    }

    /// Run the child from `dir`.
    pub fn in_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Variables set on top of the inherited environment.
    pub fn env_overlay(&self) -> &BTreeMap<String, String> {
        &self.env
    }

    pub fn working_dir(&self) -> Option<&Path> {
        self.working_dir.as_deref()
    }

    /// Program and arguments joined with spaces, for logging.
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// A command inheriting this process's environment plus the overlay.
    pub fn to_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args).envs(&self.env);
        if let Some(dir) = &self.working_dir {
            cmd.current_dir(dir);
        }
        cmd
    }
}

/// `module:object` target for an entry file name, e.g. `main:app`.
pub fn module_target(entry_file: &str, app_object: &str) -> String {
    let module = entry_file.strip_suffix(".py").unwrap_or(entry_file);
    format!("{}:{}", module, app_object)
}

/// Split a free-form option string on whitespace.
pub fn split_options(options: &str) -> Vec<String> {
    options.split_whitespace().map(str::to_string).collect()
}

fn env_overlay(bundle_path: &Path) -> BTreeMap<String, String> {
    let bundle = bundle_path.display().to_string();
    let mut env: BTreeMap<String, String> = TRUST_BUNDLE_VARS
        .iter()
        .map(|var| (var.to_string(), bundle.clone()))
        .collect();
    for (key, value) in PYTHON_RUNTIME_VARS {
        env.insert(key.to_string(), value.to_string());
    }
    env
}
