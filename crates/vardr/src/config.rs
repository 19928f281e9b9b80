//! Command line and environment configuration.

use clap::{ArgAction, Parser};
use std::path::PathBuf;
use vardr_launcher::ServerSettings;

#[derive(Parser, Debug, Clone)]
#[command(name = "vardr")]
#[command(
    author,
    version,
    about = "Import custom CA certificates and supervise a FastAPI application"
)]
pub struct Cli {
    /// Enable verbose diagnostics on stderr
    #[arg(short, long)]
    pub verbose: bool,

    /// Emit newline-delimited JSON logs instead of plain text
    #[arg(
        long,
        env = "VARD_JSON_LOGS",
        action = ArgAction::Set,
        num_args = 0..=1,
        default_value = "false",
        default_missing_value = "true",
        value_parser = parse_toggle
    )]
    pub json_logs: bool,

    /// Directory holding custom *.crt certificates
    #[arg(long, env = "VARDR_CERTS_DIR", default_value = "/certs")]
    pub certs_dir: PathBuf,

    /// File recording the digest of the last imported certificate set
    #[arg(long, env = "VARDR_DIGEST_FILE", default_value = "/app/certs.hash")]
    pub digest_file: PathBuf,

    /// Output path of the combined CA bundle
    #[arg(long, env = "VARDR_CA_BUNDLE", default_value = "/app/custom_ca_bundle.pem")]
    pub bundle_path: PathBuf,

    /// System CA bundle to start from (probed when unset)
    #[arg(long, env = "VARDR_SYSTEM_CA_BUNDLE")]
    pub system_bundle: Option<PathBuf>,

    /// Directory containing the application
    #[arg(long, env = "VARDR_APP_DIR", default_value = "/app")]
    pub app_dir: PathBuf,

    /// Name of the ASGI application object in the entry module
    #[arg(long, env = "VARDR_APP_OBJECT", default_value = "app")]
    pub app_object: String,

    /// Python interpreter used to run uvicorn
    #[arg(long, env = "VARDR_PYTHON", default_value = "python")]
    pub python: String,

    /// Port the application listens on
    #[arg(long, env = "PORT", default_value = "8000")]
    pub port: u16,

    /// Number of uvicorn worker processes
    #[arg(long, env = "WORKERS", default_value = "1")]
    pub workers: u32,

    /// Extra uvicorn options, whitespace separated
    #[arg(long, env = "UVICORN_OPTS", default_value = "", allow_hyphen_values = true)]
    pub uvicorn_opts: String,
}

fn parse_toggle(value: &str) -> Result<bool, String> {
    Ok(value.trim().eq_ignore_ascii_case("true"))
}

/// Resolved supervisor settings.
#[derive(Debug, Clone)]
pub struct Config {
    pub certs_dir: PathBuf,
    pub digest_file: PathBuf,
    pub bundle_path: PathBuf,
    pub system_bundle: Option<PathBuf>,
    pub app_dir: PathBuf,
    pub json_logs: bool,
    pub server: ServerSettings,
}

impl From<Cli> for Config {
    fn from(cli: Cli) -> Self {
        // The child runs from the app directory, so hand it an absolute path.
        let bundle_path = std::path::absolute(&cli.bundle_path).unwrap_or(cli.bundle_path);

        Self {
            certs_dir: cli.certs_dir,
            digest_file: cli.digest_file,
            bundle_path,
            system_bundle: cli.system_bundle,
            app_dir: cli.app_dir,
            json_logs: cli.json_logs,
            server: ServerSettings {
                python: cli.python,
                app_object: cli.app_object,
                port: cli.port,
                workers: cli.workers,
                extra_options: cli.uvicorn_opts,
                ..ServerSettings::default()
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        let mut argv = vec!["vardr"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_explicit_flags() {
        let cli = parse(&[
            "--json-logs",
            "--port",
            "9000",
            "--workers",
            "3",
            "--uvicorn-opts",
            "--proxy-headers --log-level debug",
            "--certs-dir",
            "/tmp/certs",
        ]);
        assert!(cli.json_logs);
        assert_eq!(cli.port, 9000);
        assert_eq!(cli.workers, 3);
        assert_eq!(cli.uvicorn_opts, "--proxy-headers --log-level debug");
        assert_eq!(cli.certs_dir, PathBuf::from("/tmp/certs"));
    }

    #[test]
    fn test_json_toggle_values() {
        assert!(parse(&["--json-logs=TRUE"]).json_logs);
        assert!(!parse(&["--json-logs=yes"]).json_logs);
        assert!(!parse(&["--json-logs=false"]).json_logs);
    }

    #[test]
    fn test_invalid_port_is_rejected() {
        assert!(Cli::try_parse_from(["vardr", "--port", "http"]).is_err());
    }

    #[test]
    fn test_config_from_cli() {
        let config = Config::from(parse(&[
            "--bundle-path",
            "/srv/bundle.pem",
            "--python",
            "/usr/bin/python3",
            "--app-object",
            "api",
            "--port",
            "8443",
        ]));
        assert_eq!(config.bundle_path, PathBuf::from("/srv/bundle.pem"));
        assert_eq!(config.server.python, "/usr/bin/python3");
        assert_eq!(config.server.app_object, "api");
        assert_eq!(config.server.port, 8443);
        assert_eq!(config.server.host, "0.0.0.0");
    }

    #[test]
    fn test_relative_bundle_path_becomes_absolute() {
        let config = Config::from(parse(&["--bundle-path", "bundle.pem"]));
        assert!(config.bundle_path.is_absolute());
        assert!(config.bundle_path.ends_with("bundle.pem"));
    }
}
