//! Configuration loading for adb-mcp.
//!
//! Each setting is resolved from the first source that provides it:
//!
//! 1. **CLI flags** (`--adb`, `--device`, `--download-path`, `--read-path`,
//!    `--log-level`)
//! 2. **JSON file** via `--config <path>` or the `ADB_MCP_CONFIG`
//!    environment variable
//! 3. **Environment variables**: `ADB_PATH`, `ADB_DEFAULT_DEVICE`,
//!    `ADB_DOWNLOAD_PATH`, `MCP_READ_PATH`, `ADB_MCP_LOG`
//! 4. **Compiled defaults**
//!
//! ```json
//! {
//!   "adb_path": "/opt/android-sdk/platform-tools/adb",
//!   "default_device": "emulator-5554",
//!   "download_path": "D://tmp",
//!   "read_path": "/mnt/d/tmp",
//!   "log_level": "debug"
//! }
//! ```
//!
//! ## Screenshot paths
//!
//! Screenshots are pulled by `adb` into `download_path`, written the way
//! the `adb` binary sees the filesystem (on WSL that is usually a Windows
//! path such as `D://tmp`). This process then reads the same file through
//! `read_path` (`/mnt/d/tmp`). On a plain Linux/macOS host both are the
//! same directory.

use std::path::{Path, PathBuf};

use clap::Parser;
use serde::Deserialize;
use tracing::warn;

use crate::error::AdbError;

const DEFAULT_ADB: &str = "adb";
const DEFAULT_DOWNLOAD_PATH: &str = "D://tmp";
const DEFAULT_READ_PATH: &str = "/mnt/d/tmp";
const DEFAULT_LOG_LEVEL: &str = "info";

/// CLI arguments parsed by `clap`.
#[derive(Parser, Debug, Default)]
#[command(
    name = "adb-mcp",
    version,
    about = "MCP server for Android device automation via adb"
)]
pub struct Cli {
    /// Path to a JSON config file
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// adb binary to invoke
    #[arg(long)]
    pub adb: Option<String>,
    /// Initial default device serial
    #[arg(long)]
    pub device: Option<String>,
    /// Directory adb pulls screenshots into (as adb sees it)
    #[arg(long)]
    pub download_path: Option<String>,
    /// The same directory as this process sees it
    #[arg(long)]
    pub read_path: Option<String>,
    /// Log level filter (overridden by RUST_LOG)
    #[arg(long)]
    pub log_level: Option<String>,
}

/// Raw JSON config file structure. Every field is optional.
#[derive(Deserialize, Default, Debug)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub adb_path: Option<String>,
    pub default_device: Option<String>,
    pub download_path: Option<String>,
    pub read_path: Option<String>,
    pub log_level: Option<String>,
}

/// Validated configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub adb_path: String,
    pub default_device: Option<String>,
    pub paths: PathConfig,
    pub log_level: String,
}

/// Host-side locations for pulled screenshots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathConfig {
    /// Directory handed to `adb pull`.
    pub download_path: String,
    /// The same directory as readable by this process.
    pub read_path: String,
}

impl PathConfig {
    /// Path passed to `adb pull` for `filename`.
    pub fn adb_path(&self, filename: &str) -> String {
        format!("{}/{}", self.download_path, filename)
    }

    /// Path this process reads `filename` from.
    pub fn read_path(&self, filename: &str) -> String {
        format!("{}/{}", self.read_path, filename)
    }

    /// Create the read directory if missing. Failure is logged, not fatal.
    pub fn ensure_read_dir(&self) {
        if let Err(e) = std::fs::create_dir_all(&self.read_path) {
            warn!(path = %self.read_path, error = %e, "failed to create screenshot directory");
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            adb_path: DEFAULT_ADB.to_string(),
            default_device: None,
            paths: PathConfig {
                download_path: DEFAULT_DOWNLOAD_PATH.to_string(),
                read_path: DEFAULT_READ_PATH.to_string(),
            },
            log_level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

/// Load configuration from CLI args, a config file and the environment.
pub fn load_config(cli: &Cli) -> Result<Config, AdbError> {
    let file_path = match &cli.config {
        Some(p) => Some(expand_tilde(p)),
        None => env_var("ADB_MCP_CONFIG").map(|p| expand_tilde(Path::new(&p))),
    };
    let file = match file_path {
        Some(path) => load_file(&path)?,
        None => FileConfig::default(),
    };
    resolve(cli, file, env_var)
}

/// Merge the three sources. `env` is injected so tests don't touch the
/// process environment.
fn resolve(
    cli: &Cli,
    file: FileConfig,
    env: impl Fn(&str) -> Option<String>,
) -> Result<Config, AdbError> {
    let defaults = Config::default();

    let adb_path = cli
        .adb
        .clone()
        .or(file.adb_path)
        .or_else(|| env("ADB_PATH"))
        .unwrap_or(defaults.adb_path);
    if adb_path.trim().is_empty() {
        return Err(AdbError::Config("adb path is empty".into()));
    }

    let default_device = cli
        .device
        .clone()
        .or(file.default_device)
        .or_else(|| env("ADB_DEFAULT_DEVICE"))
        .filter(|d| !d.is_empty());

    let download_path = cli
        .download_path
        .clone()
        .or(file.download_path)
        .or_else(|| env("ADB_DOWNLOAD_PATH"));
    let read_path = cli
        .read_path
        .clone()
        .or(file.read_path)
        .or_else(|| env("MCP_READ_PATH"));
    // With only one side configured, derive the other through the WSL mapping.
    let (download_path, read_path) = match (download_path, read_path) {
        (Some(d), Some(r)) => (d, r),
        (Some(d), None) => {
            let r = windows_to_wsl_path(&d);
            (d, r)
        }
        (None, Some(r)) => (wsl_to_windows_path(&r), r),
        (None, None) => (defaults.paths.download_path, defaults.paths.read_path),
    };

    let log_level = cli
        .log_level
        .clone()
        .or(file.log_level)
        .or_else(|| env("ADB_MCP_LOG"))
        .unwrap_or(defaults.log_level);

    Ok(Config {
        adb_path,
        default_device,
        paths: PathConfig {
            download_path: download_path.trim_end_matches('/').to_string(),
            read_path: read_path.trim_end_matches('/').to_string(),
        },
        log_level,
    })
}

fn env_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

fn load_file(path: &Path) -> Result<FileConfig, AdbError> {
    let contents = std::fs::read_to_string(path).map_err(|e| {
        AdbError::Config(format!("Failed to read config file {}: {e}", path.display()))
    })?;
    serde_json::from_str(&contents).map_err(|e| {
        AdbError::Config(format!("Failed to parse config file {}: {e}", path.display()))
    })
}

/// Expand a leading `~` to `$HOME`.
fn expand_tilde(path: &Path) -> PathBuf {
    let s = path.to_string_lossy();
    if let Some(rest) = s.strip_prefix("~/") {
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home).join(rest);
        }
    }
    path.to_path_buf()
}

/// `/mnt/d/tmp` → `D://tmp`. Other paths pass through unchanged.
pub fn wsl_to_windows_path(path: &str) -> String {
    if let Some(rest) = path.strip_prefix("/mnt/") {
        let mut chars = rest.chars();
        if let Some(drive) = chars.next().filter(char::is_ascii_alphabetic) {
            let remainder = chars.as_str();
            if remainder.is_empty() || remainder.starts_with('/') {
                let remainder = remainder.trim_start_matches('/');
                return format!("{}://{}", drive.to_ascii_uppercase(), remainder);
            }
        }
    }
    path.to_string()
}

/// `D:\tmp\shots` or `D://tmp/shots` → `/mnt/d/tmp/shots`. Other paths
/// pass through unchanged.
pub fn windows_to_wsl_path(path: &str) -> String {
    let bytes = path.as_bytes();
    if bytes.len() >= 3
        && bytes[0].is_ascii_alphabetic()
        && bytes[1] == b':'
        && (bytes[2] == b'\\' || bytes[2] == b'/')
    {
        let drive = (bytes[0] as char).to_ascii_lowercase();
        let remainder = path[2..]
            .replace('\\', "/")
            .trim_start_matches('/')
            .to_string();
        return format!("/mnt/{drive}/{remainder}");
    }
    path.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn defaults_when_nothing_set() {
        let cfg = resolve(&Cli::default(), FileConfig::default(), env_from(&[])).unwrap();
        assert_eq!(cfg, Config::default());
    }

    #[test]
    fn env_fills_gaps() {
        let env = env_from(&[
            ("ADB_PATH", "/opt/adb"),
            ("ADB_DOWNLOAD_PATH", "/tmp/shots/"),
            ("MCP_READ_PATH", "/tmp/shots"),
            ("ADB_DEFAULT_DEVICE", "emulator-5554"),
        ]);
        let cfg = resolve(&Cli::default(), FileConfig::default(), env).unwrap();
        assert_eq!(cfg.adb_path, "/opt/adb");
        assert_eq!(cfg.paths.download_path, "/tmp/shots");
        assert_eq!(cfg.paths.read_path, "/tmp/shots");
        assert_eq!(cfg.default_device.as_deref(), Some("emulator-5554"));
    }

    #[test]
    fn cli_beats_file_beats_env() {
        let cli = Cli {
            device: Some("from-cli".into()),
            ..Cli::default()
        };
        let file = FileConfig {
            default_device: Some("from-file".into()),
            adb_path: Some("/file/adb".into()),
            ..FileConfig::default()
        };
        let env = env_from(&[("ADB_DEFAULT_DEVICE", "from-env"), ("ADB_PATH", "/env/adb")]);
        let cfg = resolve(&cli, file, env).unwrap();
        assert_eq!(cfg.default_device.as_deref(), Some("from-cli"));
        assert_eq!(cfg.adb_path, "/file/adb");
    }

    #[test]
    fn empty_adb_path_rejected() {
        let cli = Cli {
            adb: Some("  ".into()),
            ..Cli::default()
        };
        assert!(resolve(&cli, FileConfig::default(), env_from(&[])).is_err());
    }

    #[test]
    fn file_config_parses() {
        let file: FileConfig =
            serde_json::from_str(r#"{"adb_path":"/x/adb","log_level":"debug"}"#).unwrap();
        assert_eq!(file.adb_path.as_deref(), Some("/x/adb"));
        assert_eq!(file.log_level.as_deref(), Some("debug"));
        assert!(serde_json::from_str::<FileConfig>(r#"{"bogus":1}"#).is_err());
    }

    #[test]
    fn load_file_reports_missing_path() {
        let err = load_file(Path::new("/nonexistent/adb-mcp.json")).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }

    #[test]
    fn screenshot_paths_join() {
        let paths = Config::default().paths;
        assert_eq!(paths.adb_path("shot.png"), "D://tmp/shot.png");
        assert_eq!(paths.read_path("shot.png"), "/mnt/d/tmp/shot.png");
    }

    #[test]
    fn wsl_windows_conversions() {
        assert_eq!(wsl_to_windows_path("/mnt/d/tmp"), "D://tmp");
        assert_eq!(wsl_to_windows_path("/mnt/c"), "C://");
        assert_eq!(wsl_to_windows_path("/home/me"), "/home/me");
        assert_eq!(windows_to_wsl_path(r"D:\tmp\shots"), "/mnt/d/tmp/shots");
        assert_eq!(windows_to_wsl_path("D://tmp"), "/mnt/d/tmp");
        assert_eq!(windows_to_wsl_path("relative/path"), "relative/path");
    }

    #[test]
    fn one_screenshot_path_derives_the_other() {
        let env = env_from(&[("ADB_DOWNLOAD_PATH", "E://shots")]);
        let cfg = resolve(&Cli::default(), FileConfig::default(), env).unwrap();
        assert_eq!(cfg.paths.read_path, "/mnt/e/shots");

        let cli = Cli {
            read_path: Some("/tmp/adb-shots".into()),
            ..Cli::default()
        };
        let cfg = resolve(&cli, FileConfig::default(), env_from(&[])).unwrap();
        assert_eq!(cfg.paths.download_path, "/tmp/adb-shots");
    }
}
