//! Runtime configuration for the probe service
//!
//! Every setting is read from the environment (the deployment contract) and
//! can also be passed as a long flag, which is what the tests use. The parsed
//! [`ProbeConfig`] is built once at startup and handed to every component;
//! nothing else reads the environment.

use crate::nfs::AuthParams;
use crate::{CoreError, Result};
use clap::{Parser, ValueEnum};
use std::ffi::OsString;
use std::net::{Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

/// Log output flavour
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human readable lines
    #[default]
    Text,
    /// One JSON object per event
    Json,
}

const DEFAULT_PORT: &str = "8080";
const DEFAULT_TIMEOUT: &str = "20s";
const DEFAULT_MACHINE_NAME: &str = "its-me";
const DEFAULT_WRITE_INTERVAL: &str = "1s";
const DEFAULT_READ_INTERVAL: &str = "10s";
const DEFAULT_LOG_LEVEL: &str = "info";

/// Probe service configuration
///
/// Deployment templates often export optional variables as empty strings, so
/// every setting with a default falls back to it when given a blank value.
#[derive(Debug, Clone, Parser)]
#[command(name = "canary")]
#[command(about = "Continuously probes an NFS share and a local SQLite store")]
#[command(version)]
pub struct ProbeConfig {
    /// NFS server host, optionally with `:port`
    #[arg(long, env = "NFS_SERVER")]
    pub nfs_server: String,

    /// Exported share, reported at startup
    #[arg(long, env = "NFS_SHARE")]
    pub nfs_share: String,

    /// HTTP listen port (`8080`, `:8080`) or full socket address
    #[arg(long = "port", env = "PORT", default_value = DEFAULT_PORT, value_parser = parse_listen_addr)]
    pub listen_addr: SocketAddr,

    /// Connection timeout for each NFS listing request
    #[arg(long, env = "TIMEOUT", default_value = DEFAULT_TIMEOUT, value_parser = parse_timeout)]
    pub timeout: Duration,

    /// Machine name sent in the AUTH_SYS credential
    #[arg(long, env = "MACHINE_NAME", default_value = DEFAULT_MACHINE_NAME, value_parser = parse_machine_name)]
    pub machine_name: String,

    /// Numeric user id sent in the AUTH_SYS credential
    #[arg(long, env = "UID")]
    pub uid: u32,

    /// Numeric group id sent in the AUTH_SYS credential
    #[arg(long, env = "GID")]
    pub gid: u32,

    /// File used by the write-storage/read-storage endpoints
    #[arg(long, env = "STORAGE_PATH", value_parser = raw_path)]
    pub storage_path: Option<PathBuf>,

    /// SQLite database driven by the background probe cycles
    #[arg(long, env = "SQLITE_STORAGE_PATH", value_parser = raw_path)]
    pub sqlite_storage_path: Option<PathBuf>,

    /// Period of the probe write cycle
    #[arg(long, env = "WRITE_INTERVAL", default_value = DEFAULT_WRITE_INTERVAL, value_parser = parse_write_interval)]
    pub write_interval: Duration,

    /// Period of the probe read cycle
    #[arg(long, env = "READ_INTERVAL", default_value = DEFAULT_READ_INTERVAL, value_parser = parse_read_interval)]
    pub read_interval: Duration,

    /// Label stamped on responses, records and log events
    #[arg(long, env = "POD_NAME", default_value = "")]
    pub pod_name: String,

    /// Default log filter when `RUST_LOG` is not set
    #[arg(long, env = "LOG_LEVEL", default_value = DEFAULT_LOG_LEVEL, value_parser = parse_log_level)]
    pub log_level: String,

    /// Log output format
    #[arg(long, env = "LOG_FORMAT", default_value = "text", value_parser = parse_log_format)]
    pub log_format: LogFormat,
}

impl ProbeConfig {
    /// Parse from an argument list (environment variables fill in the rest)
    /// and validate the result.
    pub fn from_args<I, T>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let config = Self::try_parse_from(args)
            .map_err(|e| CoreError::ConfigurationError(e.to_string()))?;
        config.validate()
    }

    /// Normalise blank optional values and reject unusable settings
    pub fn validate(mut self) -> Result<Self> {
        if self.nfs_server.trim().is_empty() || self.nfs_share.trim().is_empty() {
            return Err(CoreError::ConfigurationError(
                "Must set NFS_SERVER and NFS_SHARE environment variables".to_string(),
            ));
        }
        self.nfs_server = self.nfs_server.trim().to_string();

        self.storage_path = self
            .storage_path
            .filter(|p| !p.as_os_str().is_empty());
        self.sqlite_storage_path = self
            .sqlite_storage_path
            .filter(|p| !p.to_string_lossy().trim().is_empty());

        if self.write_interval.is_zero() {
            return Err(CoreError::ConfigurationError(
                "WRITE_INTERVAL must be greater than zero".to_string(),
            ));
        }
        if self.read_interval.is_zero() {
            return Err(CoreError::ConfigurationError(
                "READ_INTERVAL must be greater than zero".to_string(),
            ));
        }

        Ok(self)
    }

    /// Credential parameters for the remote filesystem
    pub fn auth_params(&self) -> AuthParams {
        AuthParams {
            uid: self.uid,
            gid: self.gid,
            machine_name: self.machine_name.clone(),
        }
    }

    /// Whether the background probe cycles should run
    pub fn probing_enabled(&self) -> bool {
        self.sqlite_storage_path.is_some()
    }
}

fn or_default<'a>(input: &'a str, default: &'a str) -> &'a str {
    if input.trim().is_empty() {
        default
    } else {
        input
    }
}

fn parse_timeout(input: &str) -> std::result::Result<Duration, humantime::DurationError> {
    humantime::parse_duration(or_default(input, DEFAULT_TIMEOUT))
}

fn parse_write_interval(input: &str) -> std::result::Result<Duration, humantime::DurationError> {
    humantime::parse_duration(or_default(input, DEFAULT_WRITE_INTERVAL))
}

fn parse_read_interval(input: &str) -> std::result::Result<Duration, humantime::DurationError> {
    humantime::parse_duration(or_default(input, DEFAULT_READ_INTERVAL))
}

fn parse_machine_name(input: &str) -> std::result::Result<String, std::convert::Infallible> {
    Ok(or_default(input, DEFAULT_MACHINE_NAME).to_string())
}

fn parse_log_level(input: &str) -> std::result::Result<String, std::convert::Infallible> {
    Ok(or_default(input, DEFAULT_LOG_LEVEL).to_string())
}

fn parse_log_format(input: &str) -> std::result::Result<LogFormat, String> {
    let input = input.trim();
    if input.is_empty() {
        return Ok(LogFormat::default());
    }
    LogFormat::from_str(input, true)
}

// Blank paths must survive parsing so that `validate` can treat them as unset.
fn raw_path(input: &str) -> std::result::Result<PathBuf, std::convert::Infallible> {
    Ok(PathBuf::from(input))
}

/// Accepts `8080`, `:8080` or a full socket address such as `127.0.0.1:8080`.
/// A blank value means the default port.
pub fn parse_listen_addr(input: &str) -> std::result::Result<SocketAddr, String> {
    let trimmed = or_default(input, DEFAULT_PORT).trim();
    let port_only = trimmed.strip_prefix(':').unwrap_or(trimmed);
    if let Ok(port) = port_only.parse::<u16>() {
        return Ok(SocketAddr::from((Ipv4Addr::UNSPECIFIED, port)));
    }
    trimmed
        .parse::<SocketAddr>()
        .map_err(|e| format!("invalid listen address {input:?}: {e}"))
}
