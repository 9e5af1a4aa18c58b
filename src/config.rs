use std::{env, fs, path::Path, path::PathBuf, time::Duration};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use directories::ProjectDirs;
use serde::Deserialize;

use crate::error::TailError;
use crate::query::{EndBound, ALL_STREAMS};
use crate::time_windows::{parse_end, parse_start};

pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1_000;
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_MAX_FRAMES: usize = 100;

/// Values read from the optional TOML config file. Every key may be omitted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub log_group: Option<String>,
    pub log_stream_pattern: Option<String>,
    pub region: Option<String>,
    pub filter_pattern: Option<String>,
    pub start: Option<String>,
    pub end: Option<String>,
    pub watch: Option<bool>,
    pub poll_interval_ms: Option<u64>,
    pub http_timeout_secs: Option<u64>,
    pub color: Option<bool>,
    pub show_locals: Option<bool>,
    pub max_frames: Option<usize>,
}

impl FileConfig {
    /// Load `path`, or the default config file when `path` is `None` and the
    /// default file exists. An explicit path must exist.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::read(path),
            None => {
                let default_path = default_config_path();
                if default_path.exists() {
                    Self::read(&default_path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn from_toml(raw: &str) -> Result<Self> {
        toml::from_str(raw).context("parsing config file")
    }

    fn read(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        Self::from_toml(&raw).with_context(|| format!("in {}", path.display()))
    }

    /// Apply environment overrides from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_env_from(|key| env::var(key).ok());
    }

    pub fn apply_env_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        if let Some(v) = get("AWS_REGION") {
            self.region = Some(v);
        }
        if let Some(v) = get("LUCID_LOG_GROUP") {
            self.log_group = Some(v);
        }
        if let Some(n) = get("LUCID_POLL_INTERVAL_MS").and_then(|v| v.parse().ok()) {
            self.poll_interval_ms = Some(n);
        }
        if get("NO_COLOR").is_some() {
            self.color = Some(false);
        }
    }
}

/// Values given on the command line. They win over env and file values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CliOverrides {
    pub log_group: Option<String>,
    pub log_stream_pattern: Option<String>,
    pub region: Option<String>,
    pub filter_pattern: Option<String>,
    pub start: Option<String>,
    pub end: Option<String>,
    /// Only `true` overrides; an absent flag defers to the file.
    pub watch: bool,
    pub no_color: bool,
}

/// Effective settings for an `aws` run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub log_group: String,
    pub log_stream_pattern: String,
    pub region: Option<String>,
    pub filter_pattern: Option<String>,
    pub start: Option<String>,
    pub end: Option<String>,
    pub watch: bool,
    pub poll_interval: Duration,
    pub http_timeout: Duration,
    pub color: bool,
    pub show_locals: bool,
    pub max_frames: usize,
}

impl Settings {
    pub fn resolve(cli: CliOverrides, file: FileConfig) -> Result<Self> {
        let log_group = cli
            .log_group
            .or(file.log_group)
            .map(|g| g.trim().to_string())
            .filter(|g| !g.is_empty())
            .ok_or(TailError::MissingLogGroup)?;

        let log_stream_pattern = cli
            .log_stream_pattern
            .or(file.log_stream_pattern)
            .filter(|p| !p.trim().is_empty())
            .unwrap_or_else(|| ALL_STREAMS.to_string());

        Ok(Self {
            log_group,
            log_stream_pattern,
            region: cli.region.or(file.region),
            filter_pattern: cli.filter_pattern.or(file.filter_pattern),
            start: cli.start.or(file.start),
            end: cli.end.or(file.end),
            watch: cli.watch || file.watch.unwrap_or(false),
            poll_interval: Duration::from_millis(
                file.poll_interval_ms.unwrap_or(DEFAULT_POLL_INTERVAL_MS),
            ),
            http_timeout: Duration::from_secs(
                file.http_timeout_secs.unwrap_or(DEFAULT_HTTP_TIMEOUT_SECS),
            ),
            color: !cli.no_color && file.color.unwrap_or(true),
            show_locals: file.show_locals.unwrap_or(true),
            max_frames: file.max_frames.unwrap_or(DEFAULT_MAX_FRAMES),
        })
    }

    /// Resolve the query window. A non-watch run without an end bound ends
    /// at `now`, so it drains what exists and exits.
    pub fn time_window(&self, now: DateTime<Utc>) -> Result<(Option<i64>, Option<EndBound>), TailError> {
        let start = self
            .start
            .as_deref()
            .map(|s| parse_start(s, now))
            .transpose()?;
        let end = match self.end.as_deref() {
            Some(e) => Some(parse_end(e, now)?),
            None if self.watch => None,
            None => Some(EndBound::Now),
        };
        Ok((start, end))
    }
}

pub fn default_config_path() -> PathBuf {
    ProjectDirs::from("dev", "lucid", "lucid-log")
        .map(|p| p.config_dir().join("config.toml"))
        .unwrap_or_else(|| PathBuf::from(".lucid-log/config.toml"))
}
