use std::collections::HashMap;
use std::str::FromStr;

use serde::Deserialize;

use crate::time::TimeDelta;
use crate::units::{DataRate, DataSize};

/// The full description of a simulated topology: the hosts present, the
/// links between them, and how the run should log.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default = "default_workers")]
    pub workers: usize,
    pub hosts: Vec<HostConfig>,
    #[serde(default)]
    pub links: Vec<LinkConfig>,
}

/// Available parallelism, clamped to 4 — matches the original's fixed
/// worker-pool sizing policy, which never scheduled more than 4 callback
/// threads regardless of host core count.
fn default_workers() -> usize {
    std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1).min(4)
}

#[derive(Debug, Clone, Deserialize)]
pub struct HostConfig {
    pub name: String,
    /// The address this host's simulated interface answers to; links
    /// route by this, not by name.
    pub address: std::net::Ipv4Addr,
    /// LXC template to provision this host from, e.g. `"download"`.
    #[serde(default = "default_template")]
    pub template: String,
}

fn default_template() -> String {
    "download".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct LinkConfig {
    pub from: String,
    pub to: String,
    #[serde(default)]
    pub loss: f64,
    #[serde(default, deserialize_with = "deserialize_time_delta_opt")]
    pub delay: Option<TimeDelta>,
    #[serde(default, deserialize_with = "deserialize_rate_opt")]
    pub rate: Option<DataRate>,
    #[serde(default, deserialize_with = "deserialize_size_opt")]
    pub buffer: Option<DataSize>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl Default for LogLevel {
    fn default() -> Self {
        LogLevel::Info
    }
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct LoggingConfig {
    #[serde(default)]
    pub level: LogLevel,
    /// Directory log files are rotated into, `out/` by default.
    #[serde(default = "default_log_dir")]
    pub directory: String,
}

fn default_log_dir() -> String {
    "out".to_string()
}

fn deserialize_time_delta_opt<'de, D>(deserializer: D) -> Result<Option<TimeDelta>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    raw.map(|s| TimeDelta::from_str(&s).map_err(serde::de::Error::custom)).transpose()
}

fn deserialize_rate_opt<'de, D>(deserializer: D) -> Result<Option<DataRate>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    raw.map(|s| DataRate::from_str(&s).map_err(serde::de::Error::custom)).transpose()
}

fn deserialize_size_opt<'de, D>(deserializer: D) -> Result<Option<DataSize>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    raw.map(|s| DataSize::from_str(&s).map_err(serde::de::Error::custom)).transpose()
}

impl Config {
    pub fn host_names(&self) -> HashMap<&str, &HostConfig> {
        self.hosts.iter().map(|h| (h.name.as_str(), h)).collect()
    }
}
