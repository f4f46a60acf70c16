//! Configuration layer: typed settings with layered precedence (file → env → CLI).

mod cli;

use std::{net::SocketAddr, str::FromStr, time::Duration};

use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;
use url::Url;

pub use cli::{CliArgs, Command, ServeArgs, ServeOverrides};

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "todo-plugin";
const ENV_PREFIX: &str = "TODO_PLUGIN";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_GRACEFUL_SHUTDOWN_SECS: u64 = 30;
const DEFAULT_API_BASE_URL: &str = "http://127.0.0.1:3000";
const DEFAULT_API_BASE_PATH: &str = "/api/data";
const DEFAULT_SITE_BASE_URL: &str = "http://127.0.0.1:3000";
const DEFAULT_SITE_BASE_PATH: &str = "/pages";
const DEFAULT_STALE_TIME_SECS: u64 = 60;

/// Fully-resolved settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub logging: LoggingSettings,
    pub plugin: PluginSettings,
    pub cache: CacheSettings,
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub addr: SocketAddr,
    pub graceful_shutdown: Duration,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

/// Where the API lives and where the pages are published.
#[derive(Debug, Clone)]
pub struct PluginSettings {
    pub api_base_url: String,
    pub api_base_path: String,
    pub site_base_url: String,
    pub site_base_path: String,
}

#[derive(Debug, Clone)]
pub struct CacheSettings {
    pub stale_time: Duration,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix(ENV_PREFIX).separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;

    match cli.command.as_ref() {
        Some(Command::Serve(args)) => raw.apply_serve_overrides(&args.overrides),
        None => raw.apply_serve_overrides(&ServeOverrides::default()),
    }

    Settings::from_raw(raw)
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    server: RawServerSettings,
    logging: RawLoggingSettings,
    plugin: RawPluginSettings,
    cache: RawCacheSettings,
}

impl RawSettings {
    fn apply_serve_overrides(&mut self, overrides: &ServeOverrides) {
        if let Some(host) = overrides.server_host.as_ref() {
            self.server.host = Some(host.clone());
        }
        if let Some(port) = overrides.server_port {
            self.server.port = Some(port);
        }
        if let Some(seconds) = overrides.server_graceful_shutdown_seconds {
            self.server.graceful_shutdown_seconds = Some(seconds);
        }
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
        if let Some(url) = overrides.api_base_url.as_ref() {
            self.plugin.api_base_url = Some(url.clone());
        }
        if let Some(path) = overrides.api_base_path.as_ref() {
            self.plugin.api_base_path = Some(path.clone());
        }
        if let Some(url) = overrides.site_base_url.as_ref() {
            self.plugin.site_base_url = Some(url.clone());
        }
        if let Some(path) = overrides.site_base_path.as_ref() {
            self.plugin.site_base_path = Some(path.clone());
        }
        if let Some(seconds) = overrides.cache_stale_time_seconds {
            self.cache.stale_time_seconds = Some(seconds);
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            server,
            logging,
            plugin,
            cache,
        } = raw;

        Ok(Self {
            server: build_server_settings(server)?,
            logging: build_logging_settings(logging)?,
            plugin: build_plugin_settings(plugin)?,
            cache: build_cache_settings(cache),
        })
    }
}

fn build_server_settings(server: RawServerSettings) -> Result<ServerSettings, LoadError> {
    let host = server.host.unwrap_or_else(|| DEFAULT_HOST.to_string());
    let port = server.port.unwrap_or(DEFAULT_PORT);
    if port == 0 {
        return Err(LoadError::invalid(
            "server.port",
            "port must be greater than zero",
        ));
    }
    let addr = parse_socket_addr(&host, port)
        .map_err(|reason| LoadError::invalid("server.addr", reason))?;

    let graceful_secs = server
        .graceful_shutdown_seconds
        .unwrap_or(DEFAULT_GRACEFUL_SHUTDOWN_SECS);
    if graceful_secs == 0 {
        return Err(LoadError::invalid(
            "server.graceful_shutdown_seconds",
            "must be greater than zero",
        ));
    }

    Ok(ServerSettings {
        addr,
        graceful_shutdown: Duration::from_secs(graceful_secs),
    })
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_plugin_settings(plugin: RawPluginSettings) -> Result<PluginSettings, LoadError> {
    let api_base_url = base_url(
        plugin.api_base_url,
        DEFAULT_API_BASE_URL,
        "plugin.api_base_url",
    )?;
    let site_base_url = base_url(
        plugin.site_base_url,
        DEFAULT_SITE_BASE_URL,
        "plugin.site_base_url",
    )?;
    let api_base_path = base_path(
        plugin.api_base_path,
        DEFAULT_API_BASE_PATH,
        "plugin.api_base_path",
    )?;
    let site_base_path = base_path(
        plugin.site_base_path,
        DEFAULT_SITE_BASE_PATH,
        "plugin.site_base_path",
    )?;

    if api_base_path == site_base_path {
        return Err(LoadError::invalid(
            "plugin.site_base_path",
            "must differ from plugin.api_base_path",
        ));
    }

    Ok(PluginSettings {
        api_base_url,
        api_base_path,
        site_base_url,
        site_base_path,
    })
}

fn build_cache_settings(cache: RawCacheSettings) -> CacheSettings {
    CacheSettings {
        stale_time: Duration::from_secs(
            cache.stale_time_seconds.unwrap_or(DEFAULT_STALE_TIME_SECS),
        ),
    }
}

/// An absolute http(s) origin, kept without a trailing slash.
fn base_url(value: Option<String>, default: &str, key: &'static str) -> Result<String, LoadError> {
    let value = value.unwrap_or_else(|| default.to_string());
    let trimmed = value.trim().trim_end_matches('/');
    let parsed = Url::parse(trimmed).map_err(|err| LoadError::invalid(key, err.to_string()))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(LoadError::invalid(key, "scheme must be http or https"));
    }
    Ok(trimmed.to_string())
}

/// A path with a leading slash and no trailing slash; the root is `""`.
fn base_path(value: Option<String>, default: &str, key: &'static str) -> Result<String, LoadError> {
    let value = value.unwrap_or_else(|| default.to_string());
    let trimmed = value.trim();
    if !trimmed.is_empty() && !trimmed.starts_with('/') {
        return Err(LoadError::invalid(key, "must start with `/`"));
    }
    if trimmed.contains(['?', '#']) {
        return Err(LoadError::invalid(key, "must not contain a query or fragment"));
    }
    Ok(trimmed.trim_end_matches('/').to_string())
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawServerSettings {
    host: Option<String>,
    port: Option<u16>,
    graceful_shutdown_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawPluginSettings {
    api_base_url: Option<String>,
    api_base_path: Option<String>,
    site_base_url: Option<String>,
    site_base_path: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawCacheSettings {
    stale_time_seconds: Option<u64>,
}

fn parse_socket_addr(host: &str, port: u16) -> Result<SocketAddr, String> {
    let candidate = format!("{host}:{port}");
    candidate
        .parse()
        .map_err(|err| format!("invalid address `{candidate}`: {err}"))
}

/// Resolve configuration using the supplied CLI arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}
