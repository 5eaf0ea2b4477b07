//! Configuration layer: typed settings with layered precedence (file → env → CLI).

use std::{net::SocketAddr, num::NonZeroU32, str::FromStr, time::Duration};

use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;
use url::Url;

mod cli;

pub use cli::{CliArgs, Command, ContentOverrides, RenderArgs, ServeArgs, ServeOverrides};

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "blockpress";
const ENV_PREFIX: &str = "BLOCKPRESS";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_GRACEFUL_SHUTDOWN_SECS: u64 = 30;
const DEFAULT_CONTENT_BASE_URL: &str = "https://api.notion.com";
const DEFAULT_CONTENT_API_VERSION: &str = "2022-06-28";
const DEFAULT_CONTENT_PAGE_SIZE: u64 = 100;
const MAX_CONTENT_PAGE_SIZE: u64 = 100;
const DEFAULT_CONTENT_FETCH_DEPTH: u64 = 3;
const DEFAULT_CONTENT_REQUEST_TIMEOUT_SECS: u64 = 15;
const DEFAULT_CONTENT_FETCH_CONCURRENCY: u64 = 4;
const DEFAULT_CONTENT_MAX_PAGES_PER_PARENT: u64 = 50;
const DEFAULT_RENDER_MAX_DEPTH: u64 = 8;
const DEFAULT_CACHE_DOCUMENT_TTL_SECS: u64 = 600;
const DEFAULT_CACHE_SWEEP_INTERVAL_SECS: u64 = 60;

/// Fully-resolved deployment settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub logging: LoggingSettings,
    pub content: ContentSettings,
    pub render: RenderSettings,
    pub cache: CacheSettings,
    pub webhook: WebhookSettings,
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

/// Connection to the remote block-based content service.
#[derive(Debug, Clone)]
pub struct ContentSettings {
    pub base_url: Url,
    pub api_token: Option<String>,
    pub api_version: String,
    pub page_size: NonZeroU32,
    pub fetch_depth: NonZeroU32,
    pub request_timeout: Duration,
    pub fetch_concurrency: NonZeroU32,
    pub max_pages_per_parent: NonZeroU32,
}

#[derive(Debug, Clone)]
pub struct RenderSettings {
    pub sanitize: bool,
    pub max_depth: NonZeroU32,
}

#[derive(Debug, Clone)]
pub struct CacheSettings {
    pub enabled: bool,
    /// Zero keeps rendered documents until a change notification evicts them.
    pub document_ttl_secs: u64,
    pub sweep_interval: Duration,
}

#[derive(Debug, Clone)]
pub struct WebhookSettings {
    /// Shared token expected in the `x-webhook-token` header; `None` accepts every sender.
    pub token: Option<String>,
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
        Some(Command::Render(args)) => raw.apply_render_overrides(args),
        None => raw.apply_serve_overrides(&ServeOverrides::default()),
    }

    Settings::from_raw(raw)
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    server: RawServerSettings,
    logging: RawLoggingSettings,
    content: RawContentSettings,
    render: RawRenderSettings,
    cache: RawCacheSettings,
    webhook: RawWebhookSettings,
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
        if let Some(enabled) = overrides.cache_enabled {
            self.cache.enabled = Some(enabled);
        }
        if let Some(ttl) = overrides.cache_document_ttl_seconds {
            self.cache.document_ttl_seconds = Some(ttl);
        }

        self.apply_content_overrides(&overrides.content);
    }

    fn apply_render_overrides(&mut self, args: &RenderArgs) {
        if args.no_sanitize {
            self.render.sanitize = Some(false);
        }
        if let Some(depth) = args.max_depth {
            self.render.max_depth = Some(depth.into());
        }

        self.apply_content_overrides(&args.content);
    }

    fn apply_content_overrides(&mut self, overrides: &ContentOverrides) {
        if let Some(url) = overrides.base_url.as_ref() {
            self.content.base_url = Some(url.clone());
        }
        if let Some(token) = overrides.api_token.as_ref() {
            self.content.api_token = Some(token.clone());
        }
        if let Some(depth) = overrides.fetch_depth {
            self.content.fetch_depth = Some(depth.into());
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            server,
            logging,
            content,
            render,
            cache,
            webhook,
        } = raw;

        let server = build_server_settings(server)?;
        let logging = build_logging_settings(logging)?;
        let content = build_content_settings(content)?;
        let render = build_render_settings(render)?;
        let cache = build_cache_settings(cache)?;
        let webhook = build_webhook_settings(webhook);

        Ok(Self {
            server,
            logging,
            content,
            render,
            cache,
            webhook,
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

fn build_content_settings(content: RawContentSettings) -> Result<ContentSettings, LoadError> {
    let raw_url = content
        .base_url
        .unwrap_or_else(|| DEFAULT_CONTENT_BASE_URL.to_string());
    let base_url = Url::parse(raw_url.trim())
        .map_err(|err| LoadError::invalid("content.base_url", format!("invalid url: {err}")))?;
    if !matches!(base_url.scheme(), "http" | "https") {
        return Err(LoadError::invalid(
            "content.base_url",
            "scheme must be http or https",
        ));
    }

    let api_token = non_blank(content.api_token);
    let api_version = non_blank(content.api_version)
        .unwrap_or_else(|| DEFAULT_CONTENT_API_VERSION.to_string());

    let page_size_value = content.page_size.unwrap_or(DEFAULT_CONTENT_PAGE_SIZE);
    if page_size_value > MAX_CONTENT_PAGE_SIZE {
        return Err(LoadError::invalid(
            "content.page_size",
            format!("must not exceed {MAX_CONTENT_PAGE_SIZE}"),
        ));
    }
    let page_size = non_zero_u32(page_size_value, "content.page_size")?;

    let fetch_depth = non_zero_u32(
        content.fetch_depth.unwrap_or(DEFAULT_CONTENT_FETCH_DEPTH),
        "content.fetch_depth",
    )?;

    let timeout_secs = content
        .request_timeout_seconds
        .unwrap_or(DEFAULT_CONTENT_REQUEST_TIMEOUT_SECS);
    if timeout_secs == 0 {
        return Err(LoadError::invalid(
            "content.request_timeout_seconds",
            "must be greater than zero",
        ));
    }

    let fetch_concurrency = non_zero_u32(
        content
            .fetch_concurrency
            .unwrap_or(DEFAULT_CONTENT_FETCH_CONCURRENCY),
        "content.fetch_concurrency",
    )?;
    let max_pages_per_parent = non_zero_u32(
        content
            .max_pages_per_parent
            .unwrap_or(DEFAULT_CONTENT_MAX_PAGES_PER_PARENT),
        "content.max_pages_per_parent",
    )?;

    Ok(ContentSettings {
        base_url,
        api_token,
        api_version,
        page_size,
        fetch_depth,
        request_timeout: Duration::from_secs(timeout_secs),
        fetch_concurrency,
        max_pages_per_parent,
    })
}

fn build_render_settings(render: RawRenderSettings) -> Result<RenderSettings, LoadError> {
    let max_depth = non_zero_u32(
        render.max_depth.unwrap_or(DEFAULT_RENDER_MAX_DEPTH),
        "render.max_depth",
    )?;

    Ok(RenderSettings {
        sanitize: render.sanitize.unwrap_or(true),
        max_depth,
    })
}

fn build_cache_settings(cache: RawCacheSettings) -> Result<CacheSettings, LoadError> {
    let sweep_secs = cache
        .sweep_interval_seconds
        .unwrap_or(DEFAULT_CACHE_SWEEP_INTERVAL_SECS);
    if sweep_secs == 0 {
        return Err(LoadError::invalid(
            "cache.sweep_interval_seconds",
            "must be greater than zero",
        ));
    }

    Ok(CacheSettings {
        enabled: cache.enabled.unwrap_or(true),
        document_ttl_secs: cache
            .document_ttl_seconds
            .unwrap_or(DEFAULT_CACHE_DOCUMENT_TTL_SECS),
        sweep_interval: Duration::from_secs(sweep_secs),
    })
}

fn build_webhook_settings(webhook: RawWebhookSettings) -> WebhookSettings {
    WebhookSettings {
        token: non_blank(webhook.token),
    }
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
struct RawContentSettings {
    base_url: Option<String>,
    api_token: Option<String>,
    api_version: Option<String>,
    page_size: Option<u64>,
    fetch_depth: Option<u64>,
    request_timeout_seconds: Option<u64>,
    fetch_concurrency: Option<u64>,
    max_pages_per_parent: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawRenderSettings {
    sanitize: Option<bool>,
    max_depth: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawCacheSettings {
    enabled: Option<bool>,
    document_ttl_seconds: Option<u64>,
    sweep_interval_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawWebhookSettings {
    token: Option<String>,
}

fn parse_socket_addr(host: &str, port: u16) -> Result<SocketAddr, String> {
    let candidate = format!("{host}:{port}");
    candidate
        .parse()
        .map_err(|err| format!("invalid address `{candidate}`: {err}"))
}

fn non_zero_u32(value: u64, key: &'static str) -> Result<NonZeroU32, LoadError> {
    if value == 0 {
        return Err(LoadError::invalid(key, "must be greater than zero"));
    }
    let value_u32: u32 = value
        .try_into()
        .map_err(|_| LoadError::invalid(key, "value exceeds supported range for u32"))?;
    NonZeroU32::new(value_u32).ok_or_else(|| LoadError::invalid(key, "must be greater than zero"))
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.and_then(|value| {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    })
}

/// Resolve configuration using the supplied CLI arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}
