use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, builder::BoolishValueParser};

/// Command-line arguments for the blockpress binary.
#[derive(Debug, Parser)]
#[command(
    name = "blockpress",
    version,
    about = "Render block-based documents into sanitized HTML"
)]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "BLOCKPRESS_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run the document HTTP service.
    Serve(Box<ServeArgs>),
    /// Fetch and render a single page, printing the result to stdout.
    Render(RenderArgs),
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub overrides: ServeOverrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ContentOverrides {
    /// Override the content service base URL.
    #[arg(long = "content-base-url", value_name = "URL")]
    pub base_url: Option<String>,

    /// Override the content service integration token.
    #[arg(long = "content-api-token", env = "BLOCKPRESS_CONTENT_TOKEN", value_name = "TOKEN")]
    pub api_token: Option<String>,

    /// Override how many levels of nested blocks are fetched.
    #[arg(long = "content-fetch-depth", value_name = "LEVELS")]
    pub fetch_depth: Option<u32>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeOverrides {
    #[command(flatten)]
    pub content: ContentOverrides,

    /// Override the listener host.
    #[arg(long = "server-host", value_name = "HOST")]
    pub server_host: Option<String>,

    /// Override the listener port.
    #[arg(long = "server-port", value_name = "PORT")]
    pub server_port: Option<u16>,

    /// Override the graceful shutdown timeout.
    #[arg(long = "server-graceful-shutdown-seconds", value_name = "SECONDS")]
    pub server_graceful_shutdown_seconds: Option<u64>,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,

    /// Toggle the rendered-document cache.
    #[arg(
        long = "cache-enabled",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub cache_enabled: Option<bool>,

    /// Override how long rendered documents stay cached; 0 keeps them until invalidated.
    #[arg(long = "cache-document-ttl-seconds", value_name = "SECONDS")]
    pub cache_document_ttl_seconds: Option<u64>,
}

#[derive(Debug, Args, Clone)]
pub struct RenderArgs {
    /// Page to render, in compact or hyphenated form.
    #[arg(value_name = "PAGE_ID")]
    pub page_id: String,

    #[command(flatten)]
    pub content: ContentOverrides,

    /// Skip the sanitizer; tags are still balanced.
    #[arg(long = "no-sanitize", action = clap::ArgAction::SetTrue)]
    pub no_sanitize: bool,

    /// Print the rendered document as JSON instead of bare HTML.
    #[arg(long, action = clap::ArgAction::SetTrue)]
    pub json: bool,

    /// Override the render nesting limit.
    #[arg(long = "max-depth", value_name = "LEVELS")]
    pub max_depth: Option<u32>,
}
