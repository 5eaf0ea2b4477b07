use std::{process, sync::Arc};

use blockpress::{
    application::{
        document::{DocumentOptions, DocumentService},
        error::AppError,
        fetch::{BlockFetcher, FetchOptions},
        render::RenderContext,
    },
    cache::{CacheConfig, ContentCache},
    config,
    domain::ids::PageId,
    infra::{
        error::InfraError,
        http::{self, RouterState},
        notion::NotionClient,
        telemetry,
    },
};
use tokio::{sync::watch, task::JoinHandle};
use tracing::{Dispatch, Level, debug, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
        config::Command::Render(args) => run_render(settings, args).await,
    }
}

struct ApplicationContext {
    documents: Arc<DocumentService>,
    cache: Arc<ContentCache>,
    cache_config: CacheConfig,
}

fn build_application_context(settings: &config::Settings) -> Result<ApplicationContext, AppError> {
    if settings.content.api_token.is_none() {
        warn!(
            target = "blockpress::bootstrap",
            "no content api token configured; requests will be unauthenticated"
        );
    }

    let client = NotionClient::new(&settings.content)?;
    let fetch_options = FetchOptions {
        page_size: settings.content.page_size.get(),
        concurrency: settings.content.fetch_concurrency.get() as usize,
        max_pages_per_parent: settings.content.max_pages_per_parent.get() as usize,
    };
    let fetcher = Arc::new(BlockFetcher::new(Arc::new(client), fetch_options));

    let cache_config = CacheConfig::from(&settings.cache);
    let cache = Arc::new(ContentCache::new());
    let options = DocumentOptions {
        fetch_depth: settings.content.fetch_depth.get() as usize,
        render: RenderContext::new(
            settings.render.sanitize,
            settings.render.max_depth.get() as usize,
        ),
        ttl: cache_config.document_ttl(),
        cache_enabled: cache_config.enabled,
    };
    let documents = Arc::new(DocumentService::new(fetcher, Arc::clone(&cache), options));

    Ok(ApplicationContext {
        documents,
        cache,
        cache_config,
    })
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let app = build_application_context(&settings)?;
    let sweeper = spawn_cache_sweeper(Arc::clone(&app.cache), &app.cache_config);

    let state = RouterState::new(
        app.documents,
        app.cache,
        settings.webhook.token.as_deref(),
    );
    let result = serve_http(&settings, state).await;

    sweeper.abort();
    let _ = sweeper.await;

    result
}

fn spawn_cache_sweeper(cache: Arc<ContentCache>, config: &CacheConfig) -> JoinHandle<()> {
    let period = config.sweep_interval();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.tick().await; // Skip the first immediate tick
        loop {
            interval.tick().await;
            let removed = cache.clean_expired();
            if removed > 0 {
                debug!(
                    target = "blockpress::cache::sweeper",
                    removed, "swept expired cache entries"
                );
            }
        }
    })
}

async fn serve_http(settings: &config::Settings, state: RouterState) -> Result<(), AppError> {
    let router = http::build_router(state);
    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;
    info!(
        target = "blockpress::bootstrap",
        addr = %settings.server.addr,
        "listening"
    );

    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
    let mut server = tokio::spawn(async move {
        axum::serve(listener, router.into_make_service())
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.changed().await;
            })
            .await
    });

    tokio::select! {
        joined = &mut server => return server_outcome(joined),
        signal = tokio::signal::ctrl_c() => {
            if let Err(err) = signal {
                warn!(target = "blockpress::bootstrap", error = %err, "failed to listen for ctrl-c");
            }
        }
    }

    info!(
        target = "blockpress::bootstrap",
        grace_secs = settings.server.graceful_shutdown.as_secs(),
        "shutdown requested; draining connections"
    );
    let _ = shutdown_tx.send(true);

    match tokio::time::timeout(settings.server.graceful_shutdown, &mut server).await {
        Ok(joined) => server_outcome(joined),
        Err(_) => {
            warn!(
                target = "blockpress::bootstrap",
                "graceful shutdown timed out; aborting open connections"
            );
            server.abort();
            Ok(())
        }
    }
}

fn server_outcome(
    joined: Result<std::io::Result<()>, tokio::task::JoinError>,
) -> Result<(), AppError> {
    match joined {
        Ok(Ok(())) => Ok(()),
        Ok(Err(err)) => Err(AppError::from(InfraError::from(err))),
        Err(err) => Err(AppError::unexpected(format!("server task failed: {err}"))),
    }
}

async fn run_render(settings: config::Settings, args: config::RenderArgs) -> Result<(), AppError> {
    let page_id = PageId::parse(&args.page_id)?;
    let app = build_application_context(&settings)?;
    let render = RenderContext::new(
        settings.render.sanitize,
        settings.render.max_depth.get() as usize,
    );

    let document = app.documents.render_uncached(&page_id, render).await?;

    if args.json {
        let json = serde_json::to_string_pretty(&document)
            .map_err(|err| AppError::unexpected(format!("failed to encode document: {err}")))?;
        println!("{json}");
    } else {
        println!("{}", document.html);
    }

    Ok(())
}
