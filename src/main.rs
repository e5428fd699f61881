//! Backdrop - background removal over HTTP.
//!
//! This binary starts the HTTP server and configures all components.

use clap::Parser;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use backdrop::{
    config::{Config, RemovalBackend},
    error::RemovalError,
    process::{Compositor, ProcessService},
    remover::{BackgroundRemover, ChromaKeyRemover},
    server::{create_router, RouterConfig},
    storage::ArtifactStore,
};

#[tokio::main]
async fn main() -> ExitCode {
    let config = Config::parse();

    // Initialize logging
    init_logging(config.verbose);

    // Validate configuration
    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    print_banner();

    info!("Configuration:");
    info!("  Upload dir: {}", config.upload_dir.display());
    info!("  Output dir: {}", config.output_dir.display());
    info!("  Max body: {} bytes", config.max_body_bytes);
    info!("  Blur radius: {}", config.blur_radius);
    match config.inference_timeout() {
        Some(timeout) => info!("  Processing timeout: {:?}", timeout),
        None => info!("  Processing timeout: none"),
    }
    match config.retention() {
        Some(retention) => info!(
            "  Retention: {:?} (sweep every {:?})",
            retention,
            config.sweep_interval()
        ),
        None => warn!("  Retention: DISABLED - uploads and outputs are never deleted"),
    }

    // Prepare working directories
    let store = ArtifactStore::new(&config.upload_dir, &config.output_dir);
    if let Err(e) = store.ensure_dirs().await {
        error!("{}", e);
        return ExitCode::FAILURE;
    }

    // Load the background remover
    let remover = match build_remover(&config) {
        Ok(remover) => remover,
        Err(e) => {
            error!("Failed to initialize background remover: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Some(retention) = config.retention() {
        spawn_retention_sweeper(store.clone(), retention, config.sweep_interval());
    }

    let service = ProcessService::new(store, remover)
        .with_compositor(Compositor::new(config.blur_radius))
        .with_timeout(config.inference_timeout());
    info!("  Backend: {}", service.remover_name());

    let router = create_router(service, build_router_config(&config));

    // Bind and serve
    let addr = config.bind_address();

    info!("");
    info!("────────────────────────────────────────────────────────────────");
    info!("  Server listening on: http://{}", addr);
    info!("");
    info!("  Try these endpoints:");
    info!("    curl http://{}/health", addr);
    info!(
        "    curl -F file=@photo.jpg http://{}/remove-bg -o cutout.png",
        addr
    );
    info!("────────────────────────────────────────────────────────────────");
    info!("");

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind to {}: {}", addr, e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = axum::serve(listener, router).await {
        error!("Server error: {}", e);
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

/// Print the startup banner.
fn print_banner() {
    let version = env!("CARGO_PKG_VERSION");
    info!("");
    info!("██████╗  █████╗  ██████╗██╗  ██╗██████╗ ██████╗  ██████╗ ██████╗ ");
    info!("██╔══██╗██╔══██╗██╔════╝██║ ██╔╝██╔══██╗██╔══██╗██╔═══██╗██╔══██╗");
    info!("██████╔╝███████║██║     █████╔╝ ██║  ██║██████╔╝██║   ██║██████╔╝");
    info!("██╔══██╗██╔══██║██║     ██╔═██╗ ██║  ██║██╔══██╗██║   ██║██╔═══╝ ");
    info!("██████╔╝██║  ██║╚██████╗██║  ██╗██████╔╝██║  ██║╚██████╔╝██║     ");
    info!("╚═════╝ ╚═╝  ╚═╝ ╚═════╝╚═╝  ╚═╝╚═════╝ ╚═╝  ╚═╝ ╚═════╝ ╚═╝     ");
    info!("");
    info!("                            v{}", version);
}

/// Initialize the tracing/logging subsystem.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "backdrop=debug,tower_http=debug"
    } else {
        "backdrop=info,tower_http=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Construct the configured background remover.
fn build_remover(config: &Config) -> Result<Arc<dyn BackgroundRemover>, RemovalError> {
    match config.backend {
        RemovalBackend::Chroma => Ok(Arc::new(ChromaKeyRemover::new(config.chroma_tolerance))),
        RemovalBackend::U2net => load_u2net(config),
    }
}

#[cfg(feature = "tract")]
fn load_u2net(config: &Config) -> Result<Arc<dyn BackgroundRemover>, RemovalError> {
    let path = config
        .model_path
        .as_deref()
        .ok_or_else(|| RemovalError::Model("no model path configured".to_string()))?;
    let remover = backdrop::remover::U2NetRemover::load(path, config.model_input_size)?;
    Ok(Arc::new(remover))
}

#[cfg(not(feature = "tract"))]
fn load_u2net(_config: &Config) -> Result<Arc<dyn BackgroundRemover>, RemovalError> {
    Err(RemovalError::Model(
        "built without the `tract` feature".to_string(),
    ))
}

/// Periodically delete uploads and outputs older than `retention`.
fn spawn_retention_sweeper(store: ArtifactStore, retention: Duration, every: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        loop {
            ticker.tick().await;
            match store.prune_older_than(retention).await {
                Ok(0) => debug!("Retention sweep found nothing to delete"),
                Ok(removed) => info!(removed, "Retention sweep deleted expired files"),
                Err(e) => warn!("Retention sweep failed: {}", e),
            }
        }
    });
}

/// Build RouterConfig from the application Config.
fn build_router_config(config: &Config) -> RouterConfig {
    let mut router_config = RouterConfig::new().with_max_body_bytes(config.max_body_bytes);

    // Apply CORS origins
    if let Some(ref origins) = config.cors_origins {
        router_config = router_config.with_cors_origins(origins.clone());
    }

    router_config.with_tracing(!config.no_tracing)
}
