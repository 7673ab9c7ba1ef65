// Main entry point for the gacha API

use anyhow::Context;
use gacha_api::api::{create_router, AppState};
use gacha_api::auth::engine::AuthorizationEngine;
use gacha_api::auth::jwks::JwksClient;
use gacha_api::config::Config;
use gacha_api::core::image::ImageLogic;
use gacha_api::core::user_alias::UserAliasLogic;
use gacha_api::core::user_image::UserImageLogic;
use gacha_api::state::image_store::InMemoryImageStore;
use gacha_api::state::key_set_cache::KeySetCache;
use gacha_api::state::user_alias_store::InMemoryUserAliasStore;
use gacha_api::state::user_image_store::InMemoryUserImageStore;

use std::sync::Arc;
use tokio::signal;
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Configuration comes first so logging can honor LOG_LEVEL / LOG_FORMAT
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    init_tracing(&config);

    info!("Starting gacha API");
    info!(
        bind_address = %config.bind_address,
        port = config.port,
        issuers = ?config.allowed_issuers,
        algorithms = ?config.algorithms,
        jwks_cache_ttl_secs = config.jwks_cache_ttl_secs,
        "Configuration loaded"
    );

    let jwks_client = JwksClient::new(config.jwks_fetch_timeout_secs)
        .context("Failed to initialize JWKS client")?;
    let key_sets = Arc::new(
        KeySetCache::new(
            Arc::new(jwks_client),
            config.jwks_cache_ttl_secs,
            config.jwks_cache_max_issuers,
        )
        .with_min_refresh_interval(config.jwks_min_refresh_secs),
    );
    if !key_sets.is_caching() {
        info!("JWKS caching disabled, key sets are fetched on every request");
    }

    let engine = Arc::new(AuthorizationEngine::new(config.authorization(), key_sets));
    let alias_store = Arc::new(InMemoryUserAliasStore::new());
    let image_store = Arc::new(InMemoryImageStore::new());
    let user_image_store = Arc::new(InMemoryUserImageStore::new());

    let app_state = AppState {
        engine,
        user_aliases: Arc::new(UserAliasLogic::new(alias_store.clone())),
        images: Arc::new(ImageLogic::new(
            image_store.clone(),
            user_image_store.clone(),
            alias_store,
        )),
        user_images: Arc::new(UserImageLogic::new(user_image_store, image_store)),
        config: Arc::new(config.clone()),
    };

    let router = create_router(&app_state).with_state(app_state);
    info!("Router created");

    let addr = format!("{}:{}", config.bind_address, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    info!(addr = %addr, "Server listening on {}", addr);

    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| {
            error!(error = %e, "Server error");
            e
        })?;

    info!("Server shutdown complete");
    Ok(())
}

/// Initialize tracing subscriber based on configuration
///
/// `RUST_LOG` wins over `LOG_LEVEL` when set.
fn init_tracing(config: &Config) {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let subscriber = fmt()
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_env_filter(filter);

    if config.log_format == "json" {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Ctrl+C received, starting graceful shutdown");
        },
        _ = terminate => {
            info!("SIGTERM received, starting graceful shutdown");
        },
    }
}
