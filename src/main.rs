//! Entitlement Sync server
//!
//! Loads configuration, wires the provider adapters into the reconciliation
//! engine and serves the checkout API until SIGINT/SIGTERM.

use std::error::Error;
use std::path::Path;
use std::sync::Arc;

use axum::{routing::get, Json, Router};
use serde::Serialize;
use tokio::{net::TcpListener, signal};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use entitlement_sync::adapters::app_store::{AppStoreServerApi, FallbackAppStoreClient};
use entitlement_sync::adapters::google_play::{
    BearerTokenCache, GooglePlayDeveloperApi, HttpTokenExchanger,
};
use entitlement_sync::adapters::http::{checkout_router, CheckoutAppState};
use entitlement_sync::adapters::memory::InMemoryUserRepository;
use entitlement_sync::adapters::postgres::PostgresUserRepository;
use entitlement_sync::adapters::stripe::StripePaymentAdapter;
use entitlement_sync::application::handlers::entitlement::{
    EntitlementVerifier, NotificationParser, ReconciliationEngine,
};
use entitlement_sync::config::{AppConfig, DatabaseConfig, ServerConfig};
use entitlement_sync::domain::trust::SignedPayloadVerifier;
use entitlement_sync::ports::{
    AppStoreClient, AppStoreEnvironment, PlayStoreClient, UserRepository, WebPaymentProvider,
};

#[derive(Serialize)]
struct Health {
    status: &'static str,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let config = AppConfig::load()?;
    init_tracing(&config.server);
    config.validate()?;

    let addr = config.server.socket_addr()?;
    info!(
        %addr,
        environment = ?config.server.environment,
        test_mode = config.stripe.is_test_mode(),
        "starting entitlement-sync"
    );

    let users = user_repository(config.database.as_ref()).await?;

    let web_payments: Arc<dyn WebPaymentProvider> =
        Arc::new(StripePaymentAdapter::new(config.stripe.adapter_config()));

    let production = AppStoreServerApi::new(
        config.app_store.api_config(AppStoreEnvironment::Production),
    )?;
    let sandbox =
        AppStoreServerApi::new(config.app_store.api_config(AppStoreEnvironment::Sandbox))?;
    let app_store: Arc<dyn AppStoreClient> = Arc::new(FallbackAppStoreClient::new(
        Arc::new(production),
        Arc::new(sandbox),
    ));

    let tokens = Arc::new(BearerTokenCache::new(
        config.google_play.signer()?,
        Arc::new(HttpTokenExchanger::new(config.google_play.token_uri.clone())),
    ));
    let play_store: Arc<dyn PlayStoreClient> = Arc::new(GooglePlayDeveloperApi::new(
        config.google_play.package_name.clone(),
        tokens,
    ));

    let roots = config.trust.root_store()?;
    info!(roots = roots.len(), "loaded trusted root certificates");
    let signed_payloads = Arc::new(SignedPayloadVerifier::new(Arc::new(roots)));

    let engine = Arc::new(ReconciliationEngine::new(users.clone()));
    let notification_parser = Arc::new(NotificationParser::new(
        web_payments.clone(),
        signed_payloads.clone(),
        play_store.clone(),
        config.app_store.bundle_id.clone(),
    ));
    let entitlement_verifier = Arc::new(
        EntitlementVerifier::new(app_store, play_store, signed_payloads)
            .with_android_product_id(config.google_play.product_id.clone()),
    );

    let state = CheckoutAppState {
        users,
        web_payments,
        notification_parser,
        entitlement_verifier,
        engine,
        checkout_redirect_url: config.stripe.checkout_redirect_url.clone(),
        portal_return_urls: config.stripe.portal_return_urls(),
    };

    let app = Router::new()
        .route("/healthz", get(|| async { Json(Health { status: "ok" }) }))
        .merge(checkout_router().with_state(state))
        .layer(TimeoutLayer::new(config.server.request_timeout()))
        .layer(TraceLayer::new_for_http());

    let listener = TcpListener::bind(addr).await?;

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("server stopped");
    Ok(())
}

fn init_tracing(server: &ServerConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&server.log_level));

    if server.json_logs() {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_target(true))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().pretty().with_target(true))
            .init();
    }
}

async fn user_repository(
    database: Option<&DatabaseConfig>,
) -> Result<Arc<dyn UserRepository>, Box<dyn Error>> {
    let Some(database) = database else {
        warn!("no database configured, plan state is kept in memory");
        return Ok(Arc::new(InMemoryUserRepository::new()));
    };

    let pool = database.connect().await?;
    if database.run_migrations {
        sqlx::migrate::Migrator::new(Path::new(&database.migrations_dir))
            .await?
            .run(&pool)
            .await?;
        info!(dir = %database.migrations_dir, "migrations applied");
    }

    Ok(Arc::new(PostgresUserRepository::new(pool)))
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        tokio::select! {
            _ = ctrl_c() => {},
            _ = terminate() => {},
        }
    }

    #[cfg(not(unix))]
    {
        ctrl_c().await;
    }
}

async fn ctrl_c() {
    if let Err(err) = signal::ctrl_c().await {
        warn!(?err, "failed to install Ctrl+C handler");
    }
}

#[cfg(unix)]
async fn terminate() {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut term) => {
            term.recv().await;
        }
        Err(err) => warn!(?err, "failed to install SIGTERM handler"),
    }
}
