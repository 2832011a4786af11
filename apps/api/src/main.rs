mod auth;
mod boarding;
mod candidates;
mod config;
mod db;
mod errors;
mod llm_client;
mod mailer;
mod models;
mod notifications;
mod offers;
mod performance;
mod pipeline;
mod routes;
mod state;
mod storage;
mod training;
mod uploads;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::http::{header, HeaderValue, Method};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::auth::TokenKeys;
use crate::config::Config;
use crate::db::create_pool;
use crate::llm_client::LlmClient;
use crate::mailer::Mailer;
use crate::offers::OfferRenderer;
use crate::performance::jira::JiraClient;
use crate::routes::build_router;
use crate::state::AppState;
use crate::storage::Storage;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Talentdesk API v{}", env!("CARGO_PKG_VERSION"));

    let db = create_pool(&config.database_url).await?;

    let redis = redis::Client::open(config.redis_url.clone())?
        .get_multiplexed_async_connection()
        .await
        .context("Failed to connect to Redis")?;
    info!("Redis connection established");

    let storage = Storage::connect(&config).await;
    info!("S3 client initialized (bucket: {})", config.s3_bucket);

    let llm = LlmClient::new(config.anthropic_api_key.clone())?;
    info!("LLM client initialized (model: {})", llm_client::MODEL);

    let mailer = Mailer::new(&config.mail)?;
    let offers = OfferRenderer::from_config(&config)?;

    let jira = config.jira.clone().map(JiraClient::new).transpose()?;
    if jira.is_none() {
        info!("Jira not configured; sync-jira will return 503");
    }

    if let Some(seed) = &config.seed_admin {
        auth::users::ensure_seed_admin(&db, seed)
            .await
            .context("Failed to create seed admin")?;
    }

    let cors = cors_layer(config.client_url.as_deref())?;
    let port = config.port;

    let state = AppState {
        db,
        redis,
        storage,
        llm,
        tokens: Arc::new(TokenKeys::new(&config.jwt_secret)),
        mailer: Arc::new(mailer),
        offers: Arc::new(offers),
        jira,
        config: Arc::new(config),
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    let addr: SocketAddr = format!("0.0.0.0:{port}").parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Credentialed CORS for the configured client origin; permissive otherwise.
fn cors_layer(client_url: Option<&str>) -> Result<CorsLayer> {
    let Some(origin) = client_url else {
        return Ok(CorsLayer::permissive());
    };
    let origin = HeaderValue::from_str(origin.trim_end_matches('/'))
        .with_context(|| format!("CLIENT_URL '{origin}' is not a valid origin"))?;

    Ok(CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT]))
}
