use std::sync::Arc;

use redis::aio::MultiplexedConnection;
use sqlx::PgPool;

use crate::auth::TokenKeys;
use crate::config::Config;
use crate::llm_client::LlmClient;
use crate::mailer::Mailer;
use crate::offers::OfferRenderer;
use crate::performance::jira::JiraClient;
use crate::storage::Storage;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    /// Revoked session ids. One multiplexed connection shared by every request.
    pub redis: MultiplexedConnection,
    pub storage: Storage,
    pub llm: LlmClient,
    pub config: Arc<Config>,
    pub tokens: Arc<TokenKeys>,
    pub mailer: Arc<Mailer>,
    pub offers: Arc<OfferRenderer>,
    /// `None` unless the Jira variables are set.
    pub jira: Option<JiraClient>,
}
