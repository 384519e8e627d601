pub mod closing;
pub mod commands;
pub mod interactions;
pub mod middleware;
pub mod oauth;
pub mod reactions;
pub mod scoring;
pub mod tokens;

use std::sync::Arc;

use askbox_db::Database;
use askbox_slack::SlackClient;

use crate::tokens::TokenStore;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Arc<Database>,
    pub slack: SlackClient,
    pub tokens: TokenStore,
    pub config: AppConfig,
}

#[derive(Clone)]
pub struct AppConfig {
    /// Secret for verifying inbound Slack request signatures.
    pub signing_secret: String,
    /// OAuth app credentials; absent when running on a bootstrap token only.
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
}
