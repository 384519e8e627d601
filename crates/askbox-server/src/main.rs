mod notifications;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    Router, middleware,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;
use tracing::info;

use askbox_api::{AppConfig, AppState, AppStateInner, commands, interactions, oauth, reactions};
use askbox_api::middleware::verify_slack_request;
use askbox_api::tokens::TokenStore;
use askbox_feeds::poller;
use askbox_feeds::sources::{ChessComSource, FeedSource, RedditSource};
use askbox_feeds::store::NotificationStore;
use askbox_slack::SlackClient;

/// Placeholder secrets that MUST NOT be used.
const PLACEHOLDER_SECRETS: &[&str] = &["change-me-to-a-random-string", "dev-secret-change-me"];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "askbox=debug,tower_http=debug".into()),
        )
        .init();

    // Mandatory config; refuse to start on anything missing or malformed.
    let signing_secret = std::env::var("SLACK_SIGNING_SECRET").unwrap_or_default();
    if signing_secret.is_empty() || PLACEHOLDER_SECRETS.contains(&signing_secret.as_str()) {
        eprintln!("FATAL: SLACK_SIGNING_SECRET is unset or still a placeholder.");
        eprintln!("       Copy it from your Slack app's Basic Information page.");
        std::process::exit(1);
    }

    let seal_key = match std::env::var("ASKBOX_SEAL_KEY") {
        Ok(encoded) => match askbox_crypto::keys::key_from_base64(&encoded) {
            Ok(key) => key,
            Err(e) => {
                eprintln!("FATAL: ASKBOX_SEAL_KEY is not a base64 256-bit key: {}", e);
                std::process::exit(1);
            }
        },
        Err(_) => {
            eprintln!("FATAL: ASKBOX_SEAL_KEY is unset; bot tokens cannot be stored.");
            eprintln!(
                "       Generate one, e.g.: openssl rand -base64 32"
            );
            std::process::exit(1);
        }
    };

    let bootstrap_token = match std::env::var("SLACK_BOT_TOKEN") {
        Ok(token) if token.is_empty() => None,
        Ok(token) => {
            if !token.starts_with("xoxb-") {
                eprintln!("FATAL: SLACK_BOT_TOKEN must be a bot token (xoxb-...).");
                std::process::exit(1);
            }
            Some(token)
        }
        Err(_) => None,
    };

    let client_id = std::env::var("SLACK_CLIENT_ID").ok().filter(|v| !v.is_empty());
    let client_secret = std::env::var("SLACK_CLIENT_SECRET").ok().filter(|v| !v.is_empty());
    if bootstrap_token.is_none() && (client_id.is_none() || client_secret.is_none()) {
        eprintln!("FATAL: no credential path configured.");
        eprintln!("       Set SLACK_BOT_TOKEN, or SLACK_CLIENT_ID + SLACK_CLIENT_SECRET for OAuth installs.");
        std::process::exit(1);
    }

    let db_path = std::env::var("ASKBOX_DB_PATH").unwrap_or_else(|_| "askbox.db".into());
    let host = std::env::var("ASKBOX_HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let port: u16 = std::env::var("ASKBOX_PORT")
        .unwrap_or_else(|_| "3000".into())
        .parse()?;
    let feed_interval_secs: u64 = std::env::var("ASKBOX_FEED_INTERVAL_SECS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(300);

    // Init database and shared state
    let db = Arc::new(askbox_db::Database::open(&PathBuf::from(&db_path))?);
    let tokens = TokenStore::new(db.clone(), seal_key, bootstrap_token);
    let state: AppState = Arc::new(AppStateInner {
        db,
        slack: SlackClient::new(),
        tokens,
        config: AppConfig {
            signing_secret,
            client_id,
            client_secret,
        },
    });

    // Feed poller (side subsystem)
    let feed_store = Arc::new(NotificationStore::new());
    let feed_http = reqwest::Client::new();
    let mut feed_sources: Vec<Box<dyn FeedSource>> = Vec::new();
    if let Ok(username) = std::env::var("ASKBOX_CHESS_USERNAME") {
        if !username.is_empty() {
            feed_sources.push(Box::new(ChessComSource::new(feed_http.clone(), username)));
        }
    }
    if let (Ok(client_id), Ok(client_secret), Ok(username)) = (
        std::env::var("ASKBOX_REDDIT_CLIENT_ID"),
        std::env::var("ASKBOX_REDDIT_CLIENT_SECRET"),
        std::env::var("ASKBOX_REDDIT_USERNAME"),
    ) {
        if !client_id.is_empty() && !client_secret.is_empty() && !username.is_empty() {
            feed_sources.push(Box::new(RedditSource::new(
                feed_http.clone(),
                client_id,
                client_secret,
                username,
            )));
        }
    }
    if !feed_sources.is_empty() {
        info!(sources = feed_sources.len(), interval_secs = feed_interval_secs, "starting feed poller");
        tokio::spawn(poller::run_poll_loop(
            feed_store.clone(),
            feed_sources,
            feed_interval_secs,
        ));
    }

    // Routes
    let slack_routes = Router::new()
        .route("/slack/commands", post(commands::slash_command))
        .route("/slack/interactions", post(interactions::interaction))
        .route("/slack/events", post(reactions::events))
        .layer(middleware::from_fn_with_state(state.clone(), verify_slack_request))
        .with_state(state.clone());

    let oauth_routes = Router::new()
        .route("/slack/oauth/callback", get(oauth::oauth_callback))
        .with_state(state);

    let feed_routes = Router::new()
        .route("/api/notifications", get(notifications::list_notifications))
        .route("/api/stats", get(notifications::feed_stats))
        .with_state(feed_store);

    let app = Router::new()
        .merge(slack_routes)
        .merge(oauth_routes)
        .merge(feed_routes)
        .route("/health", get(|| async { "ok" }))
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Askbox listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler");
        tokio::select! {
            _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
            _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}
