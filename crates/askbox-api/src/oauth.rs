use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use serde::Deserialize;
use tracing::{error, info};

use crate::{AppState, tokens::token_prefix};

#[derive(Debug, Deserialize)]
pub struct OAuthQuery {
    pub code: Option<String>,
    pub error: Option<String>,
}

/// OAuth redirect target: exchange the grant code for a bot token and
/// persist it for the team (write-through into the token store).
pub async fn oauth_callback(
    State(state): State<AppState>,
    Query(query): Query<OAuthQuery>,
) -> Response {
    if let Some(reason) = query.error {
        info!(%reason, "installation cancelled");
        return Html("<h1>Installation cancelled.</h1>").into_response();
    }

    let (Some(client_id), Some(client_secret)) =
        (state.config.client_id.as_deref(), state.config.client_secret.as_deref())
    else {
        return (
            StatusCode::NOT_FOUND,
            "OAuth installation is not enabled on this deployment.",
        )
            .into_response();
    };

    let Some(code) = query.code else {
        return (StatusCode::BAD_REQUEST, "Missing authorization code.").into_response();
    };

    let grant = match state.slack.oauth_access(client_id, client_secret, &code).await {
        Ok(grant) => grant,
        Err(e) => {
            error!(error = %e, "oauth exchange failed");
            return (
                StatusCode::BAD_GATEWAY,
                "Token exchange with Slack failed. Try installing again.",
            )
                .into_response();
        }
    };

    if let Err(e) = state
        .tokens
        .set_token(&grant.team_id, &grant.bot_token, grant.bot_user_id.as_deref())
        .await
    {
        error!(team_id = %grant.team_id, error = %e, "failed to store credential");
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Installed, but the credential could not be stored.",
        )
            .into_response();
    }

    info!(
        team_id = %grant.team_id,
        token_prefix = token_prefix(&grant.bot_token),
        "workspace installed"
    );
    Html("<h1>Askbox is installed!</h1><p>Try <code>/ask-question</code> in a channel.</p>")
        .into_response()
}
