use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::{debug, error, warn};

use askbox_types::events::{CallbackEvent, EventEnvelope, ReactionItem};
use askbox_types::vote::classify_reaction;

use crate::{AppState, scoring};

/// Events API endpoint: the URL handshake plus reaction add/remove, which
/// drive the whole voting pipeline.
pub async fn events(State(state): State<AppState>, body: String) -> Response {
    // The body already passed signature verification; a payload we cannot
    // parse is logged and dropped, never bounced back for redelivery.
    let envelope: EventEnvelope = match serde_json::from_str(&body) {
        Ok(env) => env,
        Err(e) => {
            warn!(error = %e, "unparseable event envelope, dropped");
            return StatusCode::OK.into_response();
        }
    };

    match envelope {
        EventEnvelope::UrlVerification { challenge } => {
            Json(serde_json::json!({ "challenge": challenge })).into_response()
        }
        EventEnvelope::EventCallback { team_id, event } => {
            match event {
                CallbackEvent::ReactionAdded { user, reaction, item } => {
                    handle_reaction(&state, &team_id, &user, &reaction, &item, true).await;
                }
                CallbackEvent::ReactionRemoved { user, reaction, item } => {
                    handle_reaction(&state, &team_id, &user, &reaction, &item, false).await;
                }
                CallbackEvent::Other => {
                    // Diagnostic hook only; no behavior hangs off unknown events.
                    debug!(team_id, "ignoring unhandled event type");
                }
            }
            // Slack retries on anything but a prompt 200.
            StatusCode::OK.into_response()
        }
    }
}

async fn handle_reaction(
    state: &AppState,
    team_id: &str,
    user_id: &str,
    reaction: &str,
    item: &ReactionItem,
    added: bool,
) {
    let Some(kind) = classify_reaction(reaction) else {
        return;
    };

    // The bot seeds +1/-1 on every response; don't count its own reactions.
    match state.tokens.bot_user_id(team_id).await {
        Ok(Some(bot_id)) if bot_id == user_id => {
            debug!(team_id, "ignoring bot's own reaction");
            return;
        }
        Ok(_) => {}
        Err(e) => {
            error!(team_id, error = %e, "bot identity lookup failed");
            return;
        }
    }

    let db = state.db.clone();
    let (team, channel, ts) = (
        team_id.to_string(),
        item.channel.clone(),
        item.ts.clone(),
    );
    let resolved =
        tokio::task::spawn_blocking(move || db.resolve_response(&team, &channel, &ts)).await;

    let response_id = match resolved {
        Ok(Ok(Some(id))) => id,
        Ok(Ok(None)) => {
            // Reactions on untracked messages are steady-state traffic.
            debug!(team_id, channel = %item.channel, ts = %item.ts, "reaction on untracked message");
            return;
        }
        Ok(Err(e)) => {
            error!(team_id, error = %e, "reaction routing failed");
            return;
        }
        Err(e) => {
            error!(team_id, error = %e, "spawn_blocking join error");
            return;
        }
    };

    let db = state.db.clone();
    let (rid, voter) = (response_id.clone(), user_id.to_string());
    let mutation = tokio::task::spawn_blocking(move || {
        if added {
            db.add_vote(&rid, &voter, kind.as_str())
        } else {
            db.remove_vote(&rid, &voter)
        }
    })
    .await;

    match mutation {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
            error!(%response_id, error = %e, "vote mutation failed");
            return;
        }
        Err(e) => {
            error!(%response_id, error = %e, "spawn_blocking join error");
            return;
        }
    }

    // Re-render is best-effort; a failed update never rolls back the vote.
    scoring::publish_score(state, team_id, &response_id).await;
}
