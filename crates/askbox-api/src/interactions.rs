use axum::{
    extract::{Form, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tracing::{debug, error, warn};
use uuid::Uuid;

use askbox_db::models::QuestionRow;
use askbox_slack::blocks;
use askbox_types::events::{InteractionPayload, ViewPayload};

use crate::{AppState, closing};

#[derive(Debug, Deserialize)]
pub struct InteractionForm {
    pub payload: String,
}

/// Entry point for Slack interactivity: button clicks and modal submissions,
/// both carrying the question id as an opaque value.
pub async fn interaction(
    State(state): State<AppState>,
    Form(form): Form<InteractionForm>,
) -> Response {
    let payload: InteractionPayload = match serde_json::from_str(&form.payload) {
        Ok(p) => p,
        Err(e) => {
            warn!(error = %e, "unparseable interaction payload");
            return StatusCode::BAD_REQUEST.into_response();
        }
    };

    match payload {
        InteractionPayload::BlockActions {
            team,
            user,
            channel,
            trigger_id,
            actions,
        } => {
            let Some(action) = actions.first() else {
                return StatusCode::OK.into_response();
            };
            let Some(question_id) = action.value.clone() else {
                warn!(action_id = %action.action_id, "button click without a value");
                return StatusCode::OK.into_response();
            };

            match action.action_id.as_str() {
                blocks::RESPOND_ACTION => {
                    handle_respond_click(&state, &team.id, &user.id, &question_id, trigger_id.as_deref())
                        .await;
                }
                blocks::CLOSE_VOTING_ACTION => {
                    closing::handle_close(&state, &team.id, &user.id, &question_id).await;
                }
                other => debug!(action_id = other, "ignoring unknown action"),
            }
            let _ = channel; // the question's own channel is authoritative
            StatusCode::OK.into_response()
        }
        InteractionPayload::ViewSubmission { team, user: _, view } => {
            handle_submission(&state, &team.id, view).await;
            // Empty 200 closes the modal
            StatusCode::OK.into_response()
        }
        InteractionPayload::Other => StatusCode::OK.into_response(),
    }
}

async fn load_question(state: &AppState, question_id: &str) -> Option<QuestionRow> {
    let db = state.db.clone();
    let qid = question_id.to_string();
    match tokio::task::spawn_blocking(move || db.get_question(&qid)).await {
        Ok(Ok(q)) => q,
        Ok(Err(e)) => {
            error!(question_id, error = %e, "question lookup failed");
            None
        }
        Err(e) => {
            error!(question_id, error = %e, "spawn_blocking join error");
            None
        }
    }
}

async fn handle_respond_click(
    state: &AppState,
    team_id: &str,
    user_id: &str,
    question_id: &str,
    trigger_id: Option<&str>,
) {
    let Ok(Some(token)) = state.tokens.get_token(team_id).await else {
        warn!(team_id, "no credential for workspace, dropping respond click");
        return;
    };

    let Some(question) = load_question(state, question_id).await else {
        debug!(question_id, "respond click on unknown question");
        return;
    };

    if question.voting_closed {
        if let Err(e) = state
            .slack
            .post_ephemeral(&token, &question.channel_id, user_id, "Voting has closed for this question.")
            .await
        {
            warn!(question_id, error = %e, "failed to send closed notice");
        }
        return;
    }

    let Some(trigger_id) = trigger_id else {
        warn!(question_id, "respond click without trigger_id");
        return;
    };

    if let Err(e) = state
        .slack
        .open_view(&token, trigger_id, blocks::respond_modal(question_id))
        .await
    {
        warn!(question_id, error = %e, "failed to open respond modal");
    }
}

async fn handle_submission(state: &AppState, team_id: &str, view: ViewPayload) {
    // Empty submissions are dropped without any user-visible error.
    let text = view.response_text().unwrap_or_default().trim().to_string();
    if text.is_empty() {
        return;
    }

    let question_id = view.private_metadata.clone();
    let Some(question) = load_question(state, &question_id).await else {
        debug!(%question_id, "submission for unknown question");
        return;
    };

    let Ok(Some(token)) = state.tokens.get_token(team_id).await else {
        warn!(team_id, "no credential for workspace, dropping submission");
        return;
    };

    // Open-state check lives here, not in the registry; a close racing this
    // check can still let a response slip in.
    if question.voting_closed {
        debug!(%question_id, "submission after voting closed, dropped");
        return;
    }

    let message_ts = match state
        .slack
        .post_message(
            &token,
            &question.channel_id,
            &blocks::response_text(&text, 0),
            None,
            Some(&question.message_ts),
        )
        .await
    {
        Ok(ts) => ts,
        Err(e) => {
            error!(%question_id, error = %e, "failed to post response message");
            return;
        }
    };

    let response_id = Uuid::new_v4().to_string();
    let db = state.db.clone();
    let (rid, qid, body, ts) = (
        response_id.clone(),
        question_id.clone(),
        text,
        message_ts.clone(),
    );
    match tokio::task::spawn_blocking(move || db.create_response(&rid, &qid, &body, &ts)).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
            error!(%response_id, error = %e, "failed to record response");
            return;
        }
        Err(e) => {
            error!(%response_id, error = %e, "spawn_blocking join error");
            return;
        }
    }

    // Seed the two voting reactions; best-effort.
    for name in ["+1", "-1"] {
        if let Err(e) = state
            .slack
            .add_reaction(&token, &question.channel_id, &message_ts, name)
            .await
        {
            warn!(%response_id, reaction = name, error = %e, "failed to seed reaction");
        }
    }
}
