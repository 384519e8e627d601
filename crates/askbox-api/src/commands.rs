use axum::{
    Json,
    extract::{Form, State},
    response::{IntoResponse, Response},
};
use tracing::{error, info};
use uuid::Uuid;

use askbox_slack::blocks;
use askbox_types::events::SlashCommand;

use crate::AppState;

const USAGE: &str = "Usage: `/ask-question <your question>` — posts your question anonymously.";
const NOT_CONFIGURED: &str =
    "Askbox isn't configured for this workspace yet. Ask an admin to install it.";

/// In-channel slash command response body. `ephemeral` is only visible to
/// the invoker.
fn ephemeral(text: &str) -> Response {
    Json(serde_json::json!({ "response_type": "ephemeral", "text": text })).into_response()
}

/// `/ask-question <text>` — post the question with Respond / Close Voting
/// buttons and record it.
pub async fn slash_command(
    State(state): State<AppState>,
    Form(cmd): Form<SlashCommand>,
) -> Response {
    let text = cmd.text.trim().to_string();
    if text.is_empty() {
        return ephemeral(USAGE);
    }

    let token = match state.tokens.get_token(&cmd.team_id).await {
        Ok(Some(token)) => token,
        Ok(None) => return ephemeral(NOT_CONFIGURED),
        Err(e) => {
            error!(team_id = %cmd.team_id, error = %e, "credential lookup failed");
            return ephemeral(NOT_CONFIGURED);
        }
    };

    let question_id = Uuid::now_v7().to_string();

    // The one place a platform failure surfaces to the user: without the
    // posted message there is no question to track.
    let message_ts = match state
        .slack
        .post_message(
            &token,
            &cmd.channel_id,
            &format!("Anonymous question: {}", text),
            Some(blocks::question_blocks(&text, &question_id)),
            None,
        )
        .await
    {
        Ok(ts) => ts,
        Err(e) => {
            error!(team_id = %cmd.team_id, channel = %cmd.channel_id, error = %e, "failed to post question");
            return ephemeral("Couldn't post the question to this channel. Is the bot a member here?");
        }
    };

    let db = state.db.clone();
    let (qid, team, channel, ts, poster) = (
        question_id.clone(),
        cmd.team_id.clone(),
        cmd.channel_id.clone(),
        message_ts.clone(),
        cmd.user_id.clone(),
    );
    let created = tokio::task::spawn_blocking(move || {
        db.create_question(&qid, &team, &text, &channel, &ts, &poster)
    })
    .await;

    match created {
        Ok(Ok(())) => {
            info!(%question_id, team_id = %cmd.team_id, "question created");
            ().into_response()
        }
        Ok(Err(e)) => {
            error!(%question_id, error = %e, "failed to record question");
            ephemeral("The question was posted but couldn't be recorded. Voting won't work on it.")
        }
        Err(e) => {
            error!(%question_id, error = %e, "spawn_blocking join error");
            ephemeral("The question was posted but couldn't be recorded. Voting won't work on it.")
        }
    }
}
