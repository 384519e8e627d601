use tracing::{debug, error, warn};

use askbox_slack::blocks;

use crate::AppState;

/// Recompute a response's score from the vote ledger and push the updated
/// rendering to the platform. Fire-and-forget: every failure is logged and
/// swallowed, never surfaced to the voter.
pub async fn publish_score(state: &AppState, team_id: &str, response_id: &str) {
    let db = state.db.clone();
    let rid = response_id.to_string();
    let loaded = tokio::task::spawn_blocking(move || {
        let Some(response) = db.get_response(&rid)? else {
            return Ok(None);
        };
        let Some(question) = db.get_question(&response.question_id)? else {
            return Ok(None);
        };
        let score = db.score(&rid)?;
        Ok::<_, anyhow::Error>(Some((response, question.channel_id, score)))
    })
    .await;

    let (response, channel_id, score) = match loaded {
        Ok(Ok(Some(parts))) => parts,
        Ok(Ok(None)) => {
            debug!(response_id, "response vanished before re-render");
            return;
        }
        Ok(Err(e)) => {
            error!(response_id, error = %e, "score recompute failed");
            return;
        }
        Err(e) => {
            error!(response_id, error = %e, "spawn_blocking join error");
            return;
        }
    };

    let token = match state.tokens.get_token(team_id).await {
        Ok(Some(token)) => token,
        Ok(None) => {
            warn!(team_id, response_id, "no credential for workspace, score not published");
            return;
        }
        Err(e) => {
            error!(team_id, error = %e, "credential lookup failed");
            return;
        }
    };

    if let Err(e) = state
        .slack
        .update_message(
            &token,
            &channel_id,
            &response.message_ts,
            &blocks::response_text(&response.response_text, score),
            None,
        )
        .await
    {
        // Carries Slack's own reason: message_not_found, not_in_channel, ...
        warn!(response_id, score, error = %e, "score re-render failed");
    } else {
        debug!(response_id, score, "score published");
    }
}
