use tracing::{debug, error, info, warn};

use askbox_slack::blocks;
use askbox_types::vote::format_points;

use crate::AppState;

/// Outcome of scanning a question's responses at close time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseResult {
    NoResponses,
    /// Every response scored below zero; nobody is named a winner.
    NoPositive,
    Winner { index: usize, score: i64 },
}

/// Pick the winner from scores listed in creation order. Highest net score
/// wins; the earliest-created response wins ties.
pub fn pick_winner(scores: &[i64]) -> CloseResult {
    let Some((index, &score)) = scores
        .iter()
        .enumerate()
        .max_by(|(ia, a), (ib, b)| a.cmp(b).then(ib.cmp(ia)))
    else {
        return CloseResult::NoResponses;
    };

    if score < 0 {
        CloseResult::NoPositive
    } else {
        CloseResult::Winner { index, score }
    }
}

/// Channel announcement for a close result.
pub fn announcement(result: &CloseResult, texts: &[String]) -> String {
    match result {
        CloseResult::NoResponses => {
            ":lock: Voting is closed! No responses were submitted.".to_string()
        }
        CloseResult::NoPositive => {
            ":lock: Voting is closed! No response received positive votes.".to_string()
        }
        CloseResult::Winner { index, score } => format!(
            ":trophy: Voting is closed! Winning response with {} points:\n>{}",
            format_points(*score),
            texts[*index]
        ),
    }
}

/// Close voting on a question: poster-only, one-way, announces the winner
/// exactly once.
pub async fn handle_close(state: &AppState, team_id: &str, user_id: &str, question_id: &str) {
    let token = match state.tokens.get_token(team_id).await {
        Ok(Some(token)) => token,
        Ok(None) | Err(_) => {
            warn!(team_id, "no credential for workspace, dropping close request");
            return;
        }
    };

    let db = state.db.clone();
    let qid = question_id.to_string();
    let question = match tokio::task::spawn_blocking(move || db.get_question(&qid)).await {
        Ok(Ok(Some(q))) => q,
        Ok(Ok(None)) => {
            debug!(question_id, "close request for unknown question");
            return;
        }
        Ok(Err(e)) => {
            error!(question_id, error = %e, "question lookup failed");
            return;
        }
        Err(e) => {
            error!(question_id, error = %e, "spawn_blocking join error");
            return;
        }
    };

    let ephemeral = |text: &'static str| {
        let slack = state.slack.clone();
        let token = token.clone();
        let channel = question.channel_id.clone();
        let user = user_id.to_string();
        async move {
            if let Err(e) = slack.post_ephemeral(&token, &channel, &user, text).await {
                warn!(error = %e, "failed to send ephemeral notice");
            }
        }
    };

    if user_id != question.poster_id {
        ephemeral(":no_entry: Only the person who asked the question can close voting.").await;
        return;
    }

    if question.voting_closed {
        ephemeral("Voting is already closed for this question.").await;
        return;
    }

    // Conditional flip at the storage layer: if another task closed it
    // between our check and now, skip the announcement too.
    let db = state.db.clone();
    let qid = question_id.to_string();
    let transitioned = match tokio::task::spawn_blocking(move || db.close_voting(&qid)).await {
        Ok(Ok(t)) => t,
        Ok(Err(e)) => {
            error!(question_id, error = %e, "close transition failed");
            return;
        }
        Err(e) => {
            error!(question_id, error = %e, "spawn_blocking join error");
            return;
        }
    };
    if !transitioned {
        ephemeral("Voting is already closed for this question.").await;
        return;
    }

    info!(question_id, team_id, "voting closed");

    // Strip the buttons off the original question message.
    if let Err(e) = state
        .slack
        .update_message(
            &token,
            &question.channel_id,
            &question.message_ts,
            &format!("Anonymous question (voting closed): {}", question.question_text),
            Some(blocks::closed_question_blocks(&question.question_text)),
        )
        .await
    {
        warn!(question_id, error = %e, "failed to re-render closed question");
    }

    // Scan all responses in creation order and tally fresh scores.
    let db = state.db.clone();
    let qid = question_id.to_string();
    let tallied = tokio::task::spawn_blocking(move || {
        let ids = db.list_response_ids(&qid)?;
        let mut texts = Vec::with_capacity(ids.len());
        let mut scores = Vec::with_capacity(ids.len());
        for id in &ids {
            if let Some(response) = db.get_response(id)? {
                scores.push(db.score(id)?);
                texts.push(response.response_text);
            }
        }
        Ok::<_, anyhow::Error>((texts, scores))
    })
    .await;

    let (texts, scores) = match tallied {
        Ok(Ok(parts)) => parts,
        Ok(Err(e)) => {
            error!(question_id, error = %e, "winner tally failed");
            return;
        }
        Err(e) => {
            error!(question_id, error = %e, "spawn_blocking join error");
            return;
        }
    };

    let result = pick_winner(&scores);
    let text = announcement(&result, &texts);

    if let Err(e) = state
        .slack
        .post_message(
            &token,
            &question.channel_id,
            &text,
            None,
            Some(&question.message_ts),
        )
        .await
    {
        warn!(question_id, error = %e, "failed to post winner announcement");
    }
}
