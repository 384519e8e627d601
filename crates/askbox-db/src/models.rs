/// Database row types — these map directly to SQLite rows.
/// Distinct from the askbox-types domain models to keep the DB layer
/// independent.

pub struct WorkspaceRow {
    pub team_id: String,
    pub sealed_token: Vec<u8>,
    pub token_nonce: Vec<u8>,
    pub bot_user_id: Option<String>,
}

pub struct QuestionRow {
    pub id: String,
    pub team_id: String,
    pub question_text: String,
    pub channel_id: String,
    pub message_ts: String,
    pub poster_id: String,
    pub voting_closed: bool,
    pub created_at: String,
}

pub struct ResponseRow {
    pub id: String,
    pub question_id: String,
    pub response_text: String,
    pub message_ts: String,
    pub created_at: String,
}

/// Vote sets for one response, split by direction.
#[derive(Debug, Default)]
pub struct VoteSets {
    pub upvoters: Vec<String>,
    pub downvoters: Vec<String>,
}

impl VoteSets {
    pub fn score(&self) -> i64 {
        self.upvoters.len() as i64 - self.downvoters.len() as i64
    }
}
