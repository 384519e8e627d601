use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS workspaces (
            team_id       TEXT PRIMARY KEY,
            sealed_token  BLOB NOT NULL,
            token_nonce   BLOB NOT NULL,
            bot_user_id   TEXT,
            installed_at  TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at    TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS questions (
            id             TEXT PRIMARY KEY,
            team_id        TEXT NOT NULL,
            question_text  TEXT NOT NULL,
            channel_id     TEXT NOT NULL,
            message_ts     TEXT NOT NULL,
            poster_id      TEXT NOT NULL,
            voting_closed  INTEGER NOT NULL DEFAULT 0,
            created_at     TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_questions_team
            ON questions(team_id);

        CREATE TABLE IF NOT EXISTS responses (
            id             TEXT PRIMARY KEY,
            question_id    TEXT NOT NULL REFERENCES questions(id) ON DELETE CASCADE,
            response_text  TEXT NOT NULL,
            message_ts     TEXT NOT NULL,
            created_at     TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_responses_question
            ON responses(question_id, created_at);

        -- Reverse reaction lookup: reactions only carry (channel, ts)
        CREATE INDEX IF NOT EXISTS idx_responses_ts
            ON responses(message_ts);

        CREATE TABLE IF NOT EXISTS votes (
            response_id  TEXT NOT NULL REFERENCES responses(id) ON DELETE CASCADE,
            voter_id     TEXT NOT NULL,
            vote_type    TEXT NOT NULL CHECK (vote_type IN ('upvote', 'downvote')),
            created_at   TEXT NOT NULL DEFAULT (datetime('now')),
            UNIQUE(response_id, voter_id)
        );

        CREATE INDEX IF NOT EXISTS idx_votes_response
            ON votes(response_id);
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
