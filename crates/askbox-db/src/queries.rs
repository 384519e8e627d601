use crate::Database;
use crate::models::{QuestionRow, ResponseRow, VoteSets, WorkspaceRow};
use anyhow::Result;
use rusqlite::Connection;

impl Database {
    // -- Workspaces --

    /// Upsert a workspace credential. `bot_user_id` is kept when the caller
    /// passes None (bootstrap claims don't know the bot identity).
    pub fn set_workspace(
        &self,
        team_id: &str,
        sealed_token: &[u8],
        token_nonce: &[u8],
        bot_user_id: Option<&str>,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO workspaces (team_id, sealed_token, token_nonce, bot_user_id, updated_at)
                 VALUES (?1, ?2, ?3, ?4, datetime('now'))
                 ON CONFLICT (team_id)
                 DO UPDATE SET sealed_token = ?2, token_nonce = ?3,
                               bot_user_id = COALESCE(?4, workspaces.bot_user_id),
                               updated_at = datetime('now')",
                rusqlite::params![team_id, sealed_token, token_nonce, bot_user_id],
            )?;
            Ok(())
        })
    }

    pub fn get_workspace(&self, team_id: &str) -> Result<Option<WorkspaceRow>> {
        self.with_conn(|conn| query_workspace(conn, team_id))
    }

    pub fn delete_workspace(&self, team_id: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute("DELETE FROM workspaces WHERE team_id = ?1", [team_id])?;
            Ok(())
        })
    }

    // -- Questions --

    pub fn create_question(
        &self,
        id: &str,
        team_id: &str,
        text: &str,
        channel_id: &str,
        message_ts: &str,
        poster_id: &str,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO questions (id, team_id, question_text, channel_id, message_ts, poster_id, voting_closed)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0)",
                rusqlite::params![id, team_id, text, channel_id, message_ts, poster_id],
            )?;
            Ok(())
        })
    }

    pub fn get_question(&self, id: &str) -> Result<Option<QuestionRow>> {
        self.with_conn(|conn| query_question(conn, id))
    }

    /// Flip voting_closed for a question. The update is guarded by the flag
    /// itself, so only one caller ever observes the transition; repeat calls
    /// succeed without effect. Returns whether this call closed it.
    pub fn close_voting(&self, id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE questions SET voting_closed = 1 WHERE id = ?1 AND voting_closed = 0",
                [id],
            )?;
            Ok(changed > 0)
        })
    }

    pub fn delete_question(&self, id: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute("DELETE FROM questions WHERE id = ?1", [id])?;
            Ok(())
        })
    }

    // -- Responses --

    pub fn create_response(
        &self,
        id: &str,
        question_id: &str,
        text: &str,
        message_ts: &str,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO responses (id, question_id, response_text, message_ts)
                 VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![id, question_id, text, message_ts],
            )?;
            Ok(())
        })
    }

    pub fn get_response(&self, id: &str) -> Result<Option<ResponseRow>> {
        self.with_conn(|conn| query_response(conn, id))
    }

    /// Response ids of a question in creation order (rowid breaks ties for
    /// same-second inserts).
    pub fn list_response_ids(&self, question_id: &str) -> Result<Vec<String>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id FROM responses WHERE question_id = ?1 ORDER BY created_at, rowid",
            )?;
            let ids = stmt
                .query_map([question_id], |row| row.get::<_, String>(0))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(ids)
        })
    }

    /// Reverse reaction lookup: reactions carry only (channel, ts), so match
    /// them against stored response message handles. The join against the
    /// parent question pins the team, so a ts collision in another workspace
    /// can never resolve here.
    pub fn resolve_response(
        &self,
        team_id: &str,
        channel_id: &str,
        message_ts: &str,
    ) -> Result<Option<String>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT r.id FROM responses r
                 JOIN questions q ON r.question_id = q.id
                 WHERE q.team_id = ?1 AND q.channel_id = ?2 AND r.message_ts = ?3
                 LIMIT 1",
                rusqlite::params![team_id, channel_id, message_ts],
                |row| row.get(0),
            )
            .optional()
        })
    }

    // -- Votes --

    /// Record a vote, replacing any existing vote by the same voter on the
    /// same response. Delete-then-insert: the last processed event wins.
    pub fn add_vote(&self, response_id: &str, voter_id: &str, vote_type: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "DELETE FROM votes WHERE response_id = ?1 AND voter_id = ?2",
                rusqlite::params![response_id, voter_id],
            )?;
            conn.execute(
                "INSERT INTO votes (response_id, voter_id, vote_type) VALUES (?1, ?2, ?3)",
                rusqlite::params![response_id, voter_id, vote_type],
            )?;
            Ok(())
        })
    }

    /// Remove a voter's vote. Removing a vote that does not exist is a no-op.
    pub fn remove_vote(&self, response_id: &str, voter_id: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "DELETE FROM votes WHERE response_id = ?1 AND voter_id = ?2",
                rusqlite::params![response_id, voter_id],
            )?;
            Ok(())
        })
    }

    pub fn get_votes(&self, response_id: &str) -> Result<VoteSets> {
        self.with_conn(|conn| {
            let mut stmt =
                conn.prepare("SELECT voter_id, vote_type FROM votes WHERE response_id = ?1")?;
            let rows = stmt
                .query_map([response_id], |row| {
                    Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            let mut sets = VoteSets::default();
            for (voter, kind) in rows {
                if kind == "upvote" {
                    sets.upvoters.push(voter);
                } else {
                    sets.downvoters.push(voter);
                }
            }
            Ok(sets)
        })
    }

    /// Net score, recomputed from the vote rows on every call.
    pub fn score(&self, response_id: &str) -> Result<i64> {
        Ok(self.get_votes(response_id)?.score())
    }
}

fn query_workspace(conn: &Connection, team_id: &str) -> Result<Option<WorkspaceRow>> {
    let mut stmt = conn.prepare(
        "SELECT team_id, sealed_token, token_nonce, bot_user_id FROM workspaces WHERE team_id = ?1",
    )?;

    let row = stmt
        .query_row([team_id], |row| {
            Ok(WorkspaceRow {
                team_id: row.get(0)?,
                sealed_token: row.get(1)?,
                token_nonce: row.get(2)?,
                bot_user_id: row.get(3)?,
            })
        })
        .optional()?;

    Ok(row)
}

fn query_question(conn: &Connection, id: &str) -> Result<Option<QuestionRow>> {
    let mut stmt = conn.prepare(
        "SELECT id, team_id, question_text, channel_id, message_ts, poster_id, voting_closed, created_at
         FROM questions WHERE id = ?1",
    )?;

    let row = stmt
        .query_row([id], |row| {
            Ok(QuestionRow {
                id: row.get(0)?,
                team_id: row.get(1)?,
                question_text: row.get(2)?,
                channel_id: row.get(3)?,
                message_ts: row.get(4)?,
                poster_id: row.get(5)?,
                voting_closed: row.get::<_, i64>(6)? != 0,
                created_at: row.get(7)?,
            })
        })
        .optional()?;

    Ok(row)
}

fn query_response(conn: &Connection, id: &str) -> Result<Option<ResponseRow>> {
    let mut stmt = conn.prepare(
        "SELECT id, question_id, response_text, message_ts, created_at FROM responses WHERE id = ?1",
    )?;

    let row = stmt
        .query_row([id], |row| {
            Ok(ResponseRow {
                id: row.get(0)?,
                question_id: row.get(1)?,
                response_text: row.get(2)?,
                message_ts: row.get(3)?,
                created_at: row.get(4)?,
            })
        })
        .optional()?;

    Ok(row)
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::Database;

    fn db_with_question(team: &str, channel: &str) -> (Database, String) {
        let db = Database::open_in_memory().unwrap();
        let qid = format!("q-{}", team);
        db.create_question(&qid, team, "What is 2+2?", channel, "1700000000.000100", "U_POSTER")
            .unwrap();
        (db, qid)
    }

    #[test]
    fn vote_replace_keeps_one_row() {
        let (db, qid) = db_with_question("T1", "C1");
        db.create_response("r1", &qid, "4", "1700000000.000200").unwrap();

        db.add_vote("r1", "U1", "upvote").unwrap();
        db.add_vote("r1", "U1", "downvote").unwrap();

        let votes = db.get_votes("r1").unwrap();
        assert!(votes.upvoters.is_empty());
        assert_eq!(votes.downvoters, vec!["U1".to_string()]);
        assert_eq!(db.score("r1").unwrap(), -1);

        db.remove_vote("r1", "U1").unwrap();
        assert_eq!(db.score("r1").unwrap(), 0);
    }

    #[test]
    fn remove_missing_vote_is_noop() {
        let (db, qid) = db_with_question("T1", "C1");
        db.create_response("r1", &qid, "4", "1700000000.000200").unwrap();

        db.remove_vote("r1", "U_NOBODY").unwrap();
        assert_eq!(db.score("r1").unwrap(), 0);
    }

    #[test]
    fn score_counts_both_directions() {
        let (db, qid) = db_with_question("T1", "C1");
        db.create_response("r1", &qid, "4", "1700000000.000200").unwrap();

        db.add_vote("r1", "U1", "upvote").unwrap();
        db.add_vote("r1", "U2", "upvote").unwrap();
        db.add_vote("r1", "U3", "downvote").unwrap();
        assert_eq!(db.score("r1").unwrap(), 1);
    }

    #[test]
    fn resolve_response_matches_handle() {
        let (db, qid) = db_with_question("T1", "C1");
        db.create_response("r1", &qid, "4", "1700000000.000200").unwrap();

        let found = db.resolve_response("T1", "C1", "1700000000.000200").unwrap();
        assert_eq!(found.as_deref(), Some("r1"));

        // Untracked message: expected steady-state traffic, not an error
        assert!(db.resolve_response("T1", "C1", "1700000000.999999").unwrap().is_none());
    }

    #[test]
    fn resolve_response_is_tenant_scoped() {
        let db = Database::open_in_memory().unwrap();
        // Same channel id and same message ts in two workspaces
        db.create_question("q-a", "T_A", "q?", "C1", "1.0", "U1").unwrap();
        db.create_question("q-b", "T_B", "q?", "C1", "1.0", "U2").unwrap();
        db.create_response("r-a", "q-a", "a", "1700000000.000200").unwrap();
        db.create_response("r-b", "q-b", "b", "1700000000.000200").unwrap();

        let found = db.resolve_response("T_A", "C1", "1700000000.000200").unwrap();
        assert_eq!(found.as_deref(), Some("r-a"));
        let found = db.resolve_response("T_B", "C1", "1700000000.000200").unwrap();
        assert_eq!(found.as_deref(), Some("r-b"));
    }

    #[test]
    fn close_voting_is_one_way_and_reports_transition() {
        let (db, qid) = db_with_question("T1", "C1");

        assert!(db.close_voting(&qid).unwrap());
        assert!(!db.close_voting(&qid).unwrap());
        assert!(db.get_question(&qid).unwrap().unwrap().voting_closed);
    }

    #[test]
    fn response_ids_come_back_in_creation_order() {
        let (db, qid) = db_with_question("T1", "C1");
        db.create_response("r1", &qid, "first", "1.1").unwrap();
        db.create_response("r2", &qid, "second", "1.2").unwrap();
        db.create_response("r3", &qid, "third", "1.3").unwrap();

        assert_eq!(db.list_response_ids(&qid).unwrap(), vec!["r1", "r2", "r3"]);
    }

    #[test]
    fn deleting_question_cascades() {
        let (db, qid) = db_with_question("T1", "C1");
        db.create_response("r1", &qid, "4", "1.1").unwrap();
        db.add_vote("r1", "U1", "upvote").unwrap();

        db.delete_question(&qid).unwrap();
        assert!(db.get_response("r1").unwrap().is_none());
        let votes = db.get_votes("r1").unwrap();
        assert!(votes.upvoters.is_empty() && votes.downvoters.is_empty());
    }

    #[test]
    fn workspace_upsert_keeps_bot_user_id() {
        let db = Database::open_in_memory().unwrap();
        db.set_workspace("T1", b"ct1", b"n1", Some("B_BOT")).unwrap();
        db.set_workspace("T1", b"ct2", b"n2", None).unwrap();

        let ws = db.get_workspace("T1").unwrap().unwrap();
        assert_eq!(ws.sealed_token, b"ct2");
        assert_eq!(ws.bot_user_id.as_deref(), Some("B_BOT"));
    }
}
