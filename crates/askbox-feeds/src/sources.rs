use anyhow::Result;
use chrono::{DateTime, Datelike, Duration, TimeZone, Utc};
use futures_util::future::BoxFuture;
use serde::Deserialize;
use tokio::sync::Mutex;

use crate::store::Notification;

const USER_AGENT: &str = "askbox/0.3";

/// A pollable external feed. Each source fails independently; the poller
/// records the error and keeps going.
pub trait FeedSource: Send + Sync {
    fn name(&self) -> &'static str;
    fn fetch(&self) -> BoxFuture<'_, Result<Vec<Notification>>>;
}

/// Chess.com public API: games from the current monthly archive.
pub struct ChessComSource {
    http: reqwest::Client,
    username: String,
}

impl ChessComSource {
    pub fn new(http: reqwest::Client, username: impl Into<String>) -> Self {
        Self {
            http,
            username: username.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct MonthlyGames {
    #[serde(default)]
    games: Vec<Game>,
}

#[derive(Debug, Deserialize)]
struct Game {
    url: String,
    end_time: i64,
    white: Player,
    black: Player,
    #[serde(default)]
    time_class: String,
}

#[derive(Debug, Deserialize)]
struct Player {
    username: String,
    result: String,
}

impl Game {
    /// Opponent name and own result from this player's perspective.
    fn perspective(&self, me: &str) -> (String, String) {
        if self.white.username.eq_ignore_ascii_case(me) {
            (self.black.username.clone(), self.white.result.clone())
        } else {
            (self.white.username.clone(), self.black.result.clone())
        }
    }
}

impl FeedSource for ChessComSource {
    fn name(&self) -> &'static str {
        "chess"
    }

    fn fetch(&self) -> BoxFuture<'_, Result<Vec<Notification>>> {
        Box::pin(async move {
            let now = Utc::now();
            let url = format!(
                "https://api.chess.com/pub/player/{}/games/{:04}/{:02}",
                self.username,
                now.year(),
                now.month()
            );

            let archive: MonthlyGames = self
                .http
                .get(&url)
                .send()
                .await?
                .error_for_status()?
                .json()
                .await?;

            let notifications = archive
                .games
                .into_iter()
                .map(|game| {
                    let (opponent, result) = game.perspective(&self.username);
                    let timestamp = Utc
                        .timestamp_opt(game.end_time, 0)
                        .single()
                        .unwrap_or(now);
                    Notification {
                        id: game.url.clone(),
                        source: "chess".to_string(),
                        kind: "game".to_string(),
                        title: format!("{} game vs {}: {}", game.time_class, opponent, result),
                        url: Some(game.url),
                        timestamp,
                    }
                })
                .collect();

            Ok(notifications)
        })
    }
}

/// Reddit mentions of an account, fetched with application-only OAuth.
/// The client-credentials token is cached and refreshed a minute early.
pub struct RedditSource {
    http: reqwest::Client,
    client_id: String,
    client_secret: String,
    username: String,
    token: Mutex<Option<CachedToken>>,
}

struct CachedToken {
    access_token: String,
    expires_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct TokenGrant {
    access_token: String,
    #[serde(default = "default_token_ttl")]
    expires_in: i64,
}

fn default_token_ttl() -> i64 {
    3600
}

#[derive(Debug, Deserialize)]
struct Listing {
    data: ListingData,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ListingData {
    children: Vec<Thing>,
}

#[derive(Debug, Deserialize)]
struct Thing {
    data: Mention,
}

#[derive(Debug, Deserialize)]
struct Mention {
    id: String,
    subreddit: String,
    #[serde(default)]
    link_title: Option<String>,
    permalink: String,
    created_utc: f64,
}

impl Mention {
    fn into_notification(self) -> Notification {
        let timestamp = Utc
            .timestamp_opt(self.created_utc as i64, 0)
            .single()
            .unwrap_or_else(Utc::now);
        let title = self
            .link_title
            .unwrap_or_else(|| format!("Mention in r/{}", self.subreddit));
        Notification {
            id: format!("reddit_mention_{}", self.id),
            source: "reddit".to_string(),
            kind: "mention".to_string(),
            title,
            url: Some(format!("https://reddit.com{}", self.permalink)),
            timestamp,
        }
    }
}

impl RedditSource {
    pub fn new(
        http: reqwest::Client,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        username: impl Into<String>,
    ) -> Self {
        Self {
            http,
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            username: username.into(),
            token: Mutex::new(None),
        }
    }

    async fn access_token(&self) -> Result<String> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref() {
            if Utc::now() < token.expires_at {
                return Ok(token.access_token.clone());
            }
        }

        let grant: TokenGrant = self
            .http
            .post("https://www.reddit.com/api/v1/access_token")
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let expires_at = Utc::now() + Duration::seconds(grant.expires_in.saturating_sub(60).max(0));
        let access_token = grant.access_token.clone();
        *cached = Some(CachedToken {
            access_token: grant.access_token,
            expires_at,
        });
        Ok(access_token)
    }
}

impl FeedSource for RedditSource {
    fn name(&self) -> &'static str {
        "reddit"
    }

    fn fetch(&self) -> BoxFuture<'_, Result<Vec<Notification>>> {
        Box::pin(async move {
            let token = self.access_token().await?;
            let url = format!(
                "https://oauth.reddit.com/user/{}/mentioned.json?limit=50",
                self.username
            );

            let listing: Listing = self
                .http
                .get(&url)
                .bearer_auth(&token)
                .header(reqwest::header::USER_AGENT, USER_AGENT)
                .send()
                .await?
                .error_for_status()?
                .json()
                .await?;

            Ok(listing
                .data
                .children
                .into_iter()
                .map(|thing| thing.data.into_notification())
                .collect())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn perspective_picks_the_right_side() {
        let game = Game {
            url: "https://example.com/g/1".to_string(),
            end_time: 1,
            white: Player {
                username: "Alice".to_string(),
                result: "win".to_string(),
            },
            black: Player {
                username: "bob".to_string(),
                result: "checkmated".to_string(),
            },
            time_class: "blitz".to_string(),
        };

        assert_eq!(game.perspective("alice"), ("bob".to_string(), "win".to_string()));
        assert_eq!(game.perspective("Bob"), ("Alice".to_string(), "checkmated".to_string()));
    }

    #[test]
    fn monthly_archive_parses_without_games_field() {
        let archive: MonthlyGames = serde_json::from_str("{}").unwrap();
        assert!(archive.games.is_empty());
    }

    #[test]
    fn mention_listing_maps_to_notifications() {
        let raw = serde_json::json!({
            "data": {
                "children": [
                    {
                        "data": {
                            "id": "abc12",
                            "subreddit": "rust",
                            "link_title": "Weekly thread",
                            "permalink": "/r/rust/comments/abc12/weekly_thread/",
                            "created_utc": 1700000000.0
                        }
                    },
                    {
                        "data": {
                            "id": "def34",
                            "subreddit": "programming",
                            "permalink": "/r/programming/comments/def34/",
                            "created_utc": 1700000100.0
                        }
                    }
                ]
            }
        });

        let listing: Listing = serde_json::from_value(raw).unwrap();
        let notes: Vec<Notification> = listing
            .data
            .children
            .into_iter()
            .map(|t| t.data.into_notification())
            .collect();

        assert_eq!(notes.len(), 2);
        assert_eq!(notes[0].id, "reddit_mention_abc12");
        assert_eq!(notes[0].source, "reddit");
        assert_eq!(notes[0].kind, "mention");
        assert_eq!(notes[0].title, "Weekly thread");
        assert_eq!(
            notes[0].url.as_deref(),
            Some("https://reddit.com/r/rust/comments/abc12/weekly_thread/")
        );
        assert_eq!(notes[0].timestamp, Utc.timestamp_opt(1700000000, 0).unwrap());
        // Comment mentions carry no link title; fall back to the subreddit.
        assert_eq!(notes[1].title, "Mention in r/programming");
    }

    #[test]
    fn empty_listing_parses() {
        let listing: Listing = serde_json::from_str(r#"{"data": {}}"#).unwrap();
        assert!(listing.data.children.is_empty());
    }

    #[test]
    fn token_grant_defaults_the_ttl() {
        let grant: TokenGrant = serde_json::from_str(r#"{"access_token": "t"}"#).unwrap();
        assert_eq!(grant.expires_in, 3600);

        let grant: TokenGrant =
            serde_json::from_str(r#"{"access_token": "t", "expires_in": 600}"#).unwrap();
        assert_eq!(grant.expires_in, 600);
    }
}
