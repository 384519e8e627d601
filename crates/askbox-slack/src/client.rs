use serde_json::Value;
use thiserror::Error;
use tracing::debug;

const API_BASE: &str = "https://slack.com/api";

#[derive(Debug, Error)]
pub enum SlackError {
    /// Slack answered `ok: false`; carries Slack's error code
    /// (e.g. `message_not_found`, `channel_not_found`, `not_in_channel`).
    #[error("slack api error: {0}")]
    Api(String),

    #[error("slack http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("malformed slack response from {0}")]
    Malformed(&'static str),
}

/// Bot credential grant returned by the OAuth exchange.
#[derive(Debug, Clone)]
pub struct OAuthGrant {
    pub team_id: String,
    pub bot_token: String,
    pub bot_user_id: Option<String>,
}

/// Thin client over the Slack Web API. Every method takes the per-team bot
/// token; the client itself holds no credential state.
#[derive(Clone)]
pub struct SlackClient {
    http: reqwest::Client,
    base_url: String,
}

impl SlackClient {
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: API_BASE.to_string(),
        }
    }

    /// Point the client at a different API base (test servers).
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }

    async fn call(&self, token: &str, method: &'static str, body: Value) -> Result<Value, SlackError> {
        let resp = self
            .http
            .post(format!("{}/{}", self.base_url, method))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await?;

        let payload: Value = resp.json().await?;
        if payload.get("ok").and_then(Value::as_bool) != Some(true) {
            let code = payload
                .get("error")
                .and_then(Value::as_str)
                .unwrap_or("unknown_error");
            return Err(SlackError::Api(code.to_string()));
        }

        debug!(method, "slack call ok");
        Ok(payload)
    }

    /// Post a message. Returns the platform-assigned ts, the stable handle
    /// for later updates and reaction routing.
    pub async fn post_message(
        &self,
        token: &str,
        channel: &str,
        text: &str,
        blocks: Option<Value>,
        thread_ts: Option<&str>,
    ) -> Result<String, SlackError> {
        let mut body = serde_json::json!({ "channel": channel, "text": text });
        if let Some(blocks) = blocks {
            body["blocks"] = blocks;
        }
        if let Some(thread_ts) = thread_ts {
            body["thread_ts"] = Value::String(thread_ts.to_string());
        }

        let payload = self.call(token, "chat.postMessage", body).await?;
        payload
            .get("ts")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or(SlackError::Malformed("chat.postMessage"))
    }

    /// Replace a message's content in place.
    pub async fn update_message(
        &self,
        token: &str,
        channel: &str,
        ts: &str,
        text: &str,
        blocks: Option<Value>,
    ) -> Result<(), SlackError> {
        let mut body = serde_json::json!({ "channel": channel, "ts": ts, "text": text });
        if let Some(blocks) = blocks {
            body["blocks"] = blocks;
        }
        self.call(token, "chat.update", body).await?;
        Ok(())
    }

    /// Post a message only the given user can see.
    pub async fn post_ephemeral(
        &self,
        token: &str,
        channel: &str,
        user: &str,
        text: &str,
    ) -> Result<(), SlackError> {
        let body = serde_json::json!({ "channel": channel, "user": user, "text": text });
        self.call(token, "chat.postEphemeral", body).await?;
        Ok(())
    }

    /// Open a modal in response to an interaction.
    pub async fn open_view(
        &self,
        token: &str,
        trigger_id: &str,
        view: Value,
    ) -> Result<(), SlackError> {
        let body = serde_json::json!({ "trigger_id": trigger_id, "view": view });
        self.call(token, "views.open", body).await?;
        Ok(())
    }

    /// Add a reaction to a message.
    pub async fn add_reaction(
        &self,
        token: &str,
        channel: &str,
        ts: &str,
        name: &str,
    ) -> Result<(), SlackError> {
        let body = serde_json::json!({ "channel": channel, "timestamp": ts, "name": name });
        self.call(token, "reactions.add", body).await?;
        Ok(())
    }

    /// Exchange an OAuth code for a bot credential.
    pub async fn oauth_access(
        &self,
        client_id: &str,
        client_secret: &str,
        code: &str,
    ) -> Result<OAuthGrant, SlackError> {
        let resp = self
            .http
            .post(format!("{}/oauth.v2.access", self.base_url))
            .form(&[
                ("client_id", client_id),
                ("client_secret", client_secret),
                ("code", code),
            ])
            .send()
            .await?;

        let payload: Value = resp.json().await?;
        if payload.get("ok").and_then(Value::as_bool) != Some(true) {
            let code = payload
                .get("error")
                .and_then(Value::as_str)
                .unwrap_or("unknown_error");
            return Err(SlackError::Api(code.to_string()));
        }

        let team_id = payload
            .get("team")
            .and_then(|t| t.get("id"))
            .and_then(Value::as_str)
            .ok_or(SlackError::Malformed("oauth.v2.access"))?
            .to_string();
        let bot_token = payload
            .get("access_token")
            .and_then(Value::as_str)
            .ok_or(SlackError::Malformed("oauth.v2.access"))?
            .to_string();
        let bot_user_id = payload
            .get("bot_user_id")
            .and_then(Value::as_str)
            .map(str::to_string);

        Ok(OAuthGrant {
            team_id,
            bot_token,
            bot_user_id,
        })
    }
}

impl Default for SlackClient {
    fn default() -> Self {
        Self::new()
    }
}
