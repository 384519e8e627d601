use serde::Deserialize;
use serde_json::Value;

/// Form body of an inbound slash command.
#[derive(Debug, Clone, Deserialize)]
pub struct SlashCommand {
    pub team_id: String,
    pub channel_id: String,
    pub user_id: String,
    #[serde(default)]
    pub text: String,
    pub trigger_id: String,
    #[serde(default)]
    pub command: String,
}

/// Outer envelope of the Events API. `url_verification` arrives once during
/// endpoint setup; everything else is an `event_callback` wrapper.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventEnvelope {
    UrlVerification {
        challenge: String,
    },
    EventCallback {
        team_id: String,
        event: CallbackEvent,
    },
}

/// Inner events we care about. Reaction events carry no application-level
/// identifier — only the (channel, ts) of the message they landed on.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CallbackEvent {
    ReactionAdded {
        user: String,
        reaction: String,
        item: ReactionItem,
    },
    ReactionRemoved {
        user: String,
        reaction: String,
        item: ReactionItem,
    },
    /// Anything else delivered to the endpoint; logged and dropped.
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReactionItem {
    #[serde(default)]
    pub channel: String,
    #[serde(default)]
    pub ts: String,
}

/// Interactivity payload (the JSON carried in the `payload` form field).
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InteractionPayload {
    BlockActions {
        team: IdField,
        user: IdField,
        #[serde(default)]
        channel: Option<IdField>,
        #[serde(default)]
        trigger_id: Option<String>,
        #[serde(default)]
        actions: Vec<BlockAction>,
    },
    ViewSubmission {
        team: IdField,
        user: IdField,
        view: ViewPayload,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IdField {
    pub id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BlockAction {
    pub action_id: String,
    /// Opaque question id carried as the button value.
    #[serde(default)]
    pub value: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ViewPayload {
    #[serde(default)]
    pub private_metadata: String,
    /// Raw `state.values` tree; drilled into by a helper rather than a
    /// rigid struct since block/action ids are our own constants.
    #[serde(default)]
    pub state: Value,
}

impl ViewPayload {
    /// Extract the free-text value of the response input block.
    pub fn response_text(&self) -> Option<&str> {
        self.state
            .get("values")?
            .get("response_block")?
            .get("response_input")?
            .get("value")?
            .as_str()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_reaction_added_event() {
        let raw = serde_json::json!({
            "type": "event_callback",
            "team_id": "T123",
            "event": {
                "type": "reaction_added",
                "user": "U42",
                "reaction": "+1",
                "item": { "type": "message", "channel": "C9", "ts": "1700000000.000200" }
            }
        });
        let env: EventEnvelope = serde_json::from_value(raw).unwrap();
        match env {
            EventEnvelope::EventCallback { team_id, event } => {
                assert_eq!(team_id, "T123");
                match event {
                    CallbackEvent::ReactionAdded { user, reaction, item } => {
                        assert_eq!(user, "U42");
                        assert_eq!(reaction, "+1");
                        assert_eq!(item.channel, "C9");
                        assert_eq!(item.ts, "1700000000.000200");
                    }
                    other => panic!("wrong event: {:?}", other),
                }
            }
            other => panic!("wrong envelope: {:?}", other),
        }
    }

    #[test]
    fn unknown_inner_event_maps_to_other() {
        let raw = serde_json::json!({
            "type": "event_callback",
            "team_id": "T123",
            "event": { "type": "app_mention", "user": "U1" }
        });
        let env: EventEnvelope = serde_json::from_value(raw).unwrap();
        match env {
            EventEnvelope::EventCallback { event, .. } => {
                assert!(matches!(event, CallbackEvent::Other));
            }
            other => panic!("wrong envelope: {:?}", other),
        }
    }

    #[test]
    fn view_submission_text_extraction() {
        let raw = serde_json::json!({
            "type": "view_submission",
            "team": { "id": "T1" },
            "user": { "id": "U1" },
            "view": {
                "private_metadata": "q-123",
                "state": {
                    "values": {
                        "response_block": {
                            "response_input": { "type": "plain_text_input", "value": "  4  " }
                        }
                    }
                }
            }
        });
        let payload: InteractionPayload = serde_json::from_value(raw).unwrap();
        match payload {
            InteractionPayload::ViewSubmission { view, .. } => {
                assert_eq!(view.private_metadata, "q-123");
                assert_eq!(view.response_text(), Some("  4  "));
            }
            other => panic!("wrong payload: {:?}", other),
        }
    }
}
