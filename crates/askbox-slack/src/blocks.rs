use askbox_types::vote::format_points;
use serde_json::{Value, json};

/// Action id of the "Respond" button; its value is the question id.
pub const RESPOND_ACTION: &str = "respond";
/// Action id of the "Close Voting" button; its value is the question id.
pub const CLOSE_VOTING_ACTION: &str = "close_voting";
/// Block / action ids of the modal input, matched by
/// `ViewPayload::response_text` on submission.
pub const RESPONSE_BLOCK: &str = "response_block";
pub const RESPONSE_INPUT: &str = "response_input";

/// Question message while voting is open: the text plus the two buttons.
pub fn question_blocks(text: &str, question_id: &str) -> Value {
    json!([
        {
            "type": "section",
            "text": { "type": "mrkdwn", "text": format!(":question: *Anonymous question:*\n{}", text) }
        },
        {
            "type": "actions",
            "elements": [
                {
                    "type": "button",
                    "text": { "type": "plain_text", "text": "Respond" },
                    "action_id": RESPOND_ACTION,
                    "value": question_id
                },
                {
                    "type": "button",
                    "text": { "type": "plain_text", "text": "Close Voting" },
                    "style": "danger",
                    "action_id": CLOSE_VOTING_ACTION,
                    "value": question_id
                }
            ]
        }
    ])
}

/// Question message after closing: same text, buttons stripped, closed marker.
pub fn closed_question_blocks(text: &str) -> Value {
    json!([
        {
            "type": "section",
            "text": { "type": "mrkdwn", "text": format!(":question: *Anonymous question:*\n{}", text) }
        },
        {
            "type": "context",
            "elements": [
                { "type": "mrkdwn", "text": ":lock: Voting is closed." }
            ]
        }
    ])
}

/// Rendered body of a response message at a given score.
pub fn response_text(text: &str, score: i64) -> String {
    format!("{}\n\nPoints: {}", text, format_points(score))
}

/// Modal for submitting an anonymous response. The question id rides along
/// in private_metadata.
pub fn respond_modal(question_id: &str) -> Value {
    json!({
        "type": "modal",
        "callback_id": "submit_response",
        "private_metadata": question_id,
        "title": { "type": "plain_text", "text": "Respond anonymously" },
        "submit": { "type": "plain_text", "text": "Submit" },
        "close": { "type": "plain_text", "text": "Cancel" },
        "blocks": [
            {
                "type": "input",
                "block_id": RESPONSE_BLOCK,
                "label": { "type": "plain_text", "text": "Your response" },
                "element": {
                    "type": "plain_text_input",
                    "action_id": RESPONSE_INPUT,
                    "multiline": true
                }
            }
        ]
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn question_blocks_carry_both_buttons() {
        let blocks = question_blocks("What is 2+2?", "q-1");
        let elements = blocks[1]["elements"].as_array().unwrap();
        assert_eq!(elements.len(), 2);
        assert_eq!(elements[0]["action_id"], RESPOND_ACTION);
        assert_eq!(elements[1]["action_id"], CLOSE_VOTING_ACTION);
        assert_eq!(elements[0]["value"], "q-1");
        assert_eq!(elements[1]["value"], "q-1");
    }

    #[test]
    fn closed_blocks_have_no_actions() {
        let blocks = closed_question_blocks("What is 2+2?");
        for block in blocks.as_array().unwrap() {
            assert_ne!(block["type"], "actions");
        }
    }

    #[test]
    fn response_text_formats_score() {
        assert_eq!(response_text("4", 0), "4\n\nPoints: 0");
        assert_eq!(response_text("4", 1), "4\n\nPoints: +1");
        assert_eq!(response_text("4", -2), "4\n\nPoints: -2");
    }

    #[test]
    fn modal_input_ids_match_submission_parser() {
        let view = respond_modal("q-1");
        assert_eq!(view["private_metadata"], "q-1");
        assert_eq!(view["blocks"][0]["block_id"], RESPONSE_BLOCK);
        assert_eq!(view["blocks"][0]["element"]["action_id"], RESPONSE_INPUT);
    }
}
