use axum::{
    body::Body,
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
};
use tracing::warn;

use askbox_slack::signing::verify_signature;

use crate::AppState;

const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Verify the Slack v0 signature on an inbound request. The body has to be
/// buffered to compute the MAC, then is handed back to the handler intact.
pub async fn verify_slack_request(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let (parts, body) = req.into_parts();

    let timestamp = parts
        .headers
        .get("x-slack-request-timestamp")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    let signature = parts
        .headers
        .get("x-slack-signature")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();

    let bytes = axum::body::to_bytes(body, MAX_BODY_BYTES)
        .await
        .map_err(|_| StatusCode::PAYLOAD_TOO_LARGE)?;

    let now = chrono::Utc::now().timestamp();
    if !verify_signature(&state.config.signing_secret, &timestamp, &bytes, &signature, now) {
        warn!(path = %parts.uri.path(), "rejected request with bad slack signature");
        return Err(StatusCode::UNAUTHORIZED);
    }

    let req = Request::from_parts(parts, Body::from(bytes));
    Ok(next.run(req).await)
}
