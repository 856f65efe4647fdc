//! Webhook handler for inbound deliveries

use axum::{
    body::Bytes,
    extract::ConnectInfo,
    extract::State as AxumState,
    http::{HeaderMap, StatusCode, header},
};
use std::net::SocketAddr;
use tracing::{error, info, warn};

use crate::SharedState;
use crate::Strings;
use crate::discord::{build_push_messages, build_unknown_message};
use crate::error::{RelayError, Result};
use crate::utils::verify_github_signature;
use crate::webhook::{PushEvent, UnknownEvent, WebhookKind, repo_full_name};

/// Handles the webhook POST request.
///
/// GitHub deliveries are verified and announced to the repository's
/// destination; anything else is reported to the fallback destination.
pub async fn handle_webhook(
    AxumState(state): AxumState<SharedState>,
    ConnectInfo(peer_addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, String) {
    let strings = &state.config.strings;

    // Both paths work on a JSON body.
    let payload: serde_json::Value = match serde_json::from_slice(&body) {
        Ok(v) => v,
        Err(e) => {
            info!("Could not parse JSON body: {:?}", e);
            return (StatusCode::BAD_REQUEST, strings.not_json().to_string());
        }
    };

    let user_agent = headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok());

    match WebhookKind::classify(user_agent) {
        WebhookKind::GitHub => handle_github_push(&state, &headers, &body, &payload).await,
        WebhookKind::Unknown => handle_unknown_event(&state, &headers, peer_addr, &payload).await,
    }
}

async fn handle_github_push(
    state: &SharedState,
    headers: &HeaderMap,
    body: &Bytes,
    payload: &serde_json::Value,
) -> (StatusCode, String) {
    let strings = &state.config.strings;
    match github_push_pipeline(state, headers, body, payload).await {
        Ok(response) => (StatusCode::OK, response),
        Err(e) => {
            let (status, response) = error_response(strings, &e);
            if status.is_server_error() {
                error!("Push relay failed: {}", e);
            } else {
                warn!("Push relay rejected: {}", e);
            }
            (status, response)
        }
    }
}

/// Runs the push pipeline and returns the success response text.
///
/// The repository lookup comes first, so an unconfigured repository is
/// answered before any signature handling. Verification runs over the
/// raw body bytes, not the reparsed payload.
async fn github_push_pipeline(
    state: &SharedState,
    headers: &HeaderMap,
    body: &Bytes,
    payload: &serde_json::Value,
) -> Result<String> {
    let strings = &state.config.strings;

    let repo = repo_full_name(payload)
        .and_then(|full_name| state.config.find_repository(full_name))
        .ok_or(RelayError::NotConfigured)?;

    let signature = headers
        .get("X-Hub-Signature-256")
        .and_then(|v| v.to_str().ok())
        .ok_or(RelayError::SignatureMissing)?;
    if !verify_github_signature(&repo.secret, body, signature) {
        return Err(RelayError::SignatureInvalid);
    }

    let event = PushEvent::from_payload(payload)?;

    // Pushes from the ignored account are acknowledged without a message.
    if event.pusher_name == state.config.ignored_pusher() {
        info!(
            "Ignoring push to '{}' from '{}'",
            repo.full_name, event.pusher_name
        );
        return Ok(strings.push_ignored().to_string());
    }

    let messages = build_push_messages(&event, &state.config);
    state.delivery.deliver(&messages, &repo.webhook_url).await?;

    info!(
        "Relayed push to '{}' ({} commits, {} messages)",
        repo.full_name,
        event.commits.len(),
        messages.len()
    );
    Ok(strings.push_sent().to_string())
}

async fn handle_unknown_event(
    state: &SharedState,
    headers: &HeaderMap,
    peer_addr: SocketAddr,
    payload: &serde_json::Value,
) -> (StatusCode, String) {
    let strings = &state.config.strings;
    let event = UnknownEvent::from_request(headers, peer_addr, payload);
    info!(
        "Unknown webhook event from {} ({:?})",
        event.source_ip, event.user_agent
    );

    let message = build_unknown_message(&event, &state.config);
    match state
        .delivery
        .deliver(&[message], &state.config.unknown_webhook_url)
        .await
    {
        Ok(()) => (StatusCode::OK, strings.unknown_reported().to_string()),
        Err(e) => {
            error!("Failed to report unknown event: {}", e);
            error_response(strings, &e)
        }
    }
}

/// Maps a pipeline error to its HTTP status and response text.
fn error_response(strings: &Strings, err: &RelayError) -> (StatusCode, String) {
    match err {
        RelayError::NotConfigured => (StatusCode::NOT_FOUND, strings.not_configured().to_string()),
        RelayError::SignatureMissing => {
            (StatusCode::FORBIDDEN, strings.signature_missing().to_string())
        }
        RelayError::SignatureInvalid => {
            (StatusCode::FORBIDDEN, strings.signature_invalid().to_string())
        }
        RelayError::Delivery { body, .. } => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("{}: {}", strings.delivery_failed(), body),
        ),
        // Transport failure detail never reaches clients.
        RelayError::Request(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            strings.error_occurred().to_string(),
        ),
        _ => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("{}: {}", strings.error_occurred(), err),
        ),
    }
}
