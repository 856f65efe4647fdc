//! Webhook classification and payload extraction

use axum::http::HeaderMap;
use axum::http::header;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::net::SocketAddr;

use crate::error::{RelayError, Result};

/// User-agent fragment identifying GitHub's webhook deliveries.
const GITHUB_USER_AGENT_MARKER: &str = "github-hookshot";

/// Where an inbound request is routed after classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebhookKind {
    /// A GitHub delivery, subject to signature verification.
    GitHub,
    /// Anything else; reported to the fallback destination.
    Unknown,
}

impl WebhookKind {
    /// Classifies a request by its user-agent value.
    pub fn classify(user_agent: Option<&str>) -> Self {
        match user_agent {
            Some(agent) if agent.to_lowercase().contains(GITHUB_USER_AGENT_MARKER) => {
                WebhookKind::GitHub
            }
            _ => WebhookKind::Unknown,
        }
    }
}

/// Repository full name used for the relay table lookup.
pub fn repo_full_name(payload: &Value) -> Option<&str> {
    payload
        .get("repository")
        .and_then(|repository| repository.get("full_name"))
        .and_then(Value::as_str)
}

/// One commit of a push delivery, reduced to what gets displayed.
#[derive(Debug, Clone)]
pub struct CommitRecord {
    pub id: String,
    pub message: String,
    pub author_name: String,
    pub url: String,
    pub added: bool,
    pub modified: bool,
    pub removed: bool,
}

impl CommitRecord {
    fn from_value(commit: &Value) -> Result<Self> {
        Ok(CommitRecord {
            id: required_str(commit, "id", "commits[].id")?,
            message: required_str(commit, "message", "commits[].message")?,
            author_name: commit
                .get("author")
                .and_then(|author| author.get("name"))
                .and_then(Value::as_str)
                .ok_or(RelayError::MalformedPayload("commits[].author.name"))?
                .to_string(),
            url: required_str(commit, "url", "commits[].url")?,
            added: has_entries(commit, "added"),
            modified: has_entries(commit, "modified"),
            removed: has_entries(commit, "removed"),
        })
    }
}

/// The fields of a push delivery the relay acts on.
#[derive(Debug, Clone)]
pub struct PushEvent {
    pub repo_full_name: String,
    pub repo_name: String,
    pub repo_url: String,
    pub pusher_name: String,
    pub pusher_avatar_url: String,
    pub commits: Vec<CommitRecord>,
}

impl PushEvent {
    /// Extracts the push fields, naming the first missing one on failure.
    pub fn from_payload(payload: &Value) -> Result<Self> {
        let repository = payload
            .get("repository")
            .ok_or(RelayError::MalformedPayload("repository"))?;
        let sender = payload
            .get("sender")
            .ok_or(RelayError::MalformedPayload("sender"))?;
        let commits = payload
            .get("commits")
            .and_then(Value::as_array)
            .ok_or(RelayError::MalformedPayload("commits"))?
            .iter()
            .map(CommitRecord::from_value)
            .collect::<Result<Vec<_>>>()?;

        Ok(PushEvent {
            repo_full_name: required_str(repository, "full_name", "repository.full_name")?,
            repo_name: required_str(repository, "name", "repository.name")?,
            repo_url: required_str(repository, "html_url", "repository.html_url")?,
            pusher_name: payload
                .get("pusher")
                .and_then(|pusher| pusher.get("name"))
                .and_then(Value::as_str)
                .ok_or(RelayError::MalformedPayload("pusher.name"))?
                .to_string(),
            pusher_avatar_url: required_str(sender, "avatar_url", "sender.avatar_url")?,
            commits,
        })
    }
}

fn required_str(value: &Value, key: &str, field: &'static str) -> Result<String> {
    value
        .get(key)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or(RelayError::MalformedPayload(field))
}

fn has_entries(commit: &Value, key: &str) -> bool {
    commit
        .get(key)
        .and_then(Value::as_array)
        .is_some_and(|files| !files.is_empty())
}

/// What the relay reports about a request it cannot classify.
#[derive(Debug, Clone)]
pub struct UnknownEvent {
    pub source_ip: String,
    pub user_agent: Option<String>,
    pub headers: Vec<(String, String)>,
    pub body: String,
    pub received_at: DateTime<Utc>,
}

impl UnknownEvent {
    /// Captures the report fields from an unclassified request.
    ///
    /// The source address prefers a proxy-set `X-Real-IP` header over
    /// the peer address of the connection.
    pub fn from_request(headers: &HeaderMap, peer_addr: SocketAddr, payload: &Value) -> Self {
        let source_ip = headers
            .get("x-real-ip")
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
            .unwrap_or_else(|| peer_addr.ip().to_string());

        let user_agent = headers
            .get(header::USER_AGENT)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);

        // Header names come out of the map lowercased already.
        let filtered = headers
            .iter()
            .filter_map(|(name, value)| {
                let name = name.as_str();
                if !(name.starts_with("x-") || name.starts_with("content-")) {
                    return None;
                }
                value
                    .to_str()
                    .ok()
                    .map(|value| (name.to_string(), value.to_string()))
            })
            .collect();

        UnknownEvent {
            source_ip,
            user_agent,
            headers: filtered,
            body: serde_json::to_string_pretty(payload).unwrap_or_else(|_| payload.to_string()),
            received_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn classifies_github_by_user_agent_marker() {
        assert_eq!(
            WebhookKind::classify(Some("GitHub-Hookshot/044aadd")),
            WebhookKind::GitHub
        );
        assert_eq!(WebhookKind::classify(Some("curl/8.5.0")), WebhookKind::Unknown);
        assert_eq!(WebhookKind::classify(None), WebhookKind::Unknown);
    }

    fn push_payload() -> Value {
        json!({
            "repository": {
                "full_name": "octo/widgets",
                "name": "widgets",
                "html_url": "https://github.com/octo/widgets",
            },
            "pusher": {"name": "Alice"},
            "sender": {"avatar_url": "https://avatars.example/alice.png"},
            "commits": [{
                "id": "abcdef1234567",
                "message": "initial commit",
                "url": "https://github.com/octo/widgets/commit/abcdef1234567",
                "author": {"name": "Alice"},
                "added": ["README.md"],
                "modified": [],
                "removed": [],
            }],
        })
    }

    #[test]
    fn extracts_push_fields() {
        let event = PushEvent::from_payload(&push_payload()).unwrap();
        assert_eq!(event.repo_full_name, "octo/widgets");
        assert_eq!(event.repo_name, "widgets");
        assert_eq!(event.pusher_name, "Alice");
        assert_eq!(event.commits.len(), 1);
        assert!(event.commits[0].added);
        assert!(!event.commits[0].modified);
        assert!(!event.commits[0].removed);
    }

    #[test]
    fn missing_field_is_named_in_the_error() {
        let mut payload = push_payload();
        payload["pusher"] = json!({});
        let err = PushEvent::from_payload(&payload).unwrap_err();
        assert!(matches!(err, RelayError::MalformedPayload("pusher.name")));
    }

    #[test]
    fn commit_without_file_lists_lands_in_no_bucket() {
        let mut payload = push_payload();
        payload["commits"][0]["added"] = json!([]);
        payload["commits"][0].as_object_mut().unwrap().remove("modified");
        let event = PushEvent::from_payload(&payload).unwrap();
        assert!(!event.commits[0].added);
        assert!(!event.commits[0].modified);
    }

    #[test]
    fn unknown_event_prefers_forwarded_ip_and_filters_headers() {
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", "203.0.113.7".parse().unwrap());
        headers.insert("x-ping", "1".parse().unwrap());
        headers.insert("content-type", "application/json".parse().unwrap());
        headers.insert("accept", "*/*".parse().unwrap());
        let peer = SocketAddr::from(([10, 0, 0, 1], 4567));

        let event = UnknownEvent::from_request(&headers, peer, &json!({"ping": true}));
        assert_eq!(event.source_ip, "203.0.113.7");
        let names: Vec<&str> = event.headers.iter().map(|(name, _)| name.as_str()).collect();
        assert!(names.contains(&"x-ping"));
        assert!(names.contains(&"content-type"));
        assert!(!names.contains(&"accept"));
    }

    #[test]
    fn unknown_event_falls_back_to_peer_address() {
        let headers = HeaderMap::new();
        let peer = SocketAddr::from(([10, 0, 0, 1], 4567));
        let event = UnknownEvent::from_request(&headers, peer, &json!({}));
        assert_eq!(event.source_ip, "10.0.0.1");
        assert!(event.user_agent.is_none());
        assert!(event.headers.is_empty());
    }
}
