pub mod api;
pub mod delivery;
pub mod discord;
pub mod error;
pub mod utils;
pub mod webhook;

use serde::Deserialize;
use std::sync::Arc;
use std::collections::HashMap;

use crate::delivery::DeliveryClient;

const DEFAULT_IGNORED_PUSHER: &str = "dependabot[bot]";
const DEFAULT_REDACTION_TRIGGER: &str = "secret";

const DEFAULT_AUTHOR_NAME: &str = "GN | System";
const DEFAULT_AUTHOR_ICON_URL: &str =
    "https://cdn.discordapp.com/avatars/1289365690146492418/1fcf3895b5c8486c802a704ea3505f81.webp?size=4096";
const DEFAULT_EMBED_COLOR: u32 = 14177041;

#[derive(Debug, Deserialize, Clone)]
pub struct RelayConfig {
    /// Destination for reports about requests from unknown senders.
    pub unknown_webhook_url: String,
    pub ignored_pusher: Option<String>,
    pub redaction_trigger: Option<String>,
    pub pusher_aliases: Option<HashMap<String, String>>,
    #[serde(default)]
    pub embed: EmbedStyle,
    pub repository: Vec<RepositoryConfig>,
    #[serde(default)]
    pub strings: Strings,
}

impl RelayConfig {
    /// Returns the repository entry whose full name matches exactly.
    pub fn find_repository(&self, full_name: &str) -> Option<&RepositoryConfig> {
        self.repository.iter().find(|r| r.full_name == full_name)
    }

    /// Returns the pusher account whose pushes are acknowledged but never relayed.
    pub fn ignored_pusher(&self) -> &str {
        self.ignored_pusher
            .as_deref()
            .unwrap_or(DEFAULT_IGNORED_PUSHER)
    }

    /// Returns the substring that marks a commit message as confidential.
    pub fn redaction_trigger(&self) -> &str {
        self.redaction_trigger
            .as_deref()
            .unwrap_or(DEFAULT_REDACTION_TRIGGER)
    }

    /// Returns the display name for a pusher.
    /// If the alias table contains the pusher, returns the alias,
    /// otherwise returns the name unchanged.
    pub fn display_name<'a>(&'a self, pusher: &'a str) -> &'a str {
        if let Some(aliases) = &self.pusher_aliases {
            if let Some(alias) = aliases.get(pusher) {
                return alias;
            }
        }
        pusher
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct RepositoryConfig {
    pub full_name: String,
    pub secret: String,
    pub webhook_url: String,
}

/// Embed cosmetics, overridable per deployment.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct EmbedStyle {
    pub author_name: Option<String>,
    pub author_icon_url: Option<String>,
    pub color: Option<u32>,
}

impl EmbedStyle {
    pub fn author_name(&self) -> &str {
        self.author_name.as_deref().unwrap_or(DEFAULT_AUTHOR_NAME)
    }

    pub fn author_icon_url(&self) -> &str {
        self.author_icon_url
            .as_deref()
            .unwrap_or(DEFAULT_AUTHOR_ICON_URL)
    }

    pub fn color(&self) -> u32 {
        self.color.unwrap_or(DEFAULT_EMBED_COLOR)
    }
}

/// User-facing texts for responses and chat messages.
///
/// Every entry falls back to an English default, so a deployment only
/// overrides the strings it wants to localize. `unknown_intro` may
/// contain `{ip}`, which is replaced by the source address.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Strings {
    pub not_json: Option<String>,
    pub not_configured: Option<String>,
    pub signature_missing: Option<String>,
    pub signature_invalid: Option<String>,
    pub push_ignored: Option<String>,
    pub push_sent: Option<String>,
    pub unknown_reported: Option<String>,
    pub delivery_failed: Option<String>,
    pub error_occurred: Option<String>,
    pub redacted_commit: Option<String>,
    pub added_heading: Option<String>,
    pub edited_heading: Option<String>,
    pub removed_heading: Option<String>,
    pub unknown_title: Option<String>,
    pub unknown_intro: Option<String>,
    pub ip_label: Option<String>,
    pub user_agent_label: Option<String>,
    pub headers_label: Option<String>,
    pub body_label: Option<String>,
    pub time_label: Option<String>,
    pub unavailable: Option<String>,
}

impl Strings {
    pub fn not_json(&self) -> &str {
        self.not_json.as_deref().unwrap_or("Request must contain JSON.")
    }

    pub fn not_configured(&self) -> &str {
        self.not_configured.as_deref().unwrap_or("Repository not configured.")
    }

    pub fn signature_missing(&self) -> &str {
        self.signature_missing.as_deref().unwrap_or("Signature not provided.")
    }

    pub fn signature_invalid(&self) -> &str {
        self.signature_invalid.as_deref().unwrap_or("Invalid signature.")
    }

    pub fn push_ignored(&self) -> &str {
        self.push_ignored.as_deref().unwrap_or("Dependency updates are ignored.")
    }

    pub fn push_sent(&self) -> &str {
        self.push_sent.as_deref().unwrap_or("Message sent successfully")
    }

    pub fn unknown_reported(&self) -> &str {
        self.unknown_reported
            .as_deref()
            .unwrap_or("You are not authorized to access this API. Report sent.")
    }

    pub fn delivery_failed(&self) -> &str {
        self.delivery_failed.as_deref().unwrap_or("Failed to send the message")
    }

    pub fn error_occurred(&self) -> &str {
        self.error_occurred.as_deref().unwrap_or("An error occurred")
    }

    pub fn redacted_commit(&self) -> &str {
        self.redacted_commit.as_deref().unwrap_or("🕵️ This commit is secret.")
    }

    pub fn added_heading(&self) -> &str {
        self.added_heading.as_deref().unwrap_or("**🚀 Added:**")
    }

    pub fn edited_heading(&self) -> &str {
        self.edited_heading.as_deref().unwrap_or("**📦 Edited:**")
    }

    pub fn removed_heading(&self) -> &str {
        self.removed_heading.as_deref().unwrap_or("**⛔ Removed:**")
    }

    pub fn unknown_title(&self) -> &str {
        self.unknown_title.as_deref().unwrap_or("⚠️ Unknown event on the API")
    }

    pub fn unknown_intro(&self) -> &str {
        self.unknown_intro.as_deref().unwrap_or(
            "An unknown webhook event was received. It came through the IP address: {ip}\nHere are the details:",
        )
    }

    pub fn ip_label(&self) -> &str {
        self.ip_label.as_deref().unwrap_or("**🌐 IP address:**")
    }

    pub fn user_agent_label(&self) -> &str {
        self.user_agent_label.as_deref().unwrap_or("**🤖 User-Agent:**")
    }

    pub fn headers_label(&self) -> &str {
        self.headers_label.as_deref().unwrap_or("**💾 Headers:**")
    }

    pub fn body_label(&self) -> &str {
        self.body_label.as_deref().unwrap_or("**📷 Body:**")
    }

    pub fn time_label(&self) -> &str {
        self.time_label.as_deref().unwrap_or("**🕔 Time:**")
    }

    pub fn unavailable(&self) -> &str {
        self.unavailable.as_deref().unwrap_or("Not available")
    }
}

pub struct AppState {
    pub config: RelayConfig,
    pub delivery: DeliveryClient,
}

pub type SharedState = Arc<AppState>;
