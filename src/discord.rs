//! Discord embed construction for push and fallback reports

use chrono::Utc;
use serde::Serialize;

use crate::RelayConfig;
use crate::utils::split_text;
use crate::webhook::{CommitRecord, PushEvent, UnknownEvent};

/// Longest description sent in a single embed, in characters.
pub const DESCRIPTION_LIMIT: usize = 4000;

#[derive(Debug, Clone, Serialize)]
pub struct EmbedAuthor {
    pub name: String,
    pub icon_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EmbedFooter {
    pub text: String,
    pub icon_url: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Embed {
    pub author: EmbedAuthor,
    pub title: String,
    pub description: String,
    pub color: u32,
    pub timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub footer: Option<EmbedFooter>,
}

/// Body of one POST to a Discord incoming webhook.
#[derive(Debug, Clone, Serialize)]
pub struct DiscordMessage {
    pub embeds: Vec<Embed>,
}

/// Formats one commit as a display line.
///
/// The id is shortened to its first seven characters, and a message
/// containing the redaction trigger is replaced before any formatting.
fn format_commit(commit: &CommitRecord, trigger: &str, placeholder: &str) -> String {
    let short_id: String = commit.id.chars().take(7).collect();
    let message = if commit.message.to_lowercase().contains(&trigger.to_lowercase()) {
        placeholder
    } else {
        commit.message.as_str()
    };
    format!("[`{}`]({}) - {} - {}", short_id, commit.url, message, commit.author_name)
}

/// A bucket's lines joined by line breaks, a blank line when empty.
fn section_text(lines: &[String]) -> String {
    if lines.is_empty() {
        "\n".to_string()
    } else {
        lines.join("\n")
    }
}

/// Builds the ordered messages announcing a push.
///
/// Commits land under the added, edited and removed headings; a commit
/// that touched files in several ways appears under each matching one.
/// Descriptions over the limit are split into follow-up messages that
/// share one timestamp.
pub fn build_push_messages(event: &PushEvent, config: &RelayConfig) -> Vec<DiscordMessage> {
    let strings = &config.strings;
    let trigger = config.redaction_trigger();
    let placeholder = strings.redacted_commit();

    let mut added = Vec::new();
    let mut modified = Vec::new();
    let mut removed = Vec::new();

    for commit in &event.commits {
        let line = format_commit(commit, trigger, placeholder);
        if commit.added {
            added.push(line.clone());
        }
        if commit.modified {
            modified.push(line.clone());
        }
        if commit.removed {
            removed.push(line);
        }
    }

    let description = format!(
        "{}\n{}\n\n{}\n{}\n\n{}\n{}",
        strings.added_heading(),
        section_text(&added),
        strings.edited_heading(),
        section_text(&modified),
        strings.removed_heading(),
        section_text(&removed),
    );

    let timestamp = Utc::now().to_rfc3339();
    let author = EmbedAuthor {
        name: config.embed.author_name().to_string(),
        icon_url: config.embed.author_icon_url().to_string(),
        url: Some(event.repo_url.clone()),
    };
    let footer = EmbedFooter {
        text: config.display_name(&event.pusher_name).to_string(),
        icon_url: event.pusher_avatar_url.clone(),
    };

    split_text(&description, DESCRIPTION_LIMIT)
        .into_iter()
        .map(|part| DiscordMessage {
            embeds: vec![Embed {
                author: author.clone(),
                title: event.repo_name.clone(),
                description: part,
                color: config.embed.color(),
                timestamp: timestamp.clone(),
                footer: Some(footer.clone()),
            }],
        })
        .collect()
}

/// Builds the single report message for an unclassified request.
pub fn build_unknown_message(event: &UnknownEvent, config: &RelayConfig) -> DiscordMessage {
    let strings = &config.strings;
    let user_agent = event.user_agent.as_deref().unwrap_or(strings.unavailable());
    let headers = if event.headers.is_empty() {
        strings.unavailable().to_string()
    } else {
        event
            .headers
            .iter()
            .map(|(name, value)| format!("{}: {}", name, value))
            .collect::<Vec<_>>()
            .join("\n")
    };

    // The intro may name the source address through a `{ip}` marker.
    let intro = strings.unknown_intro().replace("{ip}", &event.source_ip);

    let description = format!(
        "{}\n\n{} {}\n{} {}\n{}\n{}\n\n{}\n{}\n\n{} {} UTC",
        intro,
        strings.ip_label(),
        event.source_ip,
        strings.user_agent_label(),
        user_agent,
        strings.headers_label(),
        headers,
        strings.body_label(),
        event.body,
        strings.time_label(),
        event.received_at.format("%d.%m.%Y %H:%M:%S"),
    );

    DiscordMessage {
        embeds: vec![Embed {
            author: EmbedAuthor {
                name: config.embed.author_name().to_string(),
                icon_url: config.embed.author_icon_url().to_string(),
                url: None,
            },
            title: strings.unknown_title().to_string(),
            description,
            color: config.embed.color(),
            timestamp: event.received_at.to_rfc3339(),
            footer: None,
        }],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{EmbedStyle, RelayConfig, Strings};
    use chrono::TimeZone;
    use std::collections::HashMap;

    fn test_config() -> RelayConfig {
        RelayConfig {
            unknown_webhook_url: "https://discord.example/api/webhooks/0/unknown".to_string(),
            ignored_pusher: None,
            redaction_trigger: None,
            pusher_aliases: Some(HashMap::from([("Zaross".to_string(), "Zaros".to_string())])),
            embed: EmbedStyle::default(),
            repository: Vec::new(),
            strings: Strings::default(),
        }
    }

    fn commit(id: &str, message: &str, added: bool, modified: bool, removed: bool) -> CommitRecord {
        CommitRecord {
            id: id.to_string(),
            message: message.to_string(),
            author_name: "Alice".to_string(),
            url: format!("https://github.com/octo/widgets/commit/{id}"),
            added,
            modified,
            removed,
        }
    }

    fn push_event(commits: Vec<CommitRecord>) -> PushEvent {
        PushEvent {
            repo_full_name: "octo/widgets".to_string(),
            repo_name: "widgets".to_string(),
            repo_url: "https://github.com/octo/widgets".to_string(),
            pusher_name: "Alice".to_string(),
            pusher_avatar_url: "https://avatars.example/alice.png".to_string(),
            commits,
        }
    }

    #[test]
    fn formats_commit_lines_under_the_added_heading() {
        let config = test_config();
        let event = push_event(vec![commit("abcdef1234567", "initial commit", true, false, false)]);

        let messages = build_push_messages(&event, &config);
        assert_eq!(messages.len(), 1);

        let description = &messages[0].embeds[0].description;
        let expected =
            "[`abcdef1`](https://github.com/octo/widgets/commit/abcdef1234567) - initial commit - Alice";
        let added_section = description.split("**📦 Edited:**").next().unwrap();
        let rest = description.split("**📦 Edited:**").nth(1).unwrap();
        assert!(added_section.contains(expected));
        assert!(!rest.contains(expected));
    }

    #[test]
    fn commit_in_several_buckets_appears_under_each_heading() {
        let config = test_config();
        let event = push_event(vec![commit("1234567890abc", "restructure", true, false, true)]);

        let description = &build_push_messages(&event, &config)[0].embeds[0].description;
        let line = "[`1234567`](https://github.com/octo/widgets/commit/1234567890abc) - restructure - Alice";

        let after_edited = description.split("**📦 Edited:**").nth(1).unwrap();
        let edited_section = after_edited.split("**⛔ Removed:**").next().unwrap();
        let removed_section = after_edited.split("**⛔ Removed:**").nth(1).unwrap();
        assert!(description.split("**📦 Edited:**").next().unwrap().contains(line));
        assert!(!edited_section.contains(line));
        assert!(removed_section.contains(line));
    }

    #[test]
    fn empty_buckets_render_as_blank_sections() {
        let config = test_config();
        let event = push_event(Vec::new());

        let description = &build_push_messages(&event, &config)[0].embeds[0].description;
        assert_eq!(
            description,
            "**🚀 Added:**\n\n\n\n**📦 Edited:**\n\n\n\n**⛔ Removed:**\n\n"
        );
    }

    #[test]
    fn redacts_messages_containing_the_trigger() {
        let config = test_config();
        let event = push_event(vec![commit("abcdef1234567", "Add SECRET key handling", true, false, false)]);

        let description = &build_push_messages(&event, &config)[0].embeds[0].description;
        assert!(description.contains("🕵️ This commit is secret."));
        assert!(!description.contains("SECRET key"));
    }

    #[test]
    fn footer_uses_the_alias_display_name() {
        let config = test_config();
        let mut event = push_event(vec![commit("abcdef1234567", "tweak", false, true, false)]);
        event.pusher_name = "Zaross".to_string();

        let embed = &build_push_messages(&event, &config)[0].embeds[0];
        let footer = embed.footer.as_ref().unwrap();
        assert_eq!(footer.text, "Zaros");
        assert_eq!(footer.icon_url, "https://avatars.example/alice.png");
        assert_eq!(embed.title, "widgets");
        assert_eq!(embed.author.url.as_deref(), Some("https://github.com/octo/widgets"));
    }

    #[test]
    fn long_descriptions_split_into_messages_sharing_a_timestamp() {
        let config = test_config();
        let long_message = "x".repeat(180);
        let commits = (0..40)
            .map(|i| commit(&format!("{i:07}abcdef"), &long_message, true, false, false))
            .collect();
        let event = push_event(commits);

        let messages = build_push_messages(&event, &config);
        assert!(messages.len() > 1);
        for message in &messages {
            assert_eq!(message.embeds.len(), 1);
            let embed = &message.embeds[0];
            assert!(embed.description.chars().count() <= DESCRIPTION_LIMIT);
            assert_eq!(embed.timestamp, messages[0].embeds[0].timestamp);
            assert_eq!(embed.title, "widgets");
        }
    }

    #[test]
    fn unknown_message_reports_ip_headers_and_time() {
        let config = test_config();
        let event = UnknownEvent {
            source_ip: "203.0.113.7".to_string(),
            user_agent: Some("curl/8.5.0".to_string()),
            headers: vec![
                ("x-ping".to_string(), "1".to_string()),
                ("content-type".to_string(), "application/json".to_string()),
            ],
            body: "{\n  \"ping\": true\n}".to_string(),
            received_at: Utc.with_ymd_and_hms(2024, 5, 17, 6, 30, 9).unwrap(),
        };

        let message = build_unknown_message(&event, &config);
        let embed = &message.embeds[0];
        assert_eq!(embed.title, "⚠️ Unknown event on the API");
        assert!(embed.footer.is_none());
        assert!(embed.author.url.is_none());
        assert!(embed.description.contains("the IP address: 203.0.113.7\n"));
        assert!(embed.description.contains("**🌐 IP address:** 203.0.113.7"));
        assert!(embed.description.contains("curl/8.5.0"));
        assert!(embed.description.contains("x-ping: 1"));
        assert!(embed.description.contains("\"ping\": true"));
        assert!(embed.description.contains("17.05.2024 06:30:09 UTC"));
    }

    #[test]
    fn intro_override_substitutes_the_source_address() {
        let mut config = test_config();
        config.strings.unknown_intro = Some(
            "Es lief über die IP-Adresse: {ip} \nHier sind die Details:".to_string(),
        );
        let event = UnknownEvent {
            source_ip: "198.51.100.4".to_string(),
            user_agent: None,
            headers: Vec::new(),
            body: "{}".to_string(),
            received_at: Utc::now(),
        };

        let description = &build_unknown_message(&event, &config).embeds[0].description;
        assert!(description.starts_with("Es lief über die IP-Adresse: 198.51.100.4 \n"));
    }

    #[test]
    fn unknown_message_marks_absent_fields_as_unavailable() {
        let config = test_config();
        let event = UnknownEvent {
            source_ip: "10.0.0.1".to_string(),
            user_agent: None,
            headers: Vec::new(),
            body: "{}".to_string(),
            received_at: Utc::now(),
        };

        let description = &build_unknown_message(&event, &config).embeds[0].description;
        assert!(description.contains("**🤖 User-Agent:** Not available"));
        assert!(description.contains("Not available"));
    }

    #[test]
    fn optional_embed_fields_stay_off_the_wire() {
        let config = test_config();
        let event = UnknownEvent {
            source_ip: "10.0.0.1".to_string(),
            user_agent: None,
            headers: Vec::new(),
            body: "{}".to_string(),
            received_at: Utc::now(),
        };

        let value = serde_json::to_value(build_unknown_message(&event, &config)).unwrap();
        assert!(value["embeds"][0].get("footer").is_none());
        assert!(value["embeds"][0]["author"].get("url").is_none());
        assert_eq!(value["embeds"][0]["color"], 14177041);
    }
}
