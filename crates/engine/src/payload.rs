//! Push payload resolver: turns an inbound push message into a displayable
//! notification.
//!
//! The message may be empty, JSON, or arbitrary text. JSON objects are
//! shallow-merged over the defaults and other JSON values contribute nothing.
//! Text that is not JSON at all becomes the notification body.

use serde_json::{Map, Value};

use cubstars_common::types::{NotificationAction, NotificationDescriptor};

pub const DEFAULT_TITLE: &str = "🌟 Cub Stars";
pub const DEFAULT_BODY: &str = "New activity from your kids!";
pub const DEFAULT_ICON: &str = r#"data:image/svg+xml,<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 100 100"><text y=".9em" font-size="90">⭐</text></svg>"#;
pub const DEFAULT_BADGE: &str = r#"data:image/svg+xml,<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 100 100"><text y=".9em" font-size="90">🔔</text></svg>"#;
pub const DEFAULT_TAG: &str = "cubstars-notification";
pub const DEFAULT_TARGET_URL: &str = "./";

/// Push payload resolver.
pub struct PushPayloadResolver;

impl PushPayloadResolver {
    /// The descriptor used when a push carries no data.
    pub fn default_descriptor() -> NotificationDescriptor {
        NotificationDescriptor {
            title: DEFAULT_TITLE.to_string(),
            body: DEFAULT_BODY.to_string(),
            icon: DEFAULT_ICON.to_string(),
            badge: DEFAULT_BADGE.to_string(),
            tag: DEFAULT_TAG.to_string(),
            require_interaction: true,
            actions: vec![
                NotificationAction::new("open", "📱 Open App"),
                NotificationAction::new("dismiss", "✖ Dismiss"),
            ],
            target_url: DEFAULT_TARGET_URL.to_string(),
        }
    }

    /// Resolve raw push bytes into a fully-populated descriptor.
    ///
    /// Never fails: input that does not parse as JSON degrades to a plain-text
    /// body.
    pub fn resolve(raw: Option<&[u8]>) -> NotificationDescriptor {
        let mut descriptor = Self::default_descriptor();

        let Some(raw) = raw else {
            return descriptor;
        };
        let text = String::from_utf8_lossy(raw);
        if text.trim().is_empty() {
            return descriptor;
        }

        match serde_json::from_str::<Value>(&text) {
            Ok(Value::Object(fields)) => Self::overlay(&mut descriptor, &fields),
            Ok(_) => {
                tracing::debug!("Push payload is JSON but not an object, using defaults");
            }
            Err(_) => {
                tracing::debug!("Push payload is not JSON, using it as the body");
                descriptor.body = text.into_owned();
            }
        }

        descriptor
    }

    /// Shallow merge: every usable field in the payload replaces the default.
    ///
    /// Empty strings, nulls, empty action lists and wrongly-typed values count
    /// as absent so the descriptor stays fully populated.
    fn overlay(descriptor: &mut NotificationDescriptor, fields: &Map<String, Value>) {
        let text = |name: &str| {
            fields
                .get(name)
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };

        if let Some(title) = text("title") {
            descriptor.title = title;
        }
        if let Some(body) = text("body") {
            descriptor.body = body;
        }
        if let Some(icon) = text("icon") {
            descriptor.icon = icon;
        }
        if let Some(badge) = text("badge") {
            descriptor.badge = badge;
        }
        if let Some(tag) = text("tag") {
            descriptor.tag = tag;
        }
        if let Some(url) = text("url").or_else(|| text("targetUrl")) {
            descriptor.target_url = url;
        }
        if let Some(require) = fields.get("requireInteraction").and_then(Value::as_bool) {
            descriptor.require_interaction = require;
        }
        if let Some(actions) = fields.get("actions") {
            match serde_json::from_value::<Vec<NotificationAction>>(actions.clone()) {
                Ok(actions) if !actions.is_empty() => descriptor.actions = actions,
                Ok(_) => {}
                Err(e) => {
                    tracing::debug!(error = %e, "Ignoring malformed actions in push payload");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_fully_populated(d: &NotificationDescriptor) {
        assert!(!d.title.is_empty());
        assert!(!d.body.is_empty());
        assert!(!d.icon.is_empty());
        assert!(!d.badge.is_empty());
        assert!(!d.tag.is_empty());
        assert!(!d.actions.is_empty());
        assert!(!d.target_url.is_empty());
    }

    #[test]
    fn test_absent_payload_is_default() {
        assert_eq!(
            PushPayloadResolver::resolve(None),
            PushPayloadResolver::default_descriptor()
        );
        assert_eq!(
            PushPayloadResolver::resolve(Some(b"")),
            PushPayloadResolver::default_descriptor()
        );
    }

    #[test]
    fn test_default_descriptor_contents() {
        let d = PushPayloadResolver::default_descriptor();
        assert_eq!(d.title, "🌟 Cub Stars");
        assert_eq!(d.tag, "cubstars-notification");
        assert!(d.require_interaction);
        let actions: Vec<&str> = d.actions.iter().map(|a| a.action.as_str()).collect();
        assert_eq!(actions, vec!["open", "dismiss"]);
    }

    #[test]
    fn test_json_fields_override_defaults() {
        let raw = br#"{"title": "Chore done", "body": "Ava finished Dishes", "url": "./parent_app.html#ava", "requireInteraction": false}"#;
        let d = PushPayloadResolver::resolve(Some(raw));

        assert_eq!(d.title, "Chore done");
        assert_eq!(d.body, "Ava finished Dishes");
        assert_eq!(d.target_url, "./parent_app.html#ava");
        assert!(!d.require_interaction);
        // Untouched fields keep their defaults
        assert_eq!(d.tag, DEFAULT_TAG);
        assert_eq!(d.icon, DEFAULT_ICON);
        assert_eq!(d.actions.len(), 2);
    }

    #[test]
    fn test_custom_actions_replace_defaults() {
        let raw = br#"{"actions": [{"action": "open", "title": "Review"}]}"#;
        let d = PushPayloadResolver::resolve(Some(raw));
        assert_eq!(d.actions, vec![NotificationAction::new("open", "Review")]);
    }

    #[test]
    fn test_malformed_json_becomes_body() {
        let raw = b"{\"title\": \"oops\"";
        let d = PushPayloadResolver::resolve(Some(raw));

        let mut expected = PushPayloadResolver::default_descriptor();
        expected.body = "{\"title\": \"oops\"".to_string();
        assert_eq!(d, expected);
    }

    #[test]
    fn test_plain_text_becomes_body() {
        let d = PushPayloadResolver::resolve(Some(b"Ben earned 3 stars"));
        assert_eq!(d.body, "Ben earned 3 stars");
        assert_eq!(d.title, DEFAULT_TITLE);
    }

    #[test]
    fn test_non_object_json_keeps_defaults() {
        let payloads: [&[u8]; 6] = [b"null", b"42", b"\"hi\"", b"[1]", b"true", b"[]"];
        for raw in payloads {
            assert_eq!(
                PushPayloadResolver::resolve(Some(raw)),
                PushPayloadResolver::default_descriptor()
            );
        }
    }

    #[test]
    fn test_empty_and_mistyped_fields_keep_defaults() {
        let raw = br#"{"title": "", "body": null, "tag": 7, "actions": [], "icon": {"x": 1}}"#;
        let d = PushPayloadResolver::resolve(Some(raw));
        assert_eq!(d, PushPayloadResolver::default_descriptor());
    }

    #[test]
    fn test_every_payload_yields_populated_descriptor() {
        let payloads: [&[u8]; 9] = [
            b"",
            b"   ",
            b"text",
            b"{}",
            b"[]",
            b"null",
            br#"{"title": "", "badge": ""}"#,
            br#"{"actions": "nope"}"#,
            &[0xff, 0xfe, 0x41],
        ];
        for raw in payloads {
            assert_fully_populated(&PushPayloadResolver::resolve(Some(raw)));
        }
    }
}
