//! Page → worker control messages.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A message posted to the registration.
///
/// Wire form: `{"type": "SKIP_WAITING"}`, `{"type": "PURGE_OPAQUE", "keep": 10}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ControlMessage {
    /// Promote the waiting worker now.
    SkipWaiting,
    GetVersion,
    /// Cap opaque entries in the active generation. Uses the configured
    /// limit when `keep` is absent.
    PurgeOpaque {
        #[serde(default)]
        keep: Option<usize>,
    },
    /// Every controlled page has closed.
    ClientsClosed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageReply {
    Activated { generation: String },
    NothingWaiting,
    /// Pages are still open; the waiting worker stays waiting.
    StillWaiting { generation: String, clients: usize },
    Version { active: Option<String>, waiting: Option<String> },
    Purged { deleted: u64 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_wire_format() {
        let msg: ControlMessage = serde_json::from_str(r#"{"type":"SKIP_WAITING"}"#).unwrap();
        assert_eq!(msg, ControlMessage::SkipWaiting);

        let msg: ControlMessage = serde_json::from_str(r#"{"type":"PURGE_OPAQUE"}"#).unwrap();
        assert_eq!(msg, ControlMessage::PurgeOpaque { keep: None });

        let msg: ControlMessage = serde_json::from_str(r#"{"type":"PURGE_OPAQUE","keep":5}"#).unwrap();
        assert_eq!(msg, ControlMessage::PurgeOpaque { keep: Some(5) });
    }

    #[test]
    fn test_unknown_message_rejected() {
        assert!(serde_json::from_str::<ControlMessage>(r#"{"type":"SYNC_NOW"}"#).is_err());
    }

    #[test]
    fn test_reply_serialization() {
        let reply = MessageReply::Version { active: Some("artisan-connect-cache-v9".into()), waiting: None };
        let json = serde_json::to_value(&reply).unwrap();
        assert_eq!(json["type"], "VERSION");
        assert_eq!(json["active"], "artisan-connect-cache-v9");
    }
}
