use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Match, Message};

/// Events pushed to clients over the WebSocket gateway.
///
/// All pushes are best-effort: an offline recipient simply misses the event
/// and picks up durable state (messages, matches) on the next fetch.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum GatewayEvent {
    /// Server confirms the connection is authenticated and live.
    Ready {
        #[serde(rename = "userId")]
        user_id: Uuid,
    },

    /// A matched counterpart came online or went offline.
    Presence {
        #[serde(rename = "userId")]
        user_id: Uuid,
        #[serde(rename = "isOnline")]
        is_online: bool,
    },

    /// The counterpart is (or stopped) typing in a match.
    Typing {
        #[serde(rename = "matchId")]
        match_id: Uuid,
        #[serde(rename = "userId")]
        user_id: Uuid,
        #[serde(rename = "isTyping")]
        is_typing: bool,
    },

    /// A new chat message addressed to this client.
    Message {
        #[serde(flatten)]
        message: Message,
    },

    /// The counterpart read this client's messages in a match.
    Read {
        #[serde(rename = "matchId")]
        match_id: Uuid,
        #[serde(rename = "readerId")]
        reader_id: Uuid,
    },

    /// A mutual like produced a new match.
    Match {
        #[serde(flatten)]
        r#match: Match,
    },

    /// The counterpart undid their like; the match is gone.
    Unmatch {
        #[serde(rename = "matchId")]
        match_id: Uuid,
    },
}

/// Commands sent from client to server over the WebSocket.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum GatewayCommand {
    /// Signal typing state in a match. Relayed, never persisted.
    Typing {
        #[serde(rename = "matchId")]
        match_id: Uuid,
        #[serde(rename = "isTyping")]
        is_typing: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typing_event_wire_shape() {
        let event = GatewayEvent::Typing {
            match_id: Uuid::nil(),
            user_id: Uuid::nil(),
            is_typing: true,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "typing");
        assert_eq!(json["isTyping"], true);
        assert!(json.get("matchId").is_some());
    }

    #[test]
    fn presence_event_wire_shape() {
        let event = GatewayEvent::Presence {
            user_id: Uuid::nil(),
            is_online: false,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "presence");
        assert_eq!(json["isOnline"], false);
    }

    #[test]
    fn typing_command_parses() {
        let raw = r#"{"type":"typing","matchId":"00000000-0000-0000-0000-000000000001","isTyping":false}"#;
        let cmd: GatewayCommand = serde_json::from_str(raw).unwrap();
        let GatewayCommand::Typing { is_typing, .. } = cmd;
        assert!(!is_typing);
    }
}
