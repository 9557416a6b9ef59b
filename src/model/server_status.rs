use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};

pub const CHECKING_MESSAGE: &str = "Checking status...";

/// One observation of the upstream game server.
///
/// The online/offline split lives in `state`, so an offline record can never
/// carry game fields and an online one can never carry a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerStatus {
    pub name: String,
    pub observed_at: DateTime<Utc>,
    pub state: ServerState,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerState {
    Online(GameInfo),
    Offline {
        message: String,
        // transport error text, when there is one
        error: Option<String>,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GameInfo {
    pub map: Option<String>,
    pub players: Option<u32>,
    pub max_players: Option<u32>,
    pub game_type: Option<String>,
}

impl ServerStatus {
    pub fn online(name: String, game_info: GameInfo) -> Self {
        ServerStatus {
            name,
            observed_at: Utc::now(),
            state: ServerState::Online(game_info),
        }
    }

    pub fn offline(name: &str, message: &str) -> Self {
        Self::offline_with_error(name, message, None)
    }

    pub fn offline_with_error(name: &str, message: &str, error: Option<String>) -> Self {
        ServerStatus {
            name: name.to_owned(),
            observed_at: Utc::now(),
            state: ServerState::Offline {
                message: message.to_owned(),
                error,
            },
        }
    }

    /// What readers see before the first tick has completed.
    pub fn placeholder(name: &str) -> Self {
        Self::offline(name, CHECKING_MESSAGE)
    }

    pub fn is_online(&self) -> bool {
        matches!(self.state, ServerState::Online(_))
    }

    pub fn game_info(&self) -> Option<&GameInfo> {
        match &self.state {
            ServerState::Online(game_info) => Some(game_info),
            ServerState::Offline { .. } => None,
        }
    }

    pub fn message(&self) -> Option<&str> {
        match &self.state {
            ServerState::Online(_) => None,
            ServerState::Offline { message, .. } => Some(message),
        }
    }

    pub fn error(&self) -> Option<&str> {
        match &self.state {
            ServerState::Online(_) => None,
            ServerState::Offline { error, .. } => error.as_deref(),
        }
    }
}

// The web front end expects a flat record with optional fields omitted.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ServerStatusJson<'a> {
    online: bool,
    name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    map: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    players: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_players: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    game_type: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'a str>,
    observed_at: DateTime<Utc>,
}

impl Serialize for ServerStatus {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let game_info = self.game_info();
        ServerStatusJson {
            online: self.is_online(),
            name: &self.name,
            map: game_info.and_then(|g| g.map.as_deref()),
            players: game_info.and_then(|g| g.players),
            max_players: game_info.and_then(|g| g.max_players),
            game_type: game_info.and_then(|g| g.game_type.as_deref()),
            message: self.message(),
            error: self.error(),
            observed_at: self.observed_at,
        }
        .serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn online_json_omits_message_and_absent_fields() {
        let status = ServerStatus::online(
            "Nova Arena".to_owned(),
            GameInfo {
                map: Some("dust".to_owned()),
                players: Some(5),
                max_players: Some(16),
                game_type: None,
            },
        );
        let mut value = serde_json::to_value(&status).unwrap();
        assert!(value.get("observedAt").is_some());
        value.as_object_mut().unwrap().remove("observedAt");

        assert_eq!(
            value,
            json!({
                "online": true,
                "name": "Nova Arena",
                "map": "dust",
                "players": 5,
                "maxPlayers": 16,
            })
        );
    }

    #[test]
    fn offline_json_has_only_name_and_message() {
        let status = ServerStatus::offline("NovaX | Clan", "Server is offline");
        let mut value = serde_json::to_value(&status).unwrap();
        value.as_object_mut().unwrap().remove("observedAt");

        assert_eq!(
            value,
            json!({
                "online": false,
                "name": "NovaX | Clan",
                "message": "Server is offline",
            })
        );
    }

    #[test]
    fn offline_json_carries_error_detail_when_present() {
        let status = ServerStatus::offline_with_error(
            "NovaX | Clan",
            "Unable to connect to server",
            Some("no reply within 5s".to_owned()),
        );
        let mut value = serde_json::to_value(&status).unwrap();
        value.as_object_mut().unwrap().remove("observedAt");

        assert_eq!(
            value,
            json!({
                "online": false,
                "name": "NovaX | Clan",
                "message": "Unable to connect to server",
                "error": "no reply within 5s",
            })
        );
    }

    #[test]
    fn placeholder_is_offline_and_checking() {
        let status = ServerStatus::placeholder("NovaX | Clan");
        assert!(!status.is_online());
        assert!(status.game_info().is_none());
        assert_eq!(status.message(), Some(CHECKING_MESSAGE));
        assert_eq!(status.error(), None);
    }
}
