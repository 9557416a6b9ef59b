use crate::model::{GameInfo, ServerStatus};
use crate::server::{codec::RawQueryReply, QueryError};
use std::str::FromStr;

// Different server builds report the same thing under different keys.
const NAME_KEYS: &[&str] = &["hostname", "sv_hostname"];
const MAP_KEYS: &[&str] = &["mapname"];
const PLAYERS_KEYS: &[&str] = &["clients"];
const MAX_PLAYERS_KEYS: &[&str] = &["sv_maxclients"];
const GAME_TYPE_KEYS: &[&str] = &["gametype", "g_gametype"];

/// What to make of a server that accepted the query but answered with no
/// status fields at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EmptyReplyPolicy {
    /// It answered, so it is up: report it online with default fields.
    #[default]
    Online,
    /// Treat it as a malformed reply and report the server offline.
    Offline,
}

impl FromStr for EmptyReplyPolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "online" => Ok(EmptyReplyPolicy::Online),
            "offline" => Ok(EmptyReplyPolicy::Offline),
            _ => Err(anyhow::anyhow!(
                "unknown empty reply policy '{}', expected 'online' or 'offline'",
                s
            )),
        }
    }
}

/// Projects a decoded reply into an online status.
pub fn normalize(reply: &RawQueryReply, default_name: &str) -> ServerStatus {
    let name = reply
        .first_of(NAME_KEYS)
        .unwrap_or(default_name)
        .to_owned();
    let game_info = GameInfo {
        map: reply.first_of(MAP_KEYS).map(str::to_owned),
        players: count_field(reply, PLAYERS_KEYS),
        max_players: count_field(reply, MAX_PLAYERS_KEYS),
        game_type: reply.first_of(GAME_TYPE_KEYS).map(str::to_owned),
    };
    ServerStatus::online(name, game_info)
}

/// Missing counts default to 0; present but non-numeric ones are absent.
fn count_field(reply: &RawQueryReply, keys: &[&str]) -> Option<u32> {
    match reply.first_of(keys) {
        None => Some(0),
        Some(value) => u32::from_str(value.trim()).ok(),
    }
}

/// Like `normalize`, but applies `policy` when the reply carried no fields.
pub fn normalize_with_policy(
    reply: &RawQueryReply,
    default_name: &str,
    policy: EmptyReplyPolicy,
) -> Result<ServerStatus, QueryError> {
    if reply.is_empty() && policy == EmptyReplyPolicy::Offline {
        return Err(QueryError::MalformedReply);
    }
    Ok(normalize(reply, default_name))
}

pub fn build_offline(error: &QueryError, default_name: &str) -> ServerStatus {
    ServerStatus::offline_with_error(default_name, error.offline_message(), error.detail())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::codec::decode;

    const DEFAULT_NAME: &str = "NovaX | Clan";

    #[test]
    fn should_map_every_field_of_a_full_reply() {
        let reply = decode(b"\\hostname\\Nova Arena\\mapname\\dust\\clients\\5\\sv_maxclients\\16\\gametype\\ffa\n");
        let status = normalize(&reply, DEFAULT_NAME);

        assert!(status.is_online());
        assert_eq!(status.name, "Nova Arena");
        assert_eq!(
            status.game_info(),
            Some(&GameInfo {
                map: Some("dust".to_owned()),
                players: Some(5),
                max_players: Some(16),
                game_type: Some("ffa".to_owned()),
            })
        );
        assert_eq!(status.message(), None);
    }

    #[test]
    fn should_accept_synonym_keys() {
        let reply = decode(b"\\sv_hostname\\Alt Name\\g_gametype\\tdm\\protocol\\1\\mapname\\mp_brecourt");
        let status = normalize(&reply, DEFAULT_NAME);
        let game_info = status.game_info().unwrap();

        assert_eq!(status.name, "Alt Name");
        assert_eq!(game_info.game_type.as_deref(), Some("tdm"));
        assert_eq!(game_info.map.as_deref(), Some("mp_brecourt"));
    }

    #[test]
    fn should_ignore_unmapped_keys() {
        let reply = decode(b"\\version\\1.1\\protocol\\1\\shortversion\\1.1");
        let status = normalize(&reply, DEFAULT_NAME);

        assert_eq!(status.name, DEFAULT_NAME);
        assert_eq!(
            status.game_info(),
            Some(&GameInfo {
                map: None,
                players: Some(0),
                max_players: Some(0),
                game_type: None,
            })
        );
    }

    #[test]
    fn should_drop_non_numeric_counts() {
        let reply = decode(b"\\clients\\lots\\sv_maxclients\\-3");
        let game_info = normalize(&reply, DEFAULT_NAME).game_info().cloned().unwrap();

        assert_eq!(game_info.players, None);
        assert_eq!(game_info.max_players, None);
    }

    #[test]
    fn empty_reply_is_online_with_defaults_by_default() {
        let reply = decode(b"OK\n");
        let status =
            normalize_with_policy(&reply, DEFAULT_NAME, EmptyReplyPolicy::default()).unwrap();

        assert!(status.is_online());
        assert_eq!(status.name, DEFAULT_NAME);
        let game_info = status.game_info().unwrap();
        assert_eq!(game_info.players, Some(0));
        assert_eq!(game_info.max_players, Some(0));
        assert_eq!(game_info.map, None);
        assert_eq!(game_info.game_type, None);
    }

    #[test]
    fn empty_reply_is_malformed_under_offline_policy() {
        let reply = decode(b"OK\n");
        let result = normalize_with_policy(&reply, DEFAULT_NAME, EmptyReplyPolicy::Offline);
        assert!(matches!(result, Err(QueryError::MalformedReply)));
    }

    #[test]
    fn offline_status_has_message_and_no_game_fields() {
        let status = build_offline(&QueryError::EmptyReply, DEFAULT_NAME);

        assert!(!status.is_online());
        assert_eq!(status.name, DEFAULT_NAME);
        assert!(status.game_info().is_none());
        assert_eq!(status.message(), Some("Server is offline"));
        assert_eq!(status.error(), None);
    }

    #[test]
    fn connect_failures_keep_error_detail() {
        let refused = QueryError::ConnectFailure(std::io::Error::from(
            std::io::ErrorKind::ConnectionRefused,
        ));
        let status = build_offline(&refused, DEFAULT_NAME);
        assert_eq!(status.message(), Some("Unable to connect to server"));
        assert!(status.error().unwrap().starts_with("could not connect: "));

        let json = serde_json::to_value(build_offline(&QueryError::MalformedReply, DEFAULT_NAME))
            .unwrap();
        assert!(json.get("error").is_none());
    }

    #[test]
    fn policy_parses_case_insensitively() {
        assert_eq!("Offline".parse::<EmptyReplyPolicy>().unwrap(), EmptyReplyPolicy::Offline);
        assert_eq!("online".parse::<EmptyReplyPolicy>().unwrap(), EmptyReplyPolicy::Online);
        assert!("maybe".parse::<EmptyReplyPolicy>().is_err());
    }
}
