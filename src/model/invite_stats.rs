use chrono::{DateTime, Utc};
use serde::Serialize;

/// Member counts for the community invite. `loaded` stays false until the
/// first successful fetch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InviteStats {
    pub total: u64,
    pub online: u64,
    pub loaded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observed_at: Option<DateTime<Utc>>,
}

impl InviteStats {
    pub fn new(total: u64, online: u64) -> Self {
        InviteStats {
            total,
            online,
            loaded: true,
            observed_at: Some(Utc::now()),
        }
    }
}
