use crate::model::InviteStats;
use crate::status_cache::StatusCache;
use anyhow::Context;
use log::*;
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

const INVITE_API: &str = "https://discord.com/api/v10/invites";

#[derive(Deserialize, Debug)]
struct RawInvite {
    #[serde(default)]
    approximate_member_count: u64,
    #[serde(default)]
    approximate_presence_count: u64,
}

fn parse_invite(body: &str) -> anyhow::Result<InviteStats> {
    let raw = serde_json::from_str::<RawInvite>(body).context("invite response was not json")?;
    Ok(InviteStats::new(
        raw.approximate_member_count,
        raw.approximate_presence_count,
    ))
}

pub async fn fetch_invite_stats(
    client: &reqwest::Client,
    invite_code: &str,
    timeout: Duration,
) -> anyhow::Result<InviteStats> {
    let url = format!("{}/{}?with_counts=true", INVITE_API, invite_code);
    let response = time::timeout(timeout, client.get(&url).send())
        .await
        .context("timed out getting invite counts")?
        .context("failed to get invite counts")?;
    if response.status() != StatusCode::OK {
        return Err(anyhow::anyhow!(
            "invite lookup responded with {}",
            response.status()
        ));
    }
    let body = time::timeout(timeout, response.text())
        .await
        .context("timed out reading invite counts")?
        .context("failed to read invite counts")?;
    parse_invite(&body)
}

/// Refreshes the invite counts on a fixed interval. A failed fetch keeps the
/// previous counts.
pub fn start_in_background(
    invite_code: String,
    refresh_interval: Duration,
    timeout: Duration,
    cache: StatusCache<InviteStats>,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let client = reqwest::Client::new();
        let mut interval = time::interval(refresh_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = interval.tick() => {}
            }
            let result = tokio::select! {
                _ = shutdown.cancelled() => break,
                result = fetch_invite_stats(&client, &invite_code, timeout) => result,
            };
            match result {
                Ok(stats) => {
                    debug!("invite {}: {} members, {} online", invite_code, stats.total, stats.online);
                    cache.publish(stats);
                }
                Err(e) => warn!("could not refresh invite {}: {:#}", invite_code, e),
            }
        }
        info!("stopped refreshing invite {}", invite_code);
    })
}
