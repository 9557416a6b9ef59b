use crate::model::ServerStatus;
use crate::normalize::{build_offline, normalize_with_policy, EmptyReplyPolicy};
use crate::server::{codec, QueryError, ServerConnection, UpstreamTarget};
use crate::status_cache::StatusCache;
use log::*;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;


#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    Idle,
    Querying,
    Success,
    Failed,
}

#[derive(Debug, Clone)]
pub struct PollSettings {
    pub target: UpstreamTarget,
    pub query_timeout: Duration,
    pub refresh_interval: Duration,
    pub default_server_name: String,
    pub empty_reply_policy: EmptyReplyPolicy,
}

/// Queries the game server once per interval and publishes every outcome,
/// good or bad, into the cache.
pub struct StatusPoller<C> {
    connection: C,
    settings: PollSettings,
    cache: StatusCache,
    state: PollState,
}

impl<C: ServerConnection + 'static> StatusPoller<C> {
    pub fn new(connection: C, settings: PollSettings, cache: StatusCache) -> Self {
        Self {
            connection,
            settings,
            cache,
            state: PollState::Idle,
        }
    }

    #[cfg(test)]
    pub fn state(&self) -> PollState {
        self.state
    }

    pub fn start_in_background(self, shutdown: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }

    pub async fn run(mut self, shutdown: CancellationToken) {
        info!(
            "polling {} every {:?}",
            self.settings.target, self.settings.refresh_interval
        );
        let mut interval = time::interval(self.settings.refresh_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut last_finished: Option<Instant> = None;
        loop {
            let scheduled = tokio::select! {
                _ = shutdown.cancelled() => break,
                scheduled = interval.tick() => scheduled,
            };
            // at most one query in flight: ticks that came due during the last one are dropped
            if last_finished.is_some_and(|finished| scheduled < finished) {
                debug!("skipping tick that came due while the previous query was running");
                continue;
            }
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = self.tick() => {}
            }
            last_finished = Some(Instant::now());
        }
        info!("stopped polling {}", self.settings.target);
    }

    /// One refresh cycle. Returns the state it finished in.
    pub async fn tick(&mut self) -> PollState {
        self.transition(PollState::Querying);
        let status = match self.query_once().await {
            Ok(status) => {
                debug!(
                    "{} is online: {:?}",
                    self.settings.target,
                    status.game_info()
                );
                self.transition(PollState::Success);
                status
            }
            Err(e) => {
                warn!("could not query {}: {}", self.settings.target, e);
                self.transition(PollState::Failed);
                build_offline(&e, &self.settings.default_server_name)
            }
        };
        if status.is_online() != self.cache.get().is_online() {
            info!(
                "{} is now {}",
                self.settings.target,
                if status.is_online() { "online" } else { "offline" }
            );
        }
        self.cache.publish(status);
        let finished = self.state;
        self.transition(PollState::Idle);
        finished
    }

    async fn query_once(&self) -> Result<ServerStatus, QueryError> {
        let timeout = self.settings.query_timeout;
        // connect, write and read are each bounded; this bounds the whole exchange
        let raw = time::timeout(
            timeout,
            self.connection.query(&self.settings.target, timeout),
        )
        .await
        .map_err(|_| QueryError::Timeout(timeout))??;

        let reply = codec::decode(&raw);
        debug!(
            "{} answered with {} bytes, {} status fields",
            self.settings.target,
            raw.len(),
            reply.len()
        );
        normalize_with_policy(
            &reply,
            &self.settings.default_server_name,
            self.settings.empty_reply_policy,
        )
    }

    fn transition(&mut self, next: PollState) {
        trace!("poll state {:?} -> {:?}", self.state, next);
        self.state = next;
    }
}
