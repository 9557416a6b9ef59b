use crate::normalize::EmptyReplyPolicy;
use crate::server::UpstreamTarget;
use anyhow::{anyhow, bail, Context};
use log::LevelFilter;
use std::{env, net::IpAddr, str::FromStr, time::Duration};

#[derive(Debug, Clone)]
pub struct Config {
    pub upstream: UpstreamTarget,
    pub query_timeout: Duration,
    pub refresh_interval: Duration,
    pub default_server_name: String,
    pub empty_reply_policy: EmptyReplyPolicy,

    // Community invite counts; no code means the poller is off
    pub invite_code: Option<String>,
    pub invite_refresh_interval: Duration,

    pub bind_address: String,
    pub port: u16,
    pub log_level: LevelFilter,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            upstream: UpstreamTarget {
                host: "5.39.63.207".to_owned(),
                port: 7919,
            },
            query_timeout: Duration::from_millis(5_000),
            refresh_interval: Duration::from_millis(30_000),
            default_server_name: "NovaX | Clan".to_owned(),
            empty_reply_policy: EmptyReplyPolicy::Online,
            invite_code: None,
            invite_refresh_interval: Duration::from_millis(300_000),
            bind_address: "0.0.0.0".to_owned(),
            port: 8080,
            log_level: LevelFilter::Info,
        }
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds a config from `lookup`, falling back to defaults for missing
    /// keys. Values that are present but unparsable are an error.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let host = var("UPSTREAM_HOST").unwrap_or(defaults.upstream.host);
        let host = connectable_host(host.trim())?;

        let config = Config {
            upstream: UpstreamTarget {
                host,
                port: parse_or(&var, "UPSTREAM_PORT", defaults.upstream.port)?,
            },
            query_timeout: millis_or(&var, "QUERY_TIMEOUT_MS", defaults.query_timeout)?,
            refresh_interval: millis_or(&var, "REFRESH_INTERVAL_MS", defaults.refresh_interval)?,
            default_server_name: var("DEFAULT_SERVER_NAME")
                .unwrap_or(defaults.default_server_name),
            empty_reply_policy: parse_or(&var, "EMPTY_REPLY_POLICY", defaults.empty_reply_policy)?,
            invite_code: var("INVITE_CODE").map(|code| code.trim().to_owned()),
            invite_refresh_interval: millis_or(
                &var,
                "INVITE_REFRESH_INTERVAL_MS",
                defaults.invite_refresh_interval,
            )?,
            bind_address: var("BIND_ADDRESS").unwrap_or(defaults.bind_address),
            port: parse_or(&var, "PORT", defaults.port)?,
            log_level: parse_or(&var, "LOG_LEVEL", defaults.log_level)?,
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.upstream.port == 0 {
            bail!("UPSTREAM_PORT must not be 0");
        }
        if self.query_timeout.is_zero() || self.refresh_interval.is_zero() {
            bail!("QUERY_TIMEOUT_MS and REFRESH_INTERVAL_MS must be positive");
        }
        // otherwise a slow query could still be running when the next tick fires
        if self.query_timeout >= self.refresh_interval {
            bail!(
                "QUERY_TIMEOUT_MS ({:?}) must be shorter than REFRESH_INTERVAL_MS ({:?})",
                self.query_timeout,
                self.refresh_interval
            );
        }
        if self.invite_code.is_some() && self.invite_refresh_interval <= self.query_timeout {
            bail!("INVITE_REFRESH_INTERVAL_MS must be longer than QUERY_TIMEOUT_MS");
        }
        Ok(())
    }

    pub fn bind(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }
}

/// Validates `host` and returns it in the form `TcpStream::connect` resolves:
/// IPv6 literals lose their brackets.
fn connectable_host(host: &str) -> anyhow::Result<String> {
    if let Ok(ip) = IpAddr::from_str(host) {
        return Ok(ip.to_string());
    }
    let parsed = url::Host::parse(host)
        .with_context(|| format!("UPSTREAM_HOST '{}' is not a valid host", host))?;
    Ok(match parsed {
        url::Host::Domain(domain) => domain,
        url::Host::Ipv4(addr) => addr.to_string(),
        url::Host::Ipv6(addr) => addr.to_string(),
    })
}

fn parse_or<T, F>(var: F, key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match var(key) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|e| anyhow!("{} '{}' is invalid: {}", key, value, e)),
    }
}

fn millis_or<F>(var: F, key: &str, default: Duration) -> anyhow::Result<Duration>
where
    F: Fn(&str) -> Option<String>,
{
    let millis = parse_or(var, key, default.as_millis() as u64)?;
    Ok(Duration::from_millis(millis))
}
