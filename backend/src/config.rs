//! Server configuration
//!
//! Values come from the process environment, optionally seeded from a `.env`
//! file. Every key has a default so the server starts with no configuration.
//!
//! | Variable | Default |
//! |---|---|
//! | `BIND_ADDR` | `0.0.0.0:3000` |
//! | `DATABASE_URL` | `sqlite:xfdraughts.db` |
//! | `CLOCK_SECS` | `600` |
//! | `AUTO_FORCED_CAPTURE` | `false` |
//! | `AUTO_CHAIN_CAPTURE` | `true` |
//! | `KINGS_ONLY_DRAW` | `true` |
//! | `FINISHED_TTL_SECS` | `300` |
//! | `BROADCAST_CAPACITY` | `64` |

use anyhow::{bail, Context};
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

/// Rule switches applied to every session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RulePolicy {
    /// Play a capture automatically when it is the only legal move of the turn
    pub auto_forced_capture: bool,
    /// Play a chain continuation automatically when it is the only option
    pub auto_chain_capture: bool,
    /// Declare a draw once only kings remain and nobody can capture
    pub kings_only_draw: bool,
}

impl Default for RulePolicy {
    fn default() -> Self {
        Self {
            auto_forced_capture: false,
            auto_chain_capture: true,
            kings_only_draw: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub database_url: String,
    /// Per-side clock budget
    pub clock: Duration,
    pub policy: RulePolicy,
    /// How long a finished session stays resolvable
    pub finished_ttl: Duration,
    pub broadcast_capacity: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
            database_url: "sqlite:xfdraughts.db".to_string(),
            clock: Duration::from_secs(600),
            policy: RulePolicy::default(),
            finished_ttl: Duration::from_secs(300),
            broadcast_capacity: 64,
        }
    }
}

impl ServerConfig {
    /// Load `.env` (if present) and read the environment
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let defaults = Self::default();
        let policy = RulePolicy {
            auto_forced_capture: flag(&lookup, "AUTO_FORCED_CAPTURE", defaults.policy.auto_forced_capture)?,
            auto_chain_capture: flag(&lookup, "AUTO_CHAIN_CAPTURE", defaults.policy.auto_chain_capture)?,
            kings_only_draw: flag(&lookup, "KINGS_ONLY_DRAW", defaults.policy.kings_only_draw)?,
        };

        let broadcast_capacity = parsed(&lookup, "BROADCAST_CAPACITY", defaults.broadcast_capacity)?;
        if broadcast_capacity == 0 {
            bail!("BROADCAST_CAPACITY must be positive");
        }

        Ok(Self {
            bind_addr: parsed(&lookup, "BIND_ADDR", defaults.bind_addr)?,
            database_url: lookup("DATABASE_URL").unwrap_or(defaults.database_url),
            clock: Duration::from_secs(parsed(&lookup, "CLOCK_SECS", defaults.clock.as_secs())?),
            policy,
            finished_ttl: Duration::from_secs(parsed(
                &lookup,
                "FINISHED_TTL_SECS",
                defaults.finished_ttl.as_secs(),
            )?),
            broadcast_capacity,
        })
    }
}

fn parsed<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("invalid value for {key}: {raw:?}")),
        None => Ok(default),
    }
}

fn flag(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: bool) -> anyhow::Result<bool> {
    let Some(raw) = lookup(key) else {
        return Ok(default);
    };
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => bail!("invalid value for {key}: {other:?}"),
    }
}
