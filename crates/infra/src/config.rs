//! Engine configuration.
//!
//! Defaults are usable as-is; `from_env` overrides them from `FLOWPLAN_*`
//! variables and rejects malformed values instead of silently ignoring them.

use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, bail};

use flowplan_core::OrganizationId;
use flowplan_ddmrp::AduConfig;

#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub adu: AduConfig,
    pub history: HistoryConfig,
    pub scheduler: SchedulerConfig,
    pub publisher: PublisherConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryConfig {
    /// Rows returned by buffer history listings when the caller gives no limit.
    pub default_limit: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self { default_limit: 90 }
    }
}

/// Daily recalculation sweep.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerConfig {
    pub enabled: bool,
    pub interval: Duration,
    pub organizations: Vec<OrganizationId>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval: Duration::from_secs(24 * 60 * 60),
            organizations: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublisherConfig {
    /// Value stamped into every envelope's `source`.
    pub source: String,
    pub redis_url: Option<String>,
    pub channel: String,
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            source: "ddmrp-engine".into(),
            redis_url: None,
            channel: "flowplan.events".into(),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            adu: AduConfig::default(),
            history: HistoryConfig::default(),
            scheduler: SchedulerConfig::default(),
            publisher: PublisherConfig::default(),
        }
    }
}

impl EngineConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup (environment, test map, ...).
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();

        if let Some(alpha) = parse_var::<f64, _>(&lookup, "FLOWPLAN_ADU_DEFAULT_ALPHA")? {
            cfg.adu.default_alpha = alpha;
        }
        if let Some(days) = parse_var::<u32, _>(&lookup, "FLOWPLAN_ADU_PERIOD_DAYS")? {
            cfg.adu.default_period_days = days;
        }
        if let Some(limit) = parse_var::<usize, _>(&lookup, "FLOWPLAN_ADU_HISTORY_LIMIT")? {
            cfg.adu.history_limit = limit;
        }
        if let Some(limit) = parse_var::<usize, _>(&lookup, "FLOWPLAN_HISTORY_LIMIT")? {
            cfg.history.default_limit = limit;
        }
        if let Some(secs) = parse_var::<u64, _>(&lookup, "FLOWPLAN_RECALC_INTERVAL_SECS")? {
            if secs == 0 {
                bail!("FLOWPLAN_RECALC_INTERVAL_SECS must be greater than 0");
            }
            cfg.scheduler.interval = Duration::from_secs(secs);
        }
        if let Some(enabled) = lookup("FLOWPLAN_RECALC_ENABLED") {
            cfg.scheduler.enabled = parse_bool(&enabled)
                .with_context(|| format!("invalid FLOWPLAN_RECALC_ENABLED: {enabled:?}"))?;
        }
        if let Some(orgs) = lookup("FLOWPLAN_RECALC_ORGANIZATIONS") {
            cfg.scheduler.organizations = orgs
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| {
                    OrganizationId::from_str(s)
                        .with_context(|| format!("invalid organization id in FLOWPLAN_RECALC_ORGANIZATIONS: {s}"))
                })
                .collect::<anyhow::Result<_>>()?;
        }
        if let Some(source) = lookup("FLOWPLAN_EVENT_SOURCE") {
            cfg.publisher.source = source;
        }
        if let Some(url) = lookup("REDIS_URL") {
            cfg.publisher.redis_url = Some(url);
        }
        if let Some(channel) = lookup("FLOWPLAN_EVENT_CHANNEL") {
            cfg.publisher.channel = channel;
        }

        cfg.adu
            .validate()
            .context("invalid ADU configuration")?;
        Ok(cfg)
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> anyhow::Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .with_context(|| format!("invalid {key}: {raw:?}")),
    }
}

fn parse_bool(raw: &str) -> anyhow::Result<bool> {
    match raw.trim() {
        "1" | "true" | "TRUE" | "yes" | "YES" => Ok(true),
        "0" | "false" | "FALSE" | "no" | "NO" => Ok(false),
        other => bail!("expected a boolean, got {other:?}"),
    }
}
