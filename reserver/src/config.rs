//! Command line and environment configuration.
//!
//! The product and selection come from the command line. The bearer token
//! comes from the environment (a `.env` file is loaded first by the binary),
//! and the pacing knobs fall back to defaults when unset or unparseable.

use crate::environment::RetryTiming;
use crate::gate::TimeGate;
use crate::types::{AgentState, QuantityPolicy, SelectionPolicy};
use clap::Parser;
use salegate_kide::{DEFAULT_API_URL, DEFAULT_USER_AGENT};
use std::env;
use std::time::Duration;
use thiserror::Error;

/// Reserve tickets the moment a sale opens
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(name = "salegate", version, about)]
pub struct Cli {
    /// Product id to book
    #[arg(short = 'i', long = "id")]
    pub product_id: String,

    /// Prefer the first variant whose name or description contains this
    /// text (repeatable)
    #[arg(short = 'f', long = "filter")]
    pub filters: Vec<String>,

    /// Reserve the most units the variant allows instead of one
    #[arg(short = 'm', long = "max", visible_alias = "maksimit")]
    pub max: bool,

    /// Do not log the countdown while waiting for the sale
    #[arg(short = 'n', long = "no-wait-log")]
    pub no_wait_log: bool,
}

/// Configuration errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// No bearer token in the environment
    #[error("TOKEN is not set; add it to the environment or a .env file")]
    MissingToken,

    /// The product id is blank
    #[error("product id must not be empty")]
    EmptyProductId,
}

/// Resolved run configuration
#[derive(Clone, PartialEq, Eq)]
pub struct Config {
    /// Product id to book
    pub product_id: String,
    /// Non-blank filter terms, in command line order
    pub filters: Vec<String>,
    /// Units to request
    pub quantity_policy: QuantityPolicy,
    /// Log the countdown while waiting
    pub report_countdown: bool,
    /// Bearer token for the kide API
    pub token: String,
    /// API root (`KIDE_API_URL`)
    pub api_url: String,
    /// `User-Agent` header (`KIDE_USER_AGENT`)
    pub user_agent: String,
    /// Longest sleep between gate checks (`GATE_POLL_INTERVAL_MS`)
    pub gate_poll_interval: Duration,
    /// Pause before re-reading variants (`FETCH_RETRY_DELAY_MS`)
    pub fetch_retry_delay: Duration,
    /// Pause before retrying metadata (`METADATA_RETRY_DELAY_MS`)
    pub metadata_retry_delay: Duration,
    /// Per-request HTTP timeout (`HTTP_TIMEOUT_SECS`)
    pub http_timeout: Duration,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("product_id", &self.product_id)
            .field("filters", &self.filters)
            .field("quantity_policy", &self.quantity_policy)
            .field("report_countdown", &self.report_countdown)
            .field("token", &"<redacted>")
            .field("api_url", &self.api_url)
            .field("gate_poll_interval", &self.gate_poll_interval)
            .field("fetch_retry_delay", &self.fetch_retry_delay)
            .field("metadata_retry_delay", &self.metadata_retry_delay)
            .field("http_timeout", &self.http_timeout)
            .finish_non_exhaustive()
    }
}

impl Config {
    /// Combine parsed arguments with the process environment
    ///
    /// # Errors
    ///
    /// - [`ConfigError::MissingToken`] if `TOKEN` is unset or blank
    /// - [`ConfigError::EmptyProductId`] if the product id is blank
    pub fn from_cli(cli: Cli) -> Result<Self, ConfigError> {
        Self::from_lookup(cli, |key| env::var(key).ok())
    }

    /// Combine parsed arguments with variables resolved by `lookup`
    ///
    /// # Errors
    ///
    /// Same as [`Config::from_cli`].
    pub fn from_lookup<F>(cli: Cli, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let product_id = cli.product_id.trim().to_string();
        if product_id.is_empty() {
            return Err(ConfigError::EmptyProductId);
        }

        let token = lookup("TOKEN")
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .ok_or(ConfigError::MissingToken)?;

        let millis = |key: &str, default: u64| {
            Duration::from_millis(lookup(key).and_then(|s| s.parse().ok()).unwrap_or(default))
        };

        Ok(Self {
            product_id,
            filters: cli
                .filters
                .into_iter()
                .filter(|f| !f.trim().is_empty())
                .collect(),
            quantity_policy: QuantityPolicy::from_flag(cli.max),
            report_countdown: !cli.no_wait_log,
            token,
            api_url: lookup("KIDE_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            user_agent: lookup("KIDE_USER_AGENT").unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()),
            gate_poll_interval: millis("GATE_POLL_INTERVAL_MS", 1_000),
            fetch_retry_delay: millis("FETCH_RETRY_DELAY_MS", 100),
            metadata_retry_delay: millis("METADATA_RETRY_DELAY_MS", 1_000),
            http_timeout: Duration::from_secs(
                lookup("HTTP_TIMEOUT_SECS")
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(10),
            ),
        })
    }

    /// Initial cursor and policies for the engine
    #[must_use]
    pub fn agent_state(&self) -> AgentState {
        AgentState::new(
            SelectionPolicy::from_terms(self.filters.clone()),
            self.quantity_policy,
        )
    }

    /// Time gate with the configured pacing
    #[must_use]
    pub const fn time_gate(&self) -> TimeGate {
        TimeGate::new(self.gate_poll_interval, self.report_countdown)
    }

    /// Retry pacing for the fetch loops
    #[must_use]
    pub const fn retry_timing(&self) -> RetryTiming {
        RetryTiming {
            fetch_retry_delay: self.fetch_retry_delay,
            metadata_retry_delay: self.metadata_retry_delay,
        }
    }
}
