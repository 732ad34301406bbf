//! TOML configuration loading and validation.
//!
//! Two files: `config.toml` describes how to reach the brokerage and the
//! strategy engine and how the sync loop behaves; `plan.toml` names the
//! portfolio/account pair being synchronized and its trade schedule.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::error::{Error, Result};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub broker: BrokerConfig,
    #[serde(default)]
    pub strategy: StrategyConfig,
    #[serde(default)]
    pub execution: ExecutionConfig,
    #[serde(default)]
    pub identity: IdentityConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BrokerConfig {
    /// Trade against the TradeStation simulator.
    #[serde(default = "default_true")]
    pub simulation: bool,
    /// Overrides the simulator/live base URL.
    #[serde(default)]
    pub base_url: Option<String>,
    /// Environment variable holding the bearer token.
    #[serde(default = "default_token_env")]
    pub token_env: String,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_quote_batch")]
    pub quote_batch: usize,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            simulation: true,
            base_url: None,
            token_env: default_token_env(),
            timeout_secs: default_timeout(),
            quote_batch: default_quote_batch(),
        }
    }
}

fn default_true() -> bool {
    true
}
fn default_token_env() -> String {
    "TRADESTATION_ACCESS_TOKEN".into()
}
fn default_timeout() -> u64 {
    30
}
fn default_quote_batch() -> usize {
    100
}

#[derive(Debug, Clone, Deserialize)]
pub struct StrategyConfig {
    #[serde(default = "default_strategy_url")]
    pub url: String,
    /// Environment variable holding the PV-API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            url: default_strategy_url(),
            api_key_env: default_api_key_env(),
            timeout_secs: default_timeout(),
        }
    }
}

fn default_strategy_url() -> String {
    "https://api.pennyvault.com".into()
}
fn default_api_key_env() -> String {
    "PV_API_KEY".into()
}

/// What to do with a transaction whose kind is neither BUY nor SELL.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnknownKindPolicy {
    /// Log a warning and drop the transaction.
    #[default]
    Skip,
    /// Abort planning.
    Fail,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExecutionConfig {
    #[serde(default = "default_initial_wait")]
    pub initial_wait_secs: u64,
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
    #[serde(default = "default_monitor_timeout")]
    pub monitor_timeout_secs: u64,
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,
    #[serde(default)]
    pub max_elapsed_secs: Option<u64>,
    #[serde(default)]
    pub unknown_kind: UnknownKindPolicy,
    /// End the sync instead of re-planning while submitted orders are still
    /// open at the monitoring timeout. Re-planning may then double up on a
    /// day order that fills later.
    #[serde(default)]
    pub stop_on_open_orders: bool,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            initial_wait_secs: default_initial_wait(),
            poll_interval_secs: default_poll_interval(),
            monitor_timeout_secs: default_monitor_timeout(),
            max_iterations: default_max_iterations(),
            max_elapsed_secs: None,
            unknown_kind: UnknownKindPolicy::Skip,
            stop_on_open_orders: false,
        }
    }
}

fn default_initial_wait() -> u64 {
    30
}
fn default_poll_interval() -> u64 {
    300
}
fn default_monitor_timeout() -> u64 {
    1800
}
fn default_max_iterations() -> u32 {
    3
}

/// Share classes traded under one broker symbol but priced separately by
/// the strategy engine.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DualClassPair {
    /// The class actually traded, e.g. `BRK.B`.
    pub low: String,
    /// The class the strategy may name instead, e.g. `BRK.A`.
    pub high: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IdentityConfig {
    #[serde(default = "default_dual_class")]
    pub dual_class: Vec<DualClassPair>,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            dual_class: default_dual_class(),
        }
    }
}

fn default_dual_class() -> Vec<DualClassPair> {
    vec![DualClassPair {
        low: "BRK.B".into(),
        high: "BRK.A".into(),
    }]
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_dir")]
    pub dir: String,
    #[serde(default = "default_audit_file")]
    pub audit_file: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            dir: default_log_dir(),
            audit_file: default_audit_file(),
        }
    }
}

fn default_log_dir() -> String {
    "./logs".into()
}
fn default_audit_file() -> String {
    "audit.jsonl".into()
}

impl Config {
    /// Load config from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| Error::ConfigRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate config invariants.
    pub fn validate(&self) -> Result<()> {
        if self.broker.timeout_secs == 0 || self.strategy.timeout_secs == 0 {
            return Err(Error::Config("timeout_secs must be > 0".into()));
        }
        if self.broker.quote_batch == 0 {
            return Err(Error::Config("quote_batch must be > 0".into()));
        }
        if self.broker.token_env.is_empty() || self.strategy.api_key_env.is_empty() {
            return Err(Error::Config(
                "secret environment variable names must not be empty".into(),
            ));
        }
        if self.strategy.url.is_empty() {
            return Err(Error::Config("strategy url must not be empty".into()));
        }
        if self.execution.max_iterations == 0 {
            return Err(Error::Config("max_iterations must be >= 1".into()));
        }
        if self.execution.poll_interval_secs == 0 {
            return Err(Error::Config("poll_interval_secs must be > 0".into()));
        }
        for pair in &self.identity.dual_class {
            if pair.low.is_empty() || pair.high.is_empty() || pair.low == pair.high {
                return Err(Error::Config(format!(
                    "invalid dual-class pair {} / {}",
                    pair.low, pair.high
                )));
            }
        }
        Ok(())
    }

    /// Full path to the audit log file.
    pub fn audit_path(&self) -> PathBuf {
        Path::new(&self.logging.dir).join(&self.logging.audit_file)
    }

    /// Brokerage bearer token from the environment.
    pub fn broker_token(&self) -> Result<Zeroizing<String>> {
        read_secret(&self.broker.token_env)
    }

    /// Strategy engine API key from the environment.
    pub fn strategy_api_key(&self) -> Result<Zeroizing<String>> {
        read_secret(&self.strategy.api_key_env)
    }
}

fn read_secret(var: &str) -> Result<Zeroizing<String>> {
    match std::env::var(var) {
        Ok(value) if !value.is_empty() => Ok(Zeroizing::new(value)),
        _ => Err(Error::MissingSecret(var.to_string())),
    }
}

/// One portfolio/account pairing and its trade schedule (`plan.toml`).
///
/// Dates are ISO strings (`"2024-02-01"`).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SyncPlan {
    pub portfolio_id: String,
    pub account_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_trade_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_trade_date: Option<NaiveDate>,
}

impl SyncPlan {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| Error::ConfigRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        let plan: SyncPlan = toml::from_str(&contents)?;
        if plan.portfolio_id.is_empty() {
            return Err(Error::Config("portfolio_id must not be empty".into()));
        }
        if plan.account_id.is_empty() {
            return Err(Error::Config("account_id must not be empty".into()));
        }
        Ok(plan)
    }

    /// Write the plan to `path`. The comment block at the top of an existing
    /// file is kept; comments between keys are not.
    pub fn save(&self, path: &Path) -> Result<()> {
        let body = toml::to_string(self).map_err(|e| Error::PlanWrite {
            path: path.to_path_buf(),
            detail: e.to_string(),
        })?;
        let header = std::fs::read_to_string(path)
            .map(|existing| leading_comments(&existing))
            .unwrap_or_default();
        std::fs::write(path, header + &body).map_err(|e| Error::PlanWrite {
            path: path.to_path_buf(),
            detail: e.to_string(),
        })
    }

    /// A plan that has traded before is not due until its next trade date.
    pub fn is_due(&self, today: NaiveDate) -> bool {
        match (self.last_trade_date, self.next_trade_date) {
            (Some(_), Some(next)) => today >= next,
            _ => true,
        }
    }

    /// Record a completed sync.
    pub fn record_trade(&mut self, today: NaiveDate, next: Option<NaiveDate>) {
        self.last_trade_date = Some(today);
        if next.is_some() {
            self.next_trade_date = next;
        }
    }
}

/// Comment and blank lines before the first key, newline-terminated.
fn leading_comments(toml: &str) -> String {
    toml.lines()
        .take_while(|l| {
            let l = l.trim_start();
            l.is_empty() || l.starts_with('#')
        })
        .map(|l| format!("{l}\n"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn example_toml() -> &'static str {
        r#"
[broker]
simulation = true
token_env = "TS_TOKEN"
timeout_secs = 20

[strategy]
url = "https://api.pennyvault.com"
api_key_env = "PV_KEY"

[execution]
initial_wait_secs = 10
poll_interval_secs = 60
monitor_timeout_secs = 600
max_iterations = 2
unknown_kind = "fail"

[[identity.dual_class]]
low = "BRK.B"
high = "BRK.A"

[logging]
dir = "./logs"
audit_file = "audit.jsonl"
"#
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn parse_example_config() {
        let config: Config = toml::from_str(example_toml()).unwrap();
        assert_eq!(config.broker.token_env, "TS_TOKEN");
        assert_eq!(config.broker.timeout_secs, 20);
        assert_eq!(config.broker.quote_batch, 100);
        assert_eq!(config.execution.max_iterations, 2);
        assert_eq!(config.execution.unknown_kind, UnknownKindPolicy::Fail);
        assert_eq!(config.identity.dual_class.len(), 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn empty_config_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert!(config.broker.simulation);
        assert_eq!(config.strategy.url, "https://api.pennyvault.com");
        assert_eq!(config.execution.initial_wait_secs, 30);
        assert_eq!(config.execution.poll_interval_secs, 300);
        assert_eq!(config.execution.monitor_timeout_secs, 1800);
        assert_eq!(config.execution.max_iterations, 3);
        assert_eq!(config.execution.max_elapsed_secs, None);
        assert_eq!(config.execution.unknown_kind, UnknownKindPolicy::Skip);
        assert_eq!(config.identity.dual_class[0].low, "BRK.B");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_catches_zero_iterations() {
        let mut config: Config = toml::from_str(example_toml()).unwrap();
        config.execution.max_iterations = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_catches_degenerate_pair() {
        let mut config: Config = toml::from_str(example_toml()).unwrap();
        config.identity.dual_class.push(DualClassPair {
            low: "X".into(),
            high: "X".into(),
        });
        assert!(config.validate().is_err());
    }

    #[test]
    fn audit_path() {
        let config: Config = toml::from_str(example_toml()).unwrap();
        assert_eq!(config.audit_path(), PathBuf::from("./logs/audit.jsonl"));
    }

    #[test]
    fn missing_secret() {
        let mut config = Config::default();
        config.broker.token_env = "TRADELINK_TEST_SURELY_UNSET_VAR".into();
        assert!(matches!(
            config.broker_token(),
            Err(Error::MissingSecret(_))
        ));
    }

    #[test]
    fn plan_schedule() {
        let mut plan: SyncPlan = toml::from_str(
            r#"
portfolio_id = "p-123"
account_id = "SIM123"
"#,
        )
        .unwrap();
        assert!(plan.is_due(date("2024-01-02")), "never traded is always due");

        plan.record_trade(date("2024-01-02"), Some(date("2024-02-01")));
        assert!(!plan.is_due(date("2024-01-31")));
        assert!(plan.is_due(date("2024-02-01")));
    }

    #[test]
    fn next_date_without_last_is_due() {
        let plan = SyncPlan {
            portfolio_id: "p".into(),
            account_id: "a".into(),
            last_trade_date: None,
            next_trade_date: Some(date("2999-01-01")),
        };
        assert!(plan.is_due(date("2024-01-01")));
    }

    #[test]
    fn plan_save_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plan.toml");
        let mut plan = SyncPlan {
            portfolio_id: "p-123".into(),
            account_id: "SIM123".into(),
            last_trade_date: None,
            next_trade_date: None,
        };
        plan.record_trade(date("2024-01-02"), Some(date("2024-02-01")));
        plan.save(&path).unwrap();
        assert_eq!(SyncPlan::load(&path).unwrap(), plan);
    }

    #[test]
    fn plan_save_keeps_header_comments() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plan.toml");
        std::fs::write(
            &path,
            "# Growth portfolio\n# account: SIM123\n\nportfolio_id = \"p-123\"\naccount_id = \"SIM123\"\n",
        )
        .unwrap();

        let mut plan = SyncPlan::load(&path).unwrap();
        plan.record_trade(date("2024-01-02"), Some(date("2024-02-01")));
        plan.save(&path).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.starts_with("# Growth portfolio\n# account: SIM123\n\n"));
        assert!(written.contains("next_trade_date = \"2024-02-01\""));
        assert_eq!(SyncPlan::load(&path).unwrap(), plan);
    }

    #[test]
    fn plan_requires_ids() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plan.toml");
        std::fs::write(&path, "portfolio_id = \"\"\naccount_id = \"SIM123\"\n").unwrap();
        assert!(SyncPlan::load(&path).is_err());
    }
}
