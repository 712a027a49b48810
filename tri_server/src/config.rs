//! Server configuration management.
//!
//! Consolidates all environment variable reads and provides validated configuration.

use std::{net::SocketAddr, time::Duration};
use tri_poker::{
    GameSettings, Money,
    constants::{DEFAULT_ENTRY_FEE, DEFAULT_STARTING_BALANCE, MAX_PARTICIPANTS, MIN_PARTICIPANTS},
};

/// Bind address used when neither `--bind` nor `SERVER_BIND` is given.
pub const DEFAULT_BIND: &str = "127.0.0.1:6969";

/// Complete server configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Server bind address
    pub bind: SocketAddr,
    /// Game rules and timing
    pub game: GameSettings,
    /// Start as soon as the minimum is seated instead of asking the operator
    pub auto_start: bool,
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// # Arguments
    ///
    /// * `bind_override` - Optional bind address override (from CLI args)
    /// * `auto_start_override` - Force auto start (from CLI args)
    ///
    /// # Errors
    ///
    /// Returns error if a variable is set but can't be parsed
    pub fn from_env(
        bind_override: Option<SocketAddr>,
        auto_start_override: bool,
    ) -> Result<Self, ConfigError> {
        Self::from_lookup(
            |key| std::env::var(key).ok(),
            bind_override,
            auto_start_override,
        )
    }

    /// Load configuration from any key-value source.
    ///
    /// # Errors
    ///
    /// Returns error if a variable is set but can't be parsed
    pub fn from_lookup<F>(
        lookup: F,
        bind_override: Option<SocketAddr>,
        auto_start_override: bool,
    ) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let bind = match bind_override {
            Some(bind) => bind,
            None => {
                let raw = lookup("SERVER_BIND").unwrap_or_else(|| DEFAULT_BIND.to_string());
                raw.parse().map_err(|_| ConfigError::Invalid {
                    var: "SERVER_BIND".to_string(),
                    reason: format!("{raw:?} is not an IP:PORT address"),
                })?
            }
        };

        let entry_fee = money_or(&lookup, "ENTRY_FEE", Money::from_units(DEFAULT_ENTRY_FEE))?;
        let starting_balance = money_or(
            &lookup,
            "STARTING_BALANCE",
            Money::from_units(DEFAULT_STARTING_BALANCE),
        )?;

        // Zero disables the timeout.
        let decision_timeout = match parse_or(&lookup, "DECISION_TIMEOUT_SECS", 0u64) {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };

        let game = GameSettings::new(
            entry_fee,
            starting_balance,
            parse_or(&lookup, "MIN_PLAYERS", MIN_PARTICIPANTS),
            parse_or(&lookup, "MAX_PLAYERS", MAX_PARTICIPANTS),
        )
        .with_decision_timeout(decision_timeout)
        .with_intro_pause(Duration::from_millis(parse_or(
            &lookup,
            "INTRO_PAUSE_MS",
            1000,
        )));

        Ok(ServerConfig {
            bind,
            game,
            auto_start: auto_start_override || parse_or(&lookup, "AUTO_START", false),
        })
    }

    /// Validate configuration after loading
    ///
    /// # Errors
    ///
    /// Returns the first rule the game settings break
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.game.validate().map_err(|e| ConfigError::Invalid {
            var: "game settings".to_string(),
            reason: e.to_string(),
        })
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration for {var}: {reason}")]
    Invalid { var: String, reason: String },
}

/// Helper to parse a variable with default fallback
fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    lookup(key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

/// Helper to read an amount written as `D` or `D.CC`
fn money_or<F>(lookup: &F, key: &str, default: Money) -> Result<Money, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => parse_money(&raw).ok_or_else(|| ConfigError::Invalid {
            var: key.to_string(),
            reason: format!("{raw:?} is not an amount like 2 or 2.50"),
        }),
    }
}

fn parse_money(raw: &str) -> Option<Money> {
    let raw = raw.trim();
    let (whole, frac) = raw.split_once('.').unwrap_or((raw, ""));
    if whole.is_empty() || frac.len() > 2 {
        return None;
    }
    let whole: u64 = whole.parse().ok()?;
    let cents: u64 = match frac.len() {
        0 => 0,
        1 => frac.parse::<u64>().ok()? * 10,
        _ => frac.parse().ok()?,
    };
    whole
        .checked_mul(100)
        .and_then(|c| c.checked_add(cents))
        .map(Money::from_cents)
}
