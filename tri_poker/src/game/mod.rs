//! Card game rules - entities, hand evaluation, and table settings.
//!
//! This module is free of any concurrency concerns. Everything here is plain
//! data and pure functions used by the session and host layers.

pub mod constants;
pub mod entities;
pub mod eval;

use std::time::Duration;
use thiserror::Error;

use constants::{
    DECK_SIZE, DEFAULT_ENTRY_FEE, DEFAULT_STARTING_BALANCE, HAND_SIZE, MAX_PARTICIPANTS,
    MIN_PARTICIPANTS,
};
use entities::Money;

/// Errors produced by invalid [`GameSettings`].
#[derive(Debug, Eq, Error, PartialEq)]
pub enum SettingsError {
    #[error("entry fee must be greater than zero")]
    ZeroEntryFee,
    #[error("starting balance {balance} doesn't cover the entry fee {fee}")]
    StakeBelowFee { balance: Money, fee: Money },
    #[error("need at least 2 participants to play, got a minimum of {0}")]
    MinimumTooLow(usize),
    #[error("maximum participants {max} is below the minimum {min}")]
    MaximumBelowMinimum { min: usize, max: usize },
    #[error("a 52-card deck can't deal {0} hands")]
    DeckTooSmall(usize),
}

/// Game configuration settings
#[derive(Clone, Debug, PartialEq)]
pub struct GameSettings {
    /// Fee charged on joining and for every round a participant continues.
    pub entry_fee: Money,
    /// Balance each participant starts with, before the joining fee.
    pub starting_balance: Money,
    /// Participants needed before the operator may start the game.
    pub min_participants: usize,
    /// Participant count that force-starts the game.
    pub max_participants: usize,
    /// How long a participant may take to decide. `None` waits forever.
    pub decision_timeout: Option<Duration>,
    /// Pause between the intro notices before the first deal.
    pub intro_pause: Duration,
}

impl Default for GameSettings {
    fn default() -> Self {
        Self::new(
            Money::from_units(DEFAULT_ENTRY_FEE),
            Money::from_units(DEFAULT_STARTING_BALANCE),
            MIN_PARTICIPANTS,
            MAX_PARTICIPANTS,
        )
    }
}

impl GameSettings {
    #[must_use]
    pub const fn new(
        entry_fee: Money,
        starting_balance: Money,
        min_participants: usize,
        max_participants: usize,
    ) -> Self {
        Self {
            entry_fee,
            starting_balance,
            min_participants,
            max_participants,
            decision_timeout: None,
            intro_pause: Duration::from_secs(1),
        }
    }

    #[must_use]
    pub fn with_decision_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.decision_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_intro_pause(mut self, pause: Duration) -> Self {
        self.intro_pause = pause;
        self
    }

    /// Balance a participant holds right after paying the joining fee.
    #[must_use]
    pub fn balance_after_joining(&self) -> Money {
        self.starting_balance
            .checked_sub(self.entry_fee)
            .unwrap_or(Money::ZERO)
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.entry_fee.is_zero() {
            return Err(SettingsError::ZeroEntryFee);
        }
        if self.starting_balance < self.entry_fee {
            return Err(SettingsError::StakeBelowFee {
                balance: self.starting_balance,
                fee: self.entry_fee,
            });
        }
        if self.min_participants < 2 {
            return Err(SettingsError::MinimumTooLow(self.min_participants));
        }
        if self.max_participants < self.min_participants {
            return Err(SettingsError::MaximumBelowMinimum {
                min: self.min_participants,
                max: self.max_participants,
            });
        }
        if self.max_participants * HAND_SIZE > DECK_SIZE {
            return Err(SettingsError::DeckTooSmall(self.max_participants));
        }
        Ok(())
    }
}
