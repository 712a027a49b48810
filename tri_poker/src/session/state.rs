use std::fmt;

use super::{
    errors::{GameError, GameResult},
    registry::Participant,
};
use crate::game::entities::Money;

/// Game lifecycle phases. They only ever move forward.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum Phase {
    Lobby,
    Dealing,
    RoundInProgress,
    Resolved,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let repr = match self {
            Self::Lobby => "lobby",
            Self::Dealing => "dealing",
            Self::RoundInProgress => "round in progress",
            Self::Resolved => "resolved",
        };
        write!(f, "{repr}")
    }
}

/// Shared pot and phase for a game.
#[derive(Debug)]
pub struct GameState {
    pot: Money,
    entry_fee: Money,
    phase: Phase,
    bankruptcy: bool,
}

impl GameState {
    pub fn new(entry_fee: Money) -> Self {
        Self {
            pot: Money::ZERO,
            entry_fee,
            phase: Phase::Lobby,
            bankruptcy: false,
        }
    }

    pub fn pot(&self) -> Money {
        self.pot
    }

    pub fn entry_fee(&self) -> Money {
        self.entry_fee
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn collect_fee(&mut self, amount: Money) {
        self.pot += amount;
    }

    /// Debit a participant. The balance is left untouched when it can't
    /// cover `amount`.
    pub fn try_debit(&self, participant: &mut Participant, amount: Money) -> GameResult<()> {
        match participant.balance.checked_sub(amount) {
            Some(balance) => {
                participant.balance = balance;
                Ok(())
            }
            None => Err(GameError::InsufficientBalance {
                balance: participant.balance,
                required: amount,
            }),
        }
    }

    /// Empty the pot, returning what it held.
    pub fn award_pot(&mut self) -> Money {
        std::mem::take(&mut self.pot)
    }

    pub fn advance(&mut self, to: Phase) -> GameResult<()> {
        if to < self.phase {
            return Err(GameError::InvalidPhaseTransition {
                from: self.phase,
                to,
            });
        }
        self.phase = to;
        Ok(())
    }

    pub fn flag_bankruptcy(&mut self) {
        self.bankruptcy = true;
    }

    pub fn is_bankrupt(&self) -> bool {
        self.bankruptcy
    }
}

/// Split a pot between two tied winners. The first share takes the odd cent
/// so the shares always add back up to the pot.
pub fn split_pot(pot: Money) -> (Money, Money) {
    pot.halves()
}
