//! Session error types.

use thiserror::Error;

use super::{registry::ParticipantId, state::Phase};
use crate::game::{SettingsError, entities::Money};

/// Errors from shared game state operations
#[derive(Debug, Eq, Error, PartialEq)]
pub enum GameError {
    /// A debit would take the balance below zero
    #[error("Insufficient balance: available {balance}, required {required}")]
    InsufficientBalance { balance: Money, required: Money },

    /// Participant isn't (or is no longer) in the registry
    #[error("Participant {0} not found")]
    UnknownParticipant(ParticipantId),

    /// Participant ids must be unique
    #[error("Participant {0} already registered")]
    DuplicateParticipant(ParticipantId),

    /// The lobby is full
    #[error("game is full ({max} participants)")]
    CapacityReached { max: usize },

    /// Joins are only accepted in the lobby
    #[error("game already in progress")]
    GameAlreadyStarted,

    /// Not enough participants to start
    #[error("need {required}+ participants, have {joined}")]
    NotEnoughParticipants { joined: usize, required: usize },

    /// Folding needs at least 3 active participants
    #[error("can't fold with only {active} participants left")]
    FoldNotAllowed { active: usize },

    /// A decision arrived for a round that isn't open anymore
    #[error("round {round} is closed")]
    RoundClosed { round: u64 },

    /// A decision arrived for a different round than the open one
    #[error("round {got} isn't the open round {open}")]
    StaleRound { open: u64, got: u64 },

    /// The participant already decided this round or isn't part of it
    #[error("participant {id} has no pending decision in round {round}")]
    DecisionNotExpected { id: ParticipantId, round: u64 },

    /// Phases only move forward
    #[error("can't move from {from} back to {to}")]
    InvalidPhaseTransition { from: Phase, to: Phase },

    /// Settings failed validation
    #[error("invalid settings: {0}")]
    InvalidSettings(#[from] SettingsError),
}

/// Result type for session operations
pub type GameResult<T> = Result<T, GameError>;
