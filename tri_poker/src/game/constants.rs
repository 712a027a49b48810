//! Default game constants.

/// Fee paid on joining and again for every round a participant continues.
pub const DEFAULT_ENTRY_FEE: u64 = 2;

/// Balance each participant brings to the table, before the joining fee.
pub const DEFAULT_STARTING_BALANCE: u64 = 12;

/// Minimum number of participants before the operator may start the game.
pub const MIN_PARTICIPANTS: usize = 3;

/// The lobby force-starts the game once this many participants joined.
/// 17 hands of 3 cards is the most a 52-card deck can deal.
pub const MAX_PARTICIPANTS: usize = 17;

/// Every hand has exactly this many cards.
pub const HAND_SIZE: usize = 3;

/// Usernames are cut to this many characters.
pub const MAX_USERNAME_LENGTH: usize = 32;

/// Number of cards in a fresh deck.
pub const DECK_SIZE: usize = 52;
