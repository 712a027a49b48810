//! # Tri Poker
//!
//! A host for a multiplayer three-card game played over plain TCP lines.
//!
//! Participants connect, send a username, and pay an entry fee into the pot.
//! Once the game starts everyone is dealt three cards and, each round, decides
//! to pay the fee again and continue or to fold. The game ends when one
//! participant is left, when two are left and their hands are compared, or
//! when nobody can afford another round.
//!
//! ## Core Modules
//!
//! - [`game`]: Cards, hand evaluation, and settings. No concurrency.
//! - [`session`]: Shared registry, pot, and the round barrier.
//! - [`host`]: Lobby, round loop, and per-participant handlers.
//! - [`net`]: Message protocol and the TCP line transport.
//!
//! ## Example
//!
//! ```
//! use tri_poker::game::{
//!     entities::{Card, Hand, Suit},
//!     eval::{Category, Showdown, classify, compare},
//! };
//!
//! let straight = Hand::new([Card(1, Suit::Club), Card(2, Suit::Heart), Card(3, Suit::Spade)]);
//! let pair = Hand::new([Card(7, Suit::Club), Card(7, Suit::Heart), Card(2, Suit::Spade)]);
//! assert_eq!(classify(&straight), Category::Straight);
//! assert_eq!(compare(&straight, &pair), Showdown::A);
//! ```

/// Card game rules, free of concurrency concerns.
pub mod game;
pub use game::{
    GameSettings, SettingsError,
    constants,
    entities::{self, Card, Deck, Hand, Money, Suit, Username},
    eval,
};

/// Shared state for one game instance.
pub mod session;
pub use session::{
    Session,
    errors::{GameError, GameResult},
    registry::ParticipantId,
};

/// Game flow.
pub mod host;
pub use host::{GameSummary, Host, LobbyEvent, Resolution};

/// Networking components for the line protocol.
pub mod net;
pub use net::{client::Client, messages, server};
