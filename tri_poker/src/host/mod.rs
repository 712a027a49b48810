//! Game flow on top of a [`Session`](crate::session::Session).
//!
//! The [`Host`] owns the lobby and the round loop; every seated participant
//! gets a [`SessionHandler`] task that reads their decisions.

pub mod handler;
pub mod orchestrator;

pub use handler::{HandlerExit, HandlerState, SessionHandler};
pub use orchestrator::{GameSummary, Host, LobbyEvent, Resolution, fold_left_winner, resolve};
