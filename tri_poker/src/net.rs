//! Networking layer for host-participant communication.
//!
//! Participants speak a line-oriented text protocol over TCP. The host core
//! never touches sockets: it works with the in-memory channels in
//! [`connection`], and [`server`] bridges those to TCP.

/// Async TCP client for connecting to a host.
pub mod client;

/// In-memory participant channels.
pub mod connection;

/// Transport error types.
pub mod errors;

/// Message types for host-participant communication.
pub mod messages;

/// TCP accept loop and line framing.
pub mod server;
