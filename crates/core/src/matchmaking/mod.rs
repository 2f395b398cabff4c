//! Matchmaking protocol client.
//!
//! One attempt walks these phases:
//!
//! ```text
//! Idle -> TicketRequested -> SocketConnecting -> Connecting -> Waiting -> Queued
//!      -> SessionAssignment | Play -> Resolved -> Closed
//! ```
//!
//! `Closed` is reachable from any phase through [`MatchmakingClient::close`]
//! or an unrecoverable error. Resolution and the backend hand-off happen at
//! most once per attempt.

mod client;
mod config;
mod error;
mod frame;
mod messages;
mod transport;
mod types;

pub use client::{generate_client_id, MatchmakingClient};
pub use config::MatchmakingConfig;
pub use error::MatchmakingError;
pub use frame::{split_frame, FrameAnomaly, SplitFrame};
pub use messages::{InboundMessage, StatusUpdate};
pub use transport::{FrameStream, SocketConnector, WsConnector};
pub use types::{MatchOutcome, MatchPhase, MatchState};
