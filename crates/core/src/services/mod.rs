//! Clients for the remote account, game, and backend services.
//!
//! The engine only talks to these through the traits in [`traits`], so tests
//! can substitute the mocks in [`crate::testing`].

mod backend;
mod config;
mod error;
mod http;
mod traits;
mod types;

pub use backend::HttpBackend;
pub use config::{BackendConfig, CredentialsConfig, ServicesConfig};
pub use error::ServiceError;
pub use http::HttpGameServices;
pub use traits::{AccountApi, Backend, MatchmakingApi, SessionSource};
pub use types::{
    ClientToken, ExchangeCredential, GameSession, Handoff, MatchmakingTicket, ServerInfo,
    SessionDescriptor, TicketRequest,
};
