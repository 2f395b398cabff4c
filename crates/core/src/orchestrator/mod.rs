//! Match orchestrator.
//!
//! Turns a session claimed by the poller into a resolved match:
//! - **Attempts**: Sequential (one at a time), fed by the poller callback
//! - **Failures**: Compensated (client killed, matchmaking closed) and polling resumed after a cooldown
//! - **Shutdown**: Same compensation path, polling stays stopped

mod config;
mod context;
mod runner;
mod types;

pub use config::OrchestratorConfig;
pub use context::MatchContext;
pub use runner::MatchOrchestrator;
pub use types::{AttemptSummary, FailureCategory, OrchestratorError, OrchestratorStatus};
