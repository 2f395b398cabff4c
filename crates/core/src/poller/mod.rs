//! Session discovery.
//!
//! The poller lists sessions in one region on a fixed interval, picks the
//! first eligible one, and hands it to the orchestrator exactly once:
//! - Tier 1: sessions that have not started
//! - Tier 2: started sessions with no players
//!
//! Claimed session ids go into a processed set so they can never trigger
//! again until the set is cleared.

mod config;
mod runner;
mod select;
mod throttle;

pub use config::PollerConfig;
pub use runner::{PollerStatus, SessionCallback, SessionPoller};
pub use select::{select_eligible, EligibilityTier};
pub use throttle::LogThrottle;
