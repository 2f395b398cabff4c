//! Components shared by one orchestrator run.

use std::sync::Arc;

use crate::game_files::GameFiles;
use crate::matchmaking::MatchmakingClient;
use crate::poller::SessionPoller;
use crate::services::AccountApi;
use crate::supervisor::GameProcess;
use crate::token::TokenStore;

/// The single instance of each component, built once at startup and passed
/// to the orchestrator.
#[derive(Clone)]
pub struct MatchContext {
    pub tokens: Arc<TokenStore>,
    pub poller: Arc<SessionPoller>,
    pub accounts: Arc<dyn AccountApi>,
    pub process: Arc<dyn GameProcess>,
    pub matchmaking: Arc<MatchmakingClient>,
    pub game_files: Arc<dyn GameFiles>,
}
