use crate::frameworks::config::ServerSettings;
use crate::use_cases::game::SessionRegistry;
use crate::use_cases::matchmaker::MatchQueue;
use std::sync::Arc;
use tokio::sync::Mutex;

// Shared application state handed to both request handlers and watchdogs.
#[derive(Clone)]
pub struct AppState {
    // Matchmaking queue behind the single matchmaker mutex.
    pub matchmaker: Arc<Mutex<MatchQueue>>,
    // Registry of live game sessions.
    pub sessions: Arc<SessionRegistry>,
    // Runtime settings fixed at startup.
    pub settings: ServerSettings,
}

impl AppState {
    pub fn new(settings: ServerSettings) -> Self {
        Self {
            matchmaker: Arc::new(Mutex::new(MatchQueue::new())),
            sessions: Arc::new(SessionRegistry::new()),
            settings,
        }
    }
}
