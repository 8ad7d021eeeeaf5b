pub mod engine;
mod recorder;
pub mod registry;
pub mod score;
pub mod session;
pub mod vote;

pub use engine::RoundEngine;
pub use registry::{SessionMap, SessionRegistry};
pub use session::SessionHandle;

use crate::broadcast::BroadcastPresenter;
use crate::config::EngineTimings;
use crate::protocol::ServerMessage;
use crate::questions::QuestionLibrary;
use crate::store::StatsStore;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<SessionRegistry>,
    pub store: Arc<dyn StatsStore>,
    /// Broadcast channel for every session's presenter output
    pub broadcast: broadcast::Sender<ServerMessage>,
}

impl AppState {
    pub fn new(
        library: QuestionLibrary,
        store: Arc<dyn StatsStore>,
        timings: EngineTimings,
    ) -> Self {
        let (tx, _rx) = broadcast::channel(256);
        let presenter = Arc::new(BroadcastPresenter::new(tx.clone()));
        let registry = SessionRegistry::new(Arc::new(library), store.clone(), presenter, timings);

        Self {
            registry: Arc::new(registry),
            store,
            broadcast: tx,
        }
    }
}
