use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::engine::RoundEngine;
use super::session::SessionHandle;
use crate::config::EngineTimings;
use crate::error::SessionError;
use crate::presenter::Presenter;
use crate::questions::QuestionLibrary;
use crate::store::StatsStore;
use crate::types::*;

/// Channel -> live session. An entry is removed by its own engine, or
/// replaced by a new start once its phase is terminal.
pub type SessionMap = Arc<RwLock<HashMap<ChannelId, Arc<SessionHandle>>>>;

/// At most one running session per channel
pub struct SessionRegistry {
    sessions: SessionMap,
    library: Arc<QuestionLibrary>,
    store: Arc<dyn StatsStore>,
    presenter: Arc<dyn Presenter>,
    timings: EngineTimings,
}

impl SessionRegistry {
    pub fn new(
        library: Arc<QuestionLibrary>,
        store: Arc<dyn StatsStore>,
        presenter: Arc<dyn Presenter>,
        timings: EngineTimings,
    ) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            library,
            store,
            presenter,
            timings,
        }
    }

    pub fn library(&self) -> &QuestionLibrary {
        &self.library
    }

    /// Validate, claim the channel and spawn the engine.
    ///
    /// Nothing is spawned or shown when this returns an error.
    pub async fn start(
        &self,
        channel_id: &str,
        host_id: &str,
        theme: &str,
        config: GameConfig,
    ) -> Result<Arc<SessionHandle>, SessionError> {
        config.validate()?;
        let pool = self.library.pool_for(theme, &config.excluded_tags)?;

        let session = {
            let mut sessions = self.sessions.write().await;
            if let Some(existing) = sessions.get(channel_id) {
                // an ended session still wrapping up does not hold the channel
                if !existing.phase().await.is_terminal() {
                    tracing::warn!(channel_id, host_id, "Session already running in channel");
                    return Err(SessionError::Conflict {
                        channel_id: channel_id.to_string(),
                    });
                }
                tracing::debug!(channel_id, "Replacing ended session");
            }

            let session = Arc::new(SessionHandle::new(channel_id, host_id, theme, config));
            sessions.insert(channel_id.to_string(), session.clone());
            session
        };

        tracing::info!(
            channel_id,
            host_id,
            theme,
            pool_size = pool.len(),
            "Starting session"
        );

        let engine = RoundEngine::new(
            session.clone(),
            pool,
            self.store.clone(),
            self.presenter.clone(),
            self.timings.clone(),
            self.sessions.clone(),
        );
        tokio::spawn(engine.run());

        Ok(session)
    }

    /// Forward a stop to the channel's session. False if none or not the host.
    pub async fn stop(&self, channel_id: &str, requester_id: &str) -> bool {
        match self.session(channel_id).await {
            Some(session) => session.request_stop(requester_id).await,
            None => false,
        }
    }

    pub async fn get(&self, channel_id: &str) -> Option<SessionSnapshot> {
        match self.session(channel_id).await {
            Some(session) => Some(session.snapshot().await),
            None => None,
        }
    }

    pub async fn session(&self, channel_id: &str) -> Option<Arc<SessionHandle>> {
        self.sessions.read().await.get(channel_id).cloned()
    }

    pub async fn submit_vote(
        &self,
        channel_id: &str,
        voter_id: &str,
        username: &str,
        choice: Choice,
    ) -> bool {
        match self.session(channel_id).await {
            Some(session) => session.submit_vote(voter_id, username, choice).await,
            None => false,
        }
    }

    /// Channels with a session, sorted
    pub async fn active_channels(&self) -> Vec<ChannelId> {
        let mut channels: Vec<ChannelId> = self.sessions.read().await.keys().cloned().collect();
        channels.sort();
        channels
    }
}
