use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

use super::vote::VoteCollector;
use crate::types::*;

#[derive(Debug)]
struct Progress {
    phase: SessionPhase,
    round_no: u32,
}

/// Shared view of one running session.
///
/// The engine owns the lifecycle; everyone else reads a snapshot, votes, or
/// asks for a stop through this handle.
#[derive(Debug)]
pub struct SessionHandle {
    channel_id: ChannelId,
    host_id: VoterId,
    theme: String,
    config: GameConfig,
    started_at: String,
    progress: RwLock<Progress>,
    pub(crate) votes: VoteCollector,
    stop: CancellationToken,
    done: CancellationToken,
    stopped_by_host: AtomicBool,
}

impl SessionHandle {
    pub fn new(channel_id: &str, host_id: &str, theme: &str, config: GameConfig) -> Self {
        Self {
            channel_id: channel_id.to_string(),
            host_id: host_id.to_string(),
            theme: theme.to_string(),
            config,
            started_at: chrono::Utc::now().to_rfc3339(),
            progress: RwLock::new(Progress {
                phase: SessionPhase::Created,
                round_no: 0,
            }),
            votes: VoteCollector::new(),
            stop: CancellationToken::new(),
            done: CancellationToken::new(),
            stopped_by_host: AtomicBool::new(false),
        }
    }

    pub fn channel_id(&self) -> &str {
        &self.channel_id
    }

    pub fn host_id(&self) -> &str {
        &self.host_id
    }

    pub fn theme(&self) -> &str {
        &self.theme
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub async fn phase(&self) -> SessionPhase {
        self.progress.read().await.phase
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        let progress = self.progress.read().await;
        SessionSnapshot {
            channel_id: self.channel_id.clone(),
            host_id: self.host_id.clone(),
            theme: self.theme.clone(),
            config: self.config.clone(),
            phase: progress.phase,
            round_no: progress.round_no,
            started_at: self.started_at.clone(),
            stopped_by_host: self.stopped_by_host(),
        }
    }

    /// Move to the next phase, rejecting backward or skipped moves
    pub(crate) async fn transition(&self, to: SessionPhase) -> Result<(), String> {
        let mut progress = self.progress.write().await;
        if !progress.phase.can_transition_to(&to) {
            return Err(format!(
                "Invalid phase transition from {:?} to {:?}",
                progress.phase, to
            ));
        }

        tracing::debug!(
            channel_id = %self.channel_id,
            from = ?progress.phase,
            to = ?to,
            "Session phase transition"
        );
        progress.phase = to;
        Ok(())
    }

    pub(crate) async fn set_round(&self, round_no: u32) {
        self.progress.write().await.round_no = round_no;
    }

    /// Cast or replace a vote for the open round
    pub async fn submit_vote(&self, voter_id: &str, username: &str, choice: Choice) -> bool {
        if self.is_stopping() {
            return false;
        }

        let accepted = self.votes.submit(voter_id, username, choice).await;
        if !accepted {
            tracing::debug!(
                channel_id = %self.channel_id,
                voter_id,
                "Vote rejected, no open round"
            );
        }
        accepted
    }

    /// Host-only early stop. Returns false for anyone else, or when the
    /// session is already stopping or over.
    pub async fn request_stop(&self, requester_id: &str) -> bool {
        if requester_id != self.host_id {
            tracing::warn!(
                channel_id = %self.channel_id,
                requester_id,
                "Unauthorized stop request ignored"
            );
            return false;
        }

        // held across the flag so `conclude` sees either all or none of it
        let progress = self.progress.read().await;
        if progress.phase.is_terminal() || self.stopped_by_host.swap(true, Ordering::SeqCst) {
            return false;
        }

        tracing::info!(channel_id = %self.channel_id, "Host requested stop");
        self.stop.cancel();
        true
    }

    /// Enter the terminal phase. An accepted host stop always wins over
    /// `outcome`; the phase actually entered is returned.
    pub(crate) async fn conclude(&self, outcome: SessionPhase) -> SessionPhase {
        let mut progress = self.progress.write().await;
        let end = if self.stopped_by_host() {
            SessionPhase::Stopped
        } else {
            outcome
        };

        if progress.phase.can_transition_to(&end) {
            tracing::debug!(
                channel_id = %self.channel_id,
                from = ?progress.phase,
                to = ?end,
                "Session phase transition"
            );
            progress.phase = end;
        } else {
            tracing::warn!(
                channel_id = %self.channel_id,
                "Invalid phase transition from {:?} to {:?}",
                progress.phase,
                end
            );
        }
        progress.phase
    }

    pub fn is_stopping(&self) -> bool {
        self.stop.is_cancelled()
    }

    pub fn stopped_by_host(&self) -> bool {
        self.stopped_by_host.load(Ordering::SeqCst)
    }

    pub(crate) fn stop_token(&self) -> &CancellationToken {
        &self.stop
    }

    pub(crate) fn mark_done(&self) {
        self.done.cancel();
    }

    /// Resolves once final standings are out and the session's history is written
    pub async fn finished(&self) {
        self.done.cancelled().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handle() -> SessionHandle {
        SessionHandle::new("chan", "host", "general", GameConfig::default())
    }

    #[tokio::test]
    async fn test_snapshot_starts_created() {
        let session = handle();
        let snapshot = session.snapshot().await;

        assert_eq!(snapshot.phase, SessionPhase::Created);
        assert_eq!(snapshot.round_no, 0);
        assert_eq!(snapshot.host_id, "host");
        assert!(!snapshot.stopped_by_host);
    }

    #[tokio::test]
    async fn test_transitions_only_move_forward() {
        let session = handle();

        assert!(session.transition(SessionPhase::Countdown).await.is_ok());
        assert!(session.transition(SessionPhase::Voting).await.is_ok());

        let err = session.transition(SessionPhase::Countdown).await.unwrap_err();
        assert!(err.contains("Invalid phase transition"));
        assert_eq!(session.phase().await, SessionPhase::Voting);

        assert!(session.transition(SessionPhase::Stopped).await.is_ok());
        assert!(session.transition(SessionPhase::Voting).await.is_err());
    }

    #[tokio::test]
    async fn test_non_host_cannot_stop() {
        let session = handle();

        assert!(!session.request_stop("someone").await);
        assert!(!session.is_stopping());
        assert!(!session.stopped_by_host());

        assert!(session.request_stop("host").await);
        assert!(session.is_stopping());
        assert!(session.snapshot().await.stopped_by_host);

        // second request is a no-op
        assert!(!session.request_stop("host").await);
    }

    #[tokio::test]
    async fn test_votes_rejected_once_stopping() {
        let session = handle();
        session.votes.open(1).await;

        assert!(session.submit_vote("v1", "Alice", Choice::A).await);
        session.request_stop("host").await;
        assert!(!session.submit_vote("v2", "Bob", Choice::B).await);
    }

    #[tokio::test]
    async fn test_late_stop_still_ends_stopped() {
        let session = handle();
        for phase in [
            SessionPhase::Countdown,
            SessionPhase::Voting,
            SessionPhase::Tally,
            SessionPhase::Advancing,
        ] {
            session.transition(phase).await.unwrap();
        }

        // the last round is done but the session has not concluded yet
        assert!(session.request_stop("host").await);
        assert_eq!(
            session.conclude(SessionPhase::Finished).await,
            SessionPhase::Stopped
        );
        assert!(session.snapshot().await.stopped_by_host);
    }

    #[tokio::test]
    async fn test_no_stop_after_conclude() {
        let session = handle();
        for phase in [
            SessionPhase::Countdown,
            SessionPhase::Voting,
            SessionPhase::Tally,
            SessionPhase::Advancing,
        ] {
            session.transition(phase).await.unwrap();
        }

        assert_eq!(
            session.conclude(SessionPhase::Finished).await,
            SessionPhase::Finished
        );
        assert!(!session.request_stop("host").await);
        assert!(!session.stopped_by_host());
        assert_eq!(session.phase().await, SessionPhase::Finished);
    }

    #[tokio::test]
    async fn test_finished_resolves_after_mark_done() {
        let session = std::sync::Arc::new(handle());
        let waiter = {
            let session = session.clone();
            tokio::spawn(async move { session.finished().await })
        };

        session.mark_done();
        waiter.await.unwrap();
    }
}
