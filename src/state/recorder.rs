//! Background writer for one session's history.
//!
//! The engine hands jobs over without waiting, so a slow or failing store
//! never delays a round. Jobs are written in the order they were sent.

use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::store::{RoundRecord, StatsStore};
use crate::types::*;

enum RecordJob {
    Round(RoundRecord),
    Finish {
        ranking: Vec<PlayerSessionScore>,
        standings: Vec<Standing>,
    },
}

pub(crate) struct SessionRecorder {
    tx: mpsc::UnboundedSender<RecordJob>,
    task: JoinHandle<()>,
}

impl SessionRecorder {
    /// Spawn the writer; it opens the session row before taking any job
    pub(crate) fn spawn(
        store: Arc<dyn StatsStore>,
        channel_id: &str,
        theme: &str,
        config: &GameConfig,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let writer = Writer {
            store,
            channel_id: channel_id.to_string(),
            session_id: None,
        };
        let task = tokio::spawn(writer.run(rx, theme.to_string(), config.clone()));
        Self { tx, task }
    }

    pub(crate) fn record_round(&self, round: RoundRecord) {
        if self.tx.send(RecordJob::Round(round)).is_err() {
            tracing::error!("History writer is gone, round not recorded");
        }
    }

    /// Queue the final scores and wait until everything queued is written
    pub(crate) async fn finish(self, ranking: Vec<PlayerSessionScore>, standings: Vec<Standing>) {
        let Self { tx, task } = self;
        if tx.send(RecordJob::Finish { ranking, standings }).is_err() {
            tracing::error!("History writer is gone, final scores not recorded");
        }
        drop(tx);

        if let Err(e) = task.await {
            tracing::error!("History writer failed: {}", e);
        }
    }
}

struct Writer {
    store: Arc<dyn StatsStore>,
    channel_id: ChannelId,
    session_id: Option<SessionId>,
}

impl Writer {
    async fn run(
        mut self,
        mut rx: mpsc::UnboundedReceiver<RecordJob>,
        theme: String,
        config: GameConfig,
    ) {
        match self
            .store
            .create_session(&self.channel_id, &theme, config.max_rounds, config.voting_time)
            .await
        {
            Ok(id) => {
                tracing::info!(
                    channel_id = %self.channel_id,
                    session_id = %id,
                    "Session created"
                );
                self.session_id = Some(id);
            }
            Err(e) => {
                tracing::error!(
                    channel_id = %self.channel_id,
                    "Failed to persist session start, history will be skipped: {}",
                    e
                );
            }
        }

        while let Some(job) = rx.recv().await {
            match job {
                RecordJob::Round(round) => self.round(&round).await,
                RecordJob::Finish { ranking, standings } => {
                    self.finish(&ranking, &standings).await
                }
            }
        }
    }

    async fn round(&self, round: &RoundRecord) {
        let Some(session_id) = &self.session_id else {
            return;
        };

        if let Err(e) = self.store.record_round_votes(session_id, round).await {
            tracing::error!(
                session_id = %session_id,
                round_no = round.round_no,
                votes = round.votes.len(),
                "Failed to persist round: {}",
                e
            );
        }
    }

    async fn finish(&self, ranking: &[PlayerSessionScore], standings: &[Standing]) {
        for score in ranking {
            if let Err(e) = self
                .store
                .update_lifetime_stats(
                    &score.voter_id,
                    &score.username,
                    score.correct_votes,
                    1,
                    score.total_votes,
                )
                .await
            {
                tracing::error!(
                    voter_id = %score.voter_id,
                    "Failed to update lifetime stats: {}",
                    e
                );
            }
        }

        let Some(session_id) = &self.session_id else {
            return;
        };

        for (score, standing) in ranking.iter().zip(standings) {
            if let Err(e) = self
                .store
                .record_session_player(session_id, score, standing.rank)
                .await
            {
                tracing::error!(
                    session_id = %session_id,
                    voter_id = %score.voter_id,
                    "Failed to persist session score: {}",
                    e
                );
            }
        }

        let winner = standings.first().map(|s| s.voter_id.as_str());
        if let Err(e) = self
            .store
            .end_session(session_id, winner, standings.len() as u32)
            .await
        {
            tracing::error!(session_id = %session_id, "Failed to persist session end: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{RoundVote, SqliteStatsStore};

    #[tokio::test]
    async fn test_rounds_then_final_scores_are_written() {
        let store = Arc::new(SqliteStatsStore::open_in_memory().unwrap());
        let recorder =
            SessionRecorder::spawn(store.clone(), "chan", "general", &GameConfig::default());

        recorder.record_round(RoundRecord {
            round_no: 1,
            option_a: "Tea".to_string(),
            option_b: "Coffee".to_string(),
            votes_a: 1,
            votes_b: 0,
            votes: vec![RoundVote {
                voter_id: "v1".to_string(),
                username: "Alice".to_string(),
                choice: Choice::A,
                was_majority: true,
            }],
        });

        let score = PlayerSessionScore {
            voter_id: "v1".to_string(),
            username: "Alice".to_string(),
            correct_votes: 1,
            total_votes: 1,
        };
        let standing = Standing {
            rank: 1,
            voter_id: "v1".to_string(),
            username: "Alice".to_string(),
            correct_votes: 1,
            total_votes: 1,
            accuracy: 1.0,
        };
        recorder.finish(vec![score], vec![standing]).await;

        let recent = store.get_recent_sessions("v1", 5).await.unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].winner_id.as_deref(), Some("v1"));

        let rounds = store.session_rounds(&recent[0].session_id).await.unwrap();
        assert_eq!(rounds.len(), 1);
        assert_eq!(store.session_votes(&recent[0].session_id).await.unwrap().len(), 1);

        let stats = store.get_lifetime_stats("v1").await.unwrap().unwrap();
        assert_eq!((stats.total_wins, stats.total_games, stats.total_rounds), (1, 1, 1));
    }
}
