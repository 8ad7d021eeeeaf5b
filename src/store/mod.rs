//! Persistence for sessions, rounds, votes and lifetime player stats.

mod sqlite;

use async_trait::async_trait;

pub use sqlite::{SqliteStatsStore, StoredRound, StoredVote, SCHEMA_VERSION};

use crate::error::StoreResult;
use crate::types::{
    Choice, PlayerLifetimeStats, PlayerSessionScore, PlayerSessionSummary, SessionId,
    SessionRecord, VoterId,
};

/// One ballot as it is written to history
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundVote {
    pub voter_id: VoterId,
    pub username: String,
    pub choice: Choice,
    pub was_majority: bool,
}

/// A tallied round with every ballot cast in it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundRecord {
    pub round_no: u32,
    pub option_a: String,
    pub option_b: String,
    pub votes_a: u32,
    pub votes_b: u32,
    pub votes: Vec<RoundVote>,
}

/// Storage backend used by every running session.
///
/// Sessions only write rows keyed by their own session id, so implementations
/// need no cross-session coordination beyond their own transactions.
#[async_trait]
pub trait StatsStore: Send + Sync {
    async fn create_session(
        &self,
        channel_id: &str,
        theme: &str,
        max_rounds: u32,
        voting_time: u32,
    ) -> StoreResult<SessionId>;

    async fn end_session(
        &self,
        session_id: &str,
        winner_id: Option<&str>,
        participant_count: u32,
    ) -> StoreResult<()>;

    /// Majority is derived from the counts and stored alongside them
    async fn record_round(
        &self,
        session_id: &str,
        round_no: u32,
        option_a: &str,
        option_b: &str,
        votes_a: u32,
        votes_b: u32,
    ) -> StoreResult<()>;

    async fn record_vote(
        &self,
        session_id: &str,
        round_no: u32,
        voter_id: &str,
        username: &str,
        choice: Choice,
        was_majority: bool,
    ) -> StoreResult<()>;

    /// Round row plus all of its votes.
    ///
    /// Backends that can should write these atomically; the fallback issues
    /// the individual writes and stops at the first failure.
    async fn record_round_votes(&self, session_id: &str, round: &RoundRecord) -> StoreResult<()> {
        self.record_round(
            session_id,
            round.round_no,
            &round.option_a,
            &round.option_b,
            round.votes_a,
            round.votes_b,
        )
        .await?;
        for vote in &round.votes {
            self.record_vote(
                session_id,
                round.round_no,
                &vote.voter_id,
                &vote.username,
                vote.choice,
                vote.was_majority,
            )
            .await?;
        }
        Ok(())
    }

    /// Final per-session score row for one participant
    async fn record_session_player(
        &self,
        session_id: &str,
        score: &PlayerSessionScore,
        rank: u32,
    ) -> StoreResult<()>;

    /// Add to a voter's totals, creating the row on first use
    async fn update_lifetime_stats(
        &self,
        voter_id: &str,
        username: &str,
        wins_gained: u32,
        games_played: u32,
        rounds_played: u32,
    ) -> StoreResult<PlayerLifetimeStats>;

    async fn get_lifetime_stats(&self, voter_id: &str) -> StoreResult<Option<PlayerLifetimeStats>>;

    /// Players with at least one round, best win rate first
    async fn get_leaderboard(&self, limit: u32) -> StoreResult<Vec<PlayerLifetimeStats>>;

    /// A player's sessions, newest first
    async fn get_recent_sessions(
        &self,
        voter_id: &str,
        limit: u32,
    ) -> StoreResult<Vec<PlayerSessionSummary>>;

    async fn get_session(&self, session_id: &str) -> StoreResult<Option<SessionRecord>>;
}

/// `total_wins / total_rounds`, or 0 before any round was played
pub fn win_rate(total_wins: u32, total_rounds: u32) -> f64 {
    if total_rounds == 0 {
        0.0
    } else {
        total_wins as f64 / total_rounds as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_win_rate() {
        assert_eq!(win_rate(0, 0), 0.0);
        assert_eq!(win_rate(3, 0), 0.0);
        assert_eq!(win_rate(1, 4), 0.25);
        assert_eq!(win_rate(4, 4), 1.0);
    }
}
