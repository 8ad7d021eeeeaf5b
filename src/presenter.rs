//! Output side of a session.
//!
//! The engine calls these in order: lobby, countdown ticks, then a prompt and
//! a result per round, then the final standings exactly once.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::types::{GameConfig, Majority, Matchup, PlayerSessionScore, Standing, VoterId};

/// Closed round as shown to players
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RoundResult {
    pub round_no: u32,
    pub max_rounds: u32,
    pub votes_a: u32,
    pub votes_b: u32,
    pub majority: Option<Majority>,
    pub scorers: Vec<VoterId>,
    pub top_scores: Vec<PlayerSessionScore>,
}

#[async_trait]
pub trait Presenter: Send + Sync {
    async fn render_lobby(&self, channel_id: &str, host_id: &str, theme: &str, config: &GameConfig);

    async fn render_countdown(&self, channel_id: &str, seconds_remaining: u32);

    async fn render_round_prompt(
        &self,
        channel_id: &str,
        round_no: u32,
        max_rounds: u32,
        matchup: &Matchup,
        seconds_remaining: u32,
    );

    async fn render_round_result(&self, channel_id: &str, result: &RoundResult);

    async fn render_final_standings(
        &self,
        channel_id: &str,
        standings: &[Standing],
        stopped_by_host: bool,
        rounds_completed: u32,
        max_rounds: u32,
    );
}
