use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Opaque ID types for readability
pub type ChannelId = String;
pub type SessionId = String;
pub type VoterId = String;

/// Inclusive bounds for configurable session values
pub const MIN_ROUNDS: u32 = 1;
pub const MAX_ROUNDS: u32 = 20;
pub const MIN_VOTING_SECONDS: u32 = 5;
pub const MAX_VOTING_SECONDS: u32 = 60;

/// Number of players shown in the per-round top list
pub const ROUND_TOP_SCORES: usize = 5;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Choice {
    A,
    B,
}

impl Choice {
    pub fn as_str(&self) -> &'static str {
        match self {
            Choice::A => "A",
            Choice::B => "B",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "A" | "a" => Some(Choice::A),
            "B" | "b" => Some(Choice::B),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Majority {
    A,
    B,
    Tie,
}

impl Majority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Majority::A => "A",
            Majority::B => "B",
            Majority::Tie => "TIE",
        }
    }

    /// Larger side wins; None when nobody voted
    pub fn from_counts(votes_a: u32, votes_b: u32) -> Option<Self> {
        match (votes_a, votes_b) {
            (0, 0) => None,
            (a, b) if a > b => Some(Majority::A),
            (a, b) if a < b => Some(Majority::B),
            _ => Some(Majority::Tie),
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "A" => Some(Majority::A),
            "B" => Some(Majority::B),
            "TIE" => Some(Majority::Tie),
            _ => None,
        }
    }
}

/// Lifecycle of a single session.
///
/// Phases only move forward; `Finished` and `Stopped` are terminal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionPhase {
    Created,
    Countdown,
    Voting,
    Tally,
    Advancing,
    Finished,
    Stopped,
}

impl SessionPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionPhase::Finished | SessionPhase::Stopped)
    }

    /// Check if a phase transition is valid
    pub fn can_transition_to(&self, to: &SessionPhase) -> bool {
        use SessionPhase::*;

        match (self, to) {
            (Created, Countdown) => true,
            (Countdown, Voting) => true,
            (Voting, Tally) => true,
            (Tally, Advancing) => true,
            (Advancing, Voting) => true,
            (Advancing, Finished) => true,

            // Host stop from anywhere that is still running
            (from, Stopped) => !from.is_terminal(),

            _ => false,
        }
    }
}

/// Per-session settings chosen by the host
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GameConfig {
    #[serde(default = "default_max_rounds")]
    pub max_rounds: u32,
    #[serde(default = "default_voting_time")]
    pub voting_time: u32,
    #[serde(default)]
    pub excluded_tags: Vec<String>,
}

fn default_max_rounds() -> u32 {
    5
}

fn default_voting_time() -> u32 {
    10
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            max_rounds: default_max_rounds(),
            voting_time: default_voting_time(),
            excluded_tags: Vec::new(),
        }
    }
}

impl GameConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(MIN_ROUNDS..=MAX_ROUNDS).contains(&self.max_rounds) {
            return Err(ConfigError::MaxRoundsOutOfRange(self.max_rounds));
        }
        if !(MIN_VOTING_SECONDS..=MAX_VOTING_SECONDS).contains(&self.voting_time) {
            return Err(ConfigError::VotingTimeOutOfRange(self.voting_time));
        }
        Ok(())
    }
}

/// One side of a matchup
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MatchupOption {
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media: Option<String>,
}

/// Two-option question shown during a round
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Matchup {
    pub a: MatchupOption,
    pub b: MatchupOption,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag_a: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag_b: Option<String>,
}

/// A voter's running score inside one session
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlayerSessionScore {
    pub voter_id: VoterId,
    pub username: String,
    pub correct_votes: u32,
    pub total_votes: u32,
}

impl PlayerSessionScore {
    pub fn accuracy(&self) -> f64 {
        if self.total_votes == 0 {
            0.0
        } else {
            self.correct_votes as f64 / self.total_votes as f64
        }
    }
}

/// Cross-session aggregate for one voter
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlayerLifetimeStats {
    pub voter_id: VoterId,
    pub username: String,
    pub total_wins: u32,
    pub total_games: u32,
    pub total_rounds: u32,
    pub win_rate: f64,
    /// RFC3339 timestamp of the last finished session
    pub last_played: String,
}

/// Final placement of a voter at session end
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Standing {
    pub rank: u32,
    pub voter_id: VoterId,
    pub username: String,
    pub correct_votes: u32,
    pub total_votes: u32,
    pub accuracy: f64,
}

/// Read-only view of a running session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub channel_id: ChannelId,
    pub host_id: VoterId,
    pub theme: String,
    pub config: GameConfig,
    pub phase: SessionPhase,
    pub round_no: u32,
    pub started_at: String,
    pub stopped_by_host: bool,
}

/// A past session as seen from one player's history
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlayerSessionSummary {
    pub session_id: SessionId,
    pub channel_id: ChannelId,
    pub theme: String,
    pub started_at: String,
    pub ended_at: Option<String>,
    pub winner_id: Option<VoterId>,
    pub total_participants: u32,
    pub correct_votes: u32,
    pub total_votes: u32,
    pub rank: Option<u32>,
}

/// Stored session row
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionRecord {
    pub session_id: SessionId,
    pub channel_id: ChannelId,
    pub theme: String,
    pub max_rounds: u32,
    pub voting_time: u32,
    pub started_at: String,
    pub ended_at: Option<String>,
    pub winner_id: Option<VoterId>,
    pub total_participants: u32,
}
