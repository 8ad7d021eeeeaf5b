use crate::presenter::RoundResult;
use crate::types::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "t", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Become host of a new session in this channel
    StartGame {
        host_id: VoterId,
        theme: String,
        #[serde(default)]
        config: GameConfig,
    },
    Vote {
        voter_id: VoterId,
        username: String,
        choice: Choice,
    },
    /// Host only; anyone else gets `stopped: false`
    Stop {
        requester_id: VoterId,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "t", rename_all = "snake_case")]
pub enum ServerMessage {
    Lobby {
        channel_id: ChannelId,
        host_id: VoterId,
        theme: String,
        config: GameConfig,
    },
    Countdown {
        channel_id: ChannelId,
        seconds_remaining: u32,
    },
    RoundPrompt {
        channel_id: ChannelId,
        round_no: u32,
        max_rounds: u32,
        matchup: Matchup,
        seconds_remaining: u32,
    },
    RoundResult {
        channel_id: ChannelId,
        #[serde(flatten)]
        result: RoundResult,
    },
    FinalStandings {
        channel_id: ChannelId,
        standings: Vec<Standing>,
        stopped_by_host: bool,
        rounds_completed: u32,
        max_rounds: u32,
    },

    // Direct replies
    SessionStarted {
        session: SessionSnapshot,
    },
    VoteAck {
        accepted: bool,
    },
    StopAck {
        stopped: bool,
    },
    Error {
        code: String,
        msg: String,
    },
}

impl ServerMessage {
    /// Channel a broadcast belongs to; None for direct replies
    pub fn channel_id(&self) -> Option<&str> {
        match self {
            ServerMessage::Lobby { channel_id, .. }
            | ServerMessage::Countdown { channel_id, .. }
            | ServerMessage::RoundPrompt { channel_id, .. }
            | ServerMessage::RoundResult { channel_id, .. }
            | ServerMessage::FinalStandings { channel_id, .. } => Some(channel_id),
            ServerMessage::SessionStarted { .. }
            | ServerMessage::VoteAck { .. }
            | ServerMessage::StopAck { .. }
            | ServerMessage::Error { .. } => None,
        }
    }
}
