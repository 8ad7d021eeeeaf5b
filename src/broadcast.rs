use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::presenter::{Presenter, RoundResult};
use crate::protocol::ServerMessage;
use crate::types::{GameConfig, Matchup, Standing};

/// Presenter that fans every render out to WebSocket subscribers
#[derive(Clone)]
pub struct BroadcastPresenter {
    tx: broadcast::Sender<ServerMessage>,
}

impl BroadcastPresenter {
    pub fn new(tx: broadcast::Sender<ServerMessage>) -> Self {
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ServerMessage> {
        self.tx.subscribe()
    }

    fn send(&self, msg: ServerMessage) {
        // Ignore send errors (no receivers connected is fine)
        let _ = self.tx.send(msg);
    }
}

#[async_trait]
impl Presenter for BroadcastPresenter {
    async fn render_lobby(&self, channel_id: &str, host_id: &str, theme: &str, config: &GameConfig) {
        self.send(ServerMessage::Lobby {
            channel_id: channel_id.to_string(),
            host_id: host_id.to_string(),
            theme: theme.to_string(),
            config: config.clone(),
        });
    }

    async fn render_countdown(&self, channel_id: &str, seconds_remaining: u32) {
        self.send(ServerMessage::Countdown {
            channel_id: channel_id.to_string(),
            seconds_remaining,
        });
    }

    async fn render_round_prompt(
        &self,
        channel_id: &str,
        round_no: u32,
        max_rounds: u32,
        matchup: &Matchup,
        seconds_remaining: u32,
    ) {
        self.send(ServerMessage::RoundPrompt {
            channel_id: channel_id.to_string(),
            round_no,
            max_rounds,
            matchup: matchup.clone(),
            seconds_remaining,
        });
    }

    async fn render_round_result(&self, channel_id: &str, result: &RoundResult) {
        self.send(ServerMessage::RoundResult {
            channel_id: channel_id.to_string(),
            result: result.clone(),
        });
    }

    async fn render_final_standings(
        &self,
        channel_id: &str,
        standings: &[Standing],
        stopped_by_host: bool,
        rounds_completed: u32,
        max_rounds: u32,
    ) {
        self.send(ServerMessage::FinalStandings {
            channel_id: channel_id.to_string(),
            standings: standings.to_vec(),
            stopped_by_host,
            rounds_completed,
            max_rounds,
        });
    }
}
