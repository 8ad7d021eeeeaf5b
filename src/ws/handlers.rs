//! WebSocket message dispatch
//!
//! Transport-free: takes a parsed message plus the channel it arrived on and
//! returns the direct reply, if any. Session output goes out via broadcast.

use crate::protocol::{ClientMessage, ServerMessage};
use crate::state::AppState;
use crate::types::ChannelId;
use std::sync::Arc;

/// Handle client messages and return optional response
pub async fn handle_message(
    msg: ClientMessage,
    channel_id: &ChannelId,
    state: &Arc<AppState>,
) -> Option<ServerMessage> {
    match msg {
        ClientMessage::StartGame {
            host_id,
            theme,
            config,
        } => match state
            .registry
            .start(channel_id, &host_id, &theme, config)
            .await
        {
            Ok(session) => Some(ServerMessage::SessionStarted {
                session: session.snapshot().await,
            }),
            Err(e) => {
                tracing::info!(channel_id = %channel_id, "Start rejected: {}", e);
                Some(ServerMessage::Error {
                    code: e.code().to_string(),
                    msg: e.to_string(),
                })
            }
        },

        ClientMessage::Vote {
            voter_id,
            username,
            choice,
        } => {
            let accepted = state
                .registry
                .submit_vote(channel_id, &voter_id, &username, choice)
                .await;
            Some(ServerMessage::VoteAck { accepted })
        }

        ClientMessage::Stop { requester_id } => {
            let stopped = state.registry.stop(channel_id, &requester_id).await;
            Some(ServerMessage::StopAck { stopped })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineTimings;
    use crate::questions::{QuestionBank, QuestionLibrary};
    use crate::store::SqliteStatsStore;
    use crate::types::*;

    fn state() -> Arc<AppState> {
        let mut library = QuestionLibrary::new();
        library.insert(
            "general",
            QuestionBank::new(vec![Matchup {
                a: MatchupOption {
                    label: "Sun".to_string(),
                    media: None,
                },
                b: MatchupOption {
                    label: "Moon".to_string(),
                    media: None,
                },
                tag_a: None,
                tag_b: None,
            }]),
        );
        Arc::new(AppState::new(
            library,
            Arc::new(SqliteStatsStore::open_in_memory().unwrap()),
            EngineTimings::default(),
        ))
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_game_reply() {
        let state = state();
        let channel = "chan".to_string();

        let reply = handle_message(
            ClientMessage::StartGame {
                host_id: "host".to_string(),
                theme: "general".to_string(),
                config: GameConfig::default(),
            },
            &channel,
            &state,
        )
        .await;
        match reply {
            Some(ServerMessage::SessionStarted { session }) => {
                assert_eq!(session.channel_id, "chan");
                assert_eq!(session.host_id, "host");
            }
            other => panic!("unexpected {:?}", other),
        }

        let reply = handle_message(
            ClientMessage::StartGame {
                host_id: "host".to_string(),
                theme: "general".to_string(),
                config: GameConfig::default(),
            },
            &channel,
            &state,
        )
        .await;
        match reply {
            Some(ServerMessage::Error { code, .. }) => assert_eq!(code, "SESSION_CONFLICT"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_invalid_config_reply() {
        let state = state();
        let reply = handle_message(
            ClientMessage::StartGame {
                host_id: "host".to_string(),
                theme: "general".to_string(),
                config: GameConfig {
                    voting_time: 61,
                    ..GameConfig::default()
                },
            },
            &"chan".to_string(),
            &state,
        )
        .await;

        match reply {
            Some(ServerMessage::Error { code, msg }) => {
                assert_eq!(code, "INVALID_CONFIG");
                assert!(msg.contains("61"));
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(state.registry.get("chan").await.is_none());
    }

    #[tokio::test]
    async fn test_vote_and_stop_without_session() {
        let state = state();
        let channel = "quiet".to_string();

        let reply = handle_message(
            ClientMessage::Vote {
                voter_id: "v1".to_string(),
                username: "Alice".to_string(),
                choice: Choice::A,
            },
            &channel,
            &state,
        )
        .await;
        assert!(matches!(reply, Some(ServerMessage::VoteAck { accepted: false })));

        let reply = handle_message(
            ClientMessage::Stop {
                requester_id: "v1".to_string(),
            },
            &channel,
            &state,
        )
        .await;
        assert!(matches!(reply, Some(ServerMessage::StopAck { stopped: false })));
    }
}
