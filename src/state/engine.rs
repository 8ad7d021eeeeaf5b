//! Drives one session from lobby to final standings.

use std::sync::Arc;
use std::time::Duration;

use super::recorder::SessionRecorder;
use super::registry::SessionMap;
use super::score::{RoundTally, Scoreboard};
use super::session::SessionHandle;
use super::vote::VoteSnapshot;
use crate::config::EngineTimings;
use crate::presenter::{Presenter, RoundResult};
use crate::questions::QuestionBank;
use crate::store::{RoundRecord, RoundVote, StatsStore};
use crate::types::*;

pub struct RoundEngine {
    session: Arc<SessionHandle>,
    pool: Vec<Matchup>,
    store: Arc<dyn StatsStore>,
    presenter: Arc<dyn Presenter>,
    timings: EngineTimings,
    sessions: SessionMap,
    scoreboard: Scoreboard,
    rounds_completed: u32,
}

impl RoundEngine {
    pub fn new(
        session: Arc<SessionHandle>,
        pool: Vec<Matchup>,
        store: Arc<dyn StatsStore>,
        presenter: Arc<dyn Presenter>,
        timings: EngineTimings,
        sessions: SessionMap,
    ) -> Self {
        Self {
            session,
            pool,
            store,
            presenter,
            timings,
            sessions,
            scoreboard: Scoreboard::new(),
            rounds_completed: 0,
        }
    }

    /// Play the whole session, then finalize and deregister
    pub async fn run(mut self) {
        let config = self.session.config().clone();
        let recorder = SessionRecorder::spawn(
            self.store.clone(),
            self.session.channel_id(),
            self.session.theme(),
            &config,
        );

        let outcome = self.play(&config, &recorder).await;
        self.finalize(outcome, &config, recorder).await;
    }

    async fn advance(&self, to: SessionPhase) {
        if let Err(e) = self.session.transition(to).await {
            tracing::warn!(channel_id = %self.session.channel_id(), "{}", e);
        }
    }

    /// Wait out `duration` unless the host stops first. Returns false on stop.
    async fn wait(&self, duration: Duration) -> bool {
        let stop = self.session.stop_token();
        tokio::select! {
            _ = stop.cancelled() => false,
            _ = tokio::time::sleep(duration) => !stop.is_cancelled(),
        }
    }

    async fn countdown(&self) -> bool {
        let tick = self.timings.tick.max(Duration::from_millis(1));
        let mut remaining = self.timings.countdown;

        while !remaining.is_zero() {
            let secs = remaining.as_secs_f64().ceil() as u32;
            self.presenter
                .render_countdown(self.session.channel_id(), secs)
                .await;

            let step = remaining.min(tick);
            if !self.wait(step).await {
                return false;
            }
            remaining -= step;
        }

        !self.session.is_stopping()
    }

    /// Returns the terminal phase the session should end in
    async fn play(&mut self, config: &GameConfig, recorder: &SessionRecorder) -> SessionPhase {
        let channel_id = self.session.channel_id().to_string();

        self.advance(SessionPhase::Countdown).await;
        self.presenter
            .render_lobby(&channel_id, self.session.host_id(), self.session.theme(), config)
            .await;

        if !self.countdown().await {
            return SessionPhase::Stopped;
        }

        for round_no in 1..=config.max_rounds {
            let matchup = match QuestionBank::pick_random(&self.pool) {
                Some(m) => m.clone(),
                None => {
                    tracing::error!(channel_id = %channel_id, "No matchups available, ending session");
                    return SessionPhase::Stopped;
                }
            };

            self.advance(SessionPhase::Voting).await;
            self.session.set_round(round_no).await;
            self.session.votes.open(round_no).await;
            self.presenter
                .render_round_prompt(
                    &channel_id,
                    round_no,
                    config.max_rounds,
                    &matchup,
                    config.voting_time,
                )
                .await;

            // a stop mid-window throws the open round away
            if !self
                .wait(Duration::from_secs(config.voting_time as u64))
                .await
            {
                return SessionPhase::Stopped;
            }

            self.advance(SessionPhase::Tally).await;
            let snapshot = self.session.votes.snapshot_and_close().await;
            let tally = RoundTally::from_snapshot(&snapshot);
            self.scoreboard.apply(&snapshot, &tally);
            recorder.record_round(round_record(&matchup, &snapshot, &tally));
            self.rounds_completed = round_no;

            tracing::info!(
                channel_id = %channel_id,
                round_no,
                votes_a = tally.votes_a,
                votes_b = tally.votes_b,
                majority = ?tally.majority,
                "Round tallied"
            );

            self.advance(SessionPhase::Advancing).await;
            let result = RoundResult {
                round_no,
                max_rounds: config.max_rounds,
                votes_a: tally.votes_a,
                votes_b: tally.votes_b,
                majority: tally.majority,
                scorers: tally.scorers.iter().cloned().collect(),
                top_scores: self.scoreboard.top(ROUND_TOP_SCORES),
            };
            self.presenter
                .render_round_result(&channel_id, &result)
                .await;

            if round_no < config.max_rounds && !self.wait(self.timings.pause).await {
                return SessionPhase::Stopped;
            }
        }

        if self.session.is_stopping() {
            SessionPhase::Stopped
        } else {
            SessionPhase::Finished
        }
    }

    async fn finalize(
        &mut self,
        outcome: SessionPhase,
        config: &GameConfig,
        recorder: SessionRecorder,
    ) {
        let channel_id = self.session.channel_id().to_string();

        // close any window a stop left open
        self.session.votes.snapshot_and_close().await;
        let end = self.session.conclude(outcome).await;
        let stopped = end == SessionPhase::Stopped;
        self.deregister().await;

        let ranking = self.scoreboard.ranking();
        let standings = self.scoreboard.standings();

        tracing::info!(
            channel_id = %channel_id,
            stopped,
            rounds_completed = self.rounds_completed,
            participants = self.scoreboard.len(),
            "Session over"
        );

        self.presenter
            .render_final_standings(
                &channel_id,
                &standings,
                stopped,
                self.rounds_completed,
                config.max_rounds,
            )
            .await;

        recorder.finish(ranking, standings).await;
        self.session.mark_done();
    }

    async fn deregister(&self) {
        let mut sessions = self.sessions.write().await;
        let ours = sessions
            .get(self.session.channel_id())
            .is_some_and(|current| Arc::ptr_eq(current, &self.session));
        if ours {
            sessions.remove(self.session.channel_id());
        }
    }
}

fn round_record(matchup: &Matchup, snapshot: &VoteSnapshot, tally: &RoundTally) -> RoundRecord {
    RoundRecord {
        round_no: snapshot.round_no,
        option_a: matchup.a.label.clone(),
        option_b: matchup.b.label.clone(),
        votes_a: tally.votes_a,
        votes_b: tally.votes_b,
        votes: snapshot
            .raw
            .iter()
            .map(|(voter_id, ballot)| RoundVote {
                voter_id: voter_id.clone(),
                username: ballot.username.clone(),
                choice: ballot.choice,
                was_majority: tally.is_scorer(voter_id),
            })
            .collect(),
    }
}
