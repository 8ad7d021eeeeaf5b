//! SQLite-backed stats store.
//!
//! One connection is shared behind a mutex and every call runs on the
//! blocking pool, so async callers never stall the runtime on disk I/O.

use async_trait::async_trait;
use chrono::SecondsFormat;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Arc, Mutex};

use super::{win_rate, RoundRecord, StatsStore};
use crate::error::{StoreError, StoreResult};
use crate::types::{
    Choice, Majority, PlayerLifetimeStats, PlayerSessionScore, PlayerSessionSummary, SessionId,
    SessionRecord,
};

pub const SCHEMA_VERSION: i64 = 1;

const SCHEMA_V1: &str = "
CREATE TABLE IF NOT EXISTS sessions (
    session_id TEXT PRIMARY KEY,
    channel_id TEXT NOT NULL,
    theme TEXT NOT NULL,
    max_rounds INTEGER NOT NULL,
    voting_time INTEGER NOT NULL,
    start_time TEXT NOT NULL,
    end_time TEXT,
    winner_id TEXT,
    total_participants INTEGER NOT NULL DEFAULT 0
);
CREATE INDEX IF NOT EXISTS idx_sessions_start_time ON sessions(start_time);

CREATE TABLE IF NOT EXISTS rounds (
    session_id TEXT NOT NULL REFERENCES sessions(session_id),
    round_number INTEGER NOT NULL,
    option_a TEXT NOT NULL,
    option_b TEXT NOT NULL,
    votes_a INTEGER NOT NULL,
    votes_b INTEGER NOT NULL,
    majority_option TEXT,
    PRIMARY KEY (session_id, round_number)
);

CREATE TABLE IF NOT EXISTS votes (
    session_id TEXT NOT NULL REFERENCES sessions(session_id),
    round_number INTEGER NOT NULL,
    voter_id TEXT NOT NULL,
    username TEXT NOT NULL,
    choice TEXT NOT NULL,
    was_majority INTEGER NOT NULL,
    PRIMARY KEY (session_id, round_number, voter_id)
);
CREATE INDEX IF NOT EXISTS idx_votes_voter ON votes(voter_id);

CREATE TABLE IF NOT EXISTS session_players (
    session_id TEXT NOT NULL REFERENCES sessions(session_id),
    voter_id TEXT NOT NULL,
    username TEXT NOT NULL,
    correct_votes INTEGER NOT NULL,
    total_votes INTEGER NOT NULL,
    rank INTEGER,
    PRIMARY KEY (session_id, voter_id)
);
CREATE INDEX IF NOT EXISTS idx_session_players_voter ON session_players(voter_id);

CREATE TABLE IF NOT EXISTS lifetime_stats (
    voter_id TEXT PRIMARY KEY,
    username TEXT NOT NULL,
    total_wins INTEGER NOT NULL DEFAULT 0,
    total_games INTEGER NOT NULL DEFAULT 0,
    total_rounds INTEGER NOT NULL DEFAULT 0,
    win_rate REAL NOT NULL DEFAULT 0,
    last_played TEXT NOT NULL
);
";

fn now() -> String {
    chrono::Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn lifetime_from_row(row: &Row<'_>) -> rusqlite::Result<PlayerLifetimeStats> {
    Ok(PlayerLifetimeStats {
        voter_id: row.get(0)?,
        username: row.get(1)?,
        total_wins: row.get(2)?,
        total_games: row.get(3)?,
        total_rounds: row.get(4)?,
        win_rate: row.get(5)?,
        last_played: row.get(6)?,
    })
}

const LIFETIME_COLUMNS: &str =
    "voter_id, username, total_wins, total_games, total_rounds, win_rate, last_played";

#[derive(Clone)]
pub struct SqliteStatsStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStatsStore {
    /// Open (or create) a database file and bring its schema up to date
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        let mode: String = conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))?;
        tracing::debug!(path = %path.display(), journal_mode = %mode, "Opened stats database");
        Self::init(conn)
    }

    pub fn open_in_memory() -> StoreResult<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> StoreResult<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        Self::migrate(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn migrate(conn: &Connection) -> StoreResult<()> {
        let current: i64 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
        if current > SCHEMA_VERSION {
            return Err(StoreError::UnsupportedSchemaVersion {
                found: current,
                supported: SCHEMA_VERSION,
            });
        }

        if current < 1 {
            conn.execute_batch(SCHEMA_V1)?;
            conn.execute_batch("PRAGMA user_version = 1;")?;
            tracing::info!("Stats database migrated to schema v1");
        }

        Ok(())
    }

    pub async fn schema_version(&self) -> StoreResult<i64> {
        self.with_conn(|conn| Ok(conn.query_row("PRAGMA user_version", [], |row| row.get(0))?))
            .await
    }

    /// Run `f` against the connection on the blocking pool
    async fn with_conn<T, F>(&self, f: F) -> StoreResult<T>
    where
        F: FnOnce(&mut Connection) -> StoreResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let mut guard = conn
                .lock()
                .map_err(|_| StoreError::Task("stats connection mutex poisoned".to_string()))?;
            f(&mut *guard)
        })
        .await?
    }
}

#[async_trait]
impl StatsStore for SqliteStatsStore {
    async fn create_session(
        &self,
        channel_id: &str,
        theme: &str,
        max_rounds: u32,
        voting_time: u32,
    ) -> StoreResult<SessionId> {
        let session_id = ulid::Ulid::new().to_string();
        let channel_id = channel_id.to_string();
        let theme = theme.to_string();

        let id = session_id.clone();
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO sessions (session_id, channel_id, theme, max_rounds, voting_time, start_time)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![id, channel_id, theme, max_rounds, voting_time, now()],
            )?;
            Ok(())
        })
        .await?;

        Ok(session_id)
    }

    async fn end_session(
        &self,
        session_id: &str,
        winner_id: Option<&str>,
        participant_count: u32,
    ) -> StoreResult<()> {
        let session_id = session_id.to_string();
        let winner_id = winner_id.map(str::to_string);

        self.with_conn(move |conn| {
            conn.execute(
                "UPDATE sessions SET end_time = ?2, winner_id = ?3, total_participants = ?4
                 WHERE session_id = ?1",
                params![session_id, now(), winner_id, participant_count],
            )?;
            Ok(())
        })
        .await
    }

    async fn record_round(
        &self,
        session_id: &str,
        round_no: u32,
        option_a: &str,
        option_b: &str,
        votes_a: u32,
        votes_b: u32,
    ) -> StoreResult<()> {
        let session_id = session_id.to_string();
        let option_a = option_a.to_string();
        let option_b = option_b.to_string();
        let majority = Majority::from_counts(votes_a, votes_b).map(|m| m.as_str());

        self.with_conn(move |conn| {
            conn.execute(
                "INSERT OR REPLACE INTO rounds
                 (session_id, round_number, option_a, option_b, votes_a, votes_b, majority_option)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![session_id, round_no, option_a, option_b, votes_a, votes_b, majority],
            )?;
            Ok(())
        })
        .await
    }

    async fn record_vote(
        &self,
        session_id: &str,
        round_no: u32,
        voter_id: &str,
        username: &str,
        choice: Choice,
        was_majority: bool,
    ) -> StoreResult<()> {
        let session_id = session_id.to_string();
        let voter_id = voter_id.to_string();
        let username = username.to_string();

        self.with_conn(move |conn| {
            conn.execute(
                "INSERT OR REPLACE INTO votes
                 (session_id, round_number, voter_id, username, choice, was_majority)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    session_id,
                    round_no,
                    voter_id,
                    username,
                    choice.as_str(),
                    was_majority
                ],
            )?;
            Ok(())
        })
        .await
    }

    async fn record_round_votes(&self, session_id: &str, round: &RoundRecord) -> StoreResult<()> {
        let session_id = session_id.to_string();
        let round = round.clone();
        let majority = Majority::from_counts(round.votes_a, round.votes_b).map(|m| m.as_str());

        self.with_conn(move |conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT OR REPLACE INTO rounds
                 (session_id, round_number, option_a, option_b, votes_a, votes_b, majority_option)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    session_id,
                    round.round_no,
                    round.option_a,
                    round.option_b,
                    round.votes_a,
                    round.votes_b,
                    majority
                ],
            )?;
            {
                let mut stmt = tx.prepare(
                    "INSERT OR REPLACE INTO votes
                     (session_id, round_number, voter_id, username, choice, was_majority)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                )?;
                for vote in &round.votes {
                    stmt.execute(params![
                        session_id,
                        round.round_no,
                        vote.voter_id,
                        vote.username,
                        vote.choice.as_str(),
                        vote.was_majority
                    ])?;
                }
            }
            tx.commit()?;
            Ok(())
        })
        .await
    }

    async fn record_session_player(
        &self,
        session_id: &str,
        score: &PlayerSessionScore,
        rank: u32,
    ) -> StoreResult<()> {
        let session_id = session_id.to_string();
        let score = score.clone();

        self.with_conn(move |conn| {
            conn.execute(
                "INSERT OR REPLACE INTO session_players
                 (session_id, voter_id, username, correct_votes, total_votes, rank)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    session_id,
                    score.voter_id,
                    score.username,
                    score.correct_votes,
                    score.total_votes,
                    rank
                ],
            )?;
            Ok(())
        })
        .await
    }

    async fn update_lifetime_stats(
        &self,
        voter_id: &str,
        username: &str,
        wins_gained: u32,
        games_played: u32,
        rounds_played: u32,
    ) -> StoreResult<PlayerLifetimeStats> {
        let voter_id = voter_id.to_string();
        let username = username.to_string();

        self.with_conn(move |conn| {
            let tx = conn.transaction()?;

            let existing = tx
                .query_row(
                    &format!("SELECT {LIFETIME_COLUMNS} FROM lifetime_stats WHERE voter_id = ?1"),
                    params![voter_id],
                    lifetime_from_row,
                )
                .optional()?;

            let (total_wins, total_games, total_rounds) = match existing {
                Some(current) => (
                    current.total_wins + wins_gained,
                    current.total_games + games_played,
                    current.total_rounds + rounds_played,
                ),
                None => (wins_gained, games_played, rounds_played),
            };

            let stats = PlayerLifetimeStats {
                voter_id,
                username,
                total_wins,
                total_games,
                total_rounds,
                win_rate: win_rate(total_wins, total_rounds),
                last_played: now(),
            };

            tx.execute(
                "INSERT INTO lifetime_stats
                 (voter_id, username, total_wins, total_games, total_rounds, win_rate, last_played)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                 ON CONFLICT(voter_id) DO UPDATE SET
                    username = excluded.username,
                    total_wins = excluded.total_wins,
                    total_games = excluded.total_games,
                    total_rounds = excluded.total_rounds,
                    win_rate = excluded.win_rate,
                    last_played = excluded.last_played",
                params![
                    stats.voter_id,
                    stats.username,
                    stats.total_wins,
                    stats.total_games,
                    stats.total_rounds,
                    stats.win_rate,
                    stats.last_played
                ],
            )?;
            tx.commit()?;

            Ok(stats)
        })
        .await
    }

    async fn get_lifetime_stats(&self, voter_id: &str) -> StoreResult<Option<PlayerLifetimeStats>> {
        let voter_id = voter_id.to_string();

        self.with_conn(move |conn| {
            Ok(conn
                .query_row(
                    &format!("SELECT {LIFETIME_COLUMNS} FROM lifetime_stats WHERE voter_id = ?1"),
                    params![voter_id],
                    lifetime_from_row,
                )
                .optional()?)
        })
        .await
    }

    async fn get_leaderboard(&self, limit: u32) -> StoreResult<Vec<PlayerLifetimeStats>> {
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {LIFETIME_COLUMNS} FROM lifetime_stats
                 WHERE total_rounds > 0
                 ORDER BY win_rate DESC, total_wins DESC
                 LIMIT ?1"
            ))?;
            let rows = stmt.query_map(params![limit], lifetime_from_row)?;
            Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
        })
        .await
    }

    async fn get_recent_sessions(
        &self,
        voter_id: &str,
        limit: u32,
    ) -> StoreResult<Vec<PlayerSessionSummary>> {
        let voter_id = voter_id.to_string();

        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT s.session_id, s.channel_id, s.theme, s.start_time, s.end_time,
                        s.winner_id, s.total_participants,
                        sp.correct_votes, sp.total_votes, sp.rank
                 FROM session_players sp
                 JOIN sessions s ON s.session_id = sp.session_id
                 WHERE sp.voter_id = ?1
                 ORDER BY s.start_time DESC, s.rowid DESC
                 LIMIT ?2",
            )?;
            let rows = stmt.query_map(params![voter_id, limit], |row| {
                Ok(PlayerSessionSummary {
                    session_id: row.get(0)?,
                    channel_id: row.get(1)?,
                    theme: row.get(2)?,
                    started_at: row.get(3)?,
                    ended_at: row.get(4)?,
                    winner_id: row.get(5)?,
                    total_participants: row.get(6)?,
                    correct_votes: row.get(7)?,
                    total_votes: row.get(8)?,
                    rank: row.get(9)?,
                })
            })?;
            Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
        })
        .await
    }

    async fn get_session(&self, session_id: &str) -> StoreResult<Option<SessionRecord>> {
        let session_id = session_id.to_string();

        self.with_conn(move |conn| {
            Ok(conn
                .query_row(
                    "SELECT session_id, channel_id, theme, max_rounds, voting_time,
                            start_time, end_time, winner_id, total_participants
                     FROM sessions WHERE session_id = ?1",
                    params![session_id],
                    |row| {
                        Ok(SessionRecord {
                            session_id: row.get(0)?,
                            channel_id: row.get(1)?,
                            theme: row.get(2)?,
                            max_rounds: row.get(3)?,
                            voting_time: row.get(4)?,
                            started_at: row.get(5)?,
                            ended_at: row.get(6)?,
                            winner_id: row.get(7)?,
                            total_participants: row.get(8)?,
                        })
                    },
                )
                .optional()?)
        })
        .await
    }
}

/// Stored round row, used by history checks
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredRound {
    pub round_no: u32,
    pub option_a: String,
    pub option_b: String,
    pub votes_a: u32,
    pub votes_b: u32,
    pub majority: Option<Majority>,
}

/// Stored vote row, used by history checks
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredVote {
    pub round_no: u32,
    pub voter_id: String,
    pub username: String,
    pub choice: Choice,
    pub was_majority: bool,
}

impl SqliteStatsStore {
    /// All rounds of a session in play order
    pub async fn session_rounds(&self, session_id: &str) -> StoreResult<Vec<StoredRound>> {
        let session_id = session_id.to_string();

        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT round_number, option_a, option_b, votes_a, votes_b, majority_option
                 FROM rounds WHERE session_id = ?1 ORDER BY round_number",
            )?;
            let rows = stmt.query_map(params![session_id], |row| {
                let majority: Option<String> = row.get(5)?;
                Ok(StoredRound {
                    round_no: row.get(0)?,
                    option_a: row.get(1)?,
                    option_b: row.get(2)?,
                    votes_a: row.get(3)?,
                    votes_b: row.get(4)?,
                    majority: majority.as_deref().and_then(Majority::parse),
                })
            })?;
            Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
        })
        .await
    }

    /// All votes of a session ordered by round then voter
    pub async fn session_votes(&self, session_id: &str) -> StoreResult<Vec<StoredVote>> {
        let session_id = session_id.to_string();

        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT round_number, voter_id, username, choice, was_majority
                 FROM votes WHERE session_id = ?1 ORDER BY round_number, voter_id",
            )?;
            let rows = stmt.query_map(params![session_id], |row| {
                let raw_choice: String = row.get(3)?;
                let choice = Choice::parse(&raw_choice).ok_or_else(|| {
                    rusqlite::Error::FromSqlConversionFailure(
                        3,
                        rusqlite::types::Type::Text,
                        format!("invalid choice {:?}", raw_choice).into(),
                    )
                })?;
                Ok(StoredVote {
                    round_no: row.get(0)?,
                    voter_id: row.get(1)?,
                    username: row.get(2)?,
                    choice,
                    was_majority: row.get(4)?,
                })
            })?;
            Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::RoundVote;

    fn store() -> SqliteStatsStore {
        SqliteStatsStore::open_in_memory().unwrap()
    }

    #[tokio::test]
    async fn test_schema_is_current() {
        let store = store();
        assert_eq!(store.schema_version().await.unwrap(), SCHEMA_VERSION);
    }

    #[tokio::test]
    async fn test_session_lifecycle() {
        let store = store();
        let id = store.create_session("chan", "general", 5, 10).await.unwrap();

        let session = store.get_session(&id).await.unwrap().unwrap();
        assert_eq!(session.channel_id, "chan");
        assert_eq!(session.max_rounds, 5);
        assert!(session.ended_at.is_none());

        store.end_session(&id, Some("v1"), 3).await.unwrap();
        let session = store.get_session(&id).await.unwrap().unwrap();
        assert_eq!(session.winner_id.as_deref(), Some("v1"));
        assert_eq!(session.total_participants, 3);
        assert!(session.ended_at.is_some());

        assert!(store.get_session("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_rounds_store_derived_majority() {
        let store = store();
        let id = store.create_session("chan", "general", 3, 10).await.unwrap();

        store.record_round(&id, 1, "Cats", "Dogs", 2, 1).await.unwrap();
        store.record_round(&id, 2, "Tea", "Coffee", 1, 1).await.unwrap();
        store.record_round(&id, 3, "Sea", "Lake", 0, 0).await.unwrap();

        let rounds = store.session_rounds(&id).await.unwrap();
        let majorities: Vec<_> = rounds.iter().map(|r| r.majority).collect();
        assert_eq!(majorities, vec![Some(Majority::A), Some(Majority::Tie), None]);
        assert_eq!(rounds[0].option_b, "Dogs");
    }

    #[tokio::test]
    async fn test_votes_are_recorded() {
        let store = store();
        let id = store.create_session("chan", "general", 1, 10).await.unwrap();

        store
            .record_vote(&id, 1, "v1", "Alice", Choice::A, true)
            .await
            .unwrap();
        store
            .record_vote(&id, 1, "v2", "Bob", Choice::B, false)
            .await
            .unwrap();

        let votes = store.session_votes(&id).await.unwrap();
        assert_eq!(votes.len(), 2);
        assert_eq!(votes[1].choice, Choice::B);
        assert!(votes[0].was_majority);
        assert!(!votes[1].was_majority);
    }

    fn round_record(round_no: u32, votes: &[(&str, Choice, bool)]) -> RoundRecord {
        let votes: Vec<RoundVote> = votes
            .iter()
            .map(|(voter, choice, was_majority)| RoundVote {
                voter_id: voter.to_string(),
                username: voter.to_uppercase(),
                choice: *choice,
                was_majority: *was_majority,
            })
            .collect();
        RoundRecord {
            round_no,
            option_a: "Sun".to_string(),
            option_b: "Moon".to_string(),
            votes_a: votes.iter().filter(|v| v.choice == Choice::A).count() as u32,
            votes_b: votes.iter().filter(|v| v.choice == Choice::B).count() as u32,
            votes,
        }
    }

    #[tokio::test]
    async fn test_round_with_votes_written_together() {
        let store = store();
        let id = store.create_session("chan", "general", 2, 10).await.unwrap();

        let round = round_record(
            1,
            &[("v1", Choice::B, true), ("v2", Choice::B, true), ("v3", Choice::A, false)],
        );
        store.record_round_votes(&id, &round).await.unwrap();

        let rounds = store.session_rounds(&id).await.unwrap();
        assert_eq!(rounds.len(), 1);
        assert_eq!((rounds[0].votes_a, rounds[0].votes_b), (1, 2));
        assert_eq!(rounds[0].majority, Some(Majority::B));

        let votes = store.session_votes(&id).await.unwrap();
        assert_eq!(votes.len(), 3);
        assert_eq!(votes[2].username, "V3");
        assert!(!votes[2].was_majority);
    }

    #[tokio::test]
    async fn test_round_with_votes_rolls_back_on_failure() {
        let store = store();
        let id = store.create_session("chan", "general", 2, 10).await.unwrap();

        // reject one ballot so the batch fails after the round row went in
        store
            .with_conn(|conn| {
                conn.execute_batch("CREATE TRIGGER fail_votes BEFORE INSERT ON votes
                     WHEN NEW.voter_id = 'bad'
                     BEGIN SELECT RAISE(ABORT, 'rejected'); END;")?;
                Ok(())
            })
            .await
            .unwrap();

        let round = round_record(1, &[("v1", Choice::A, true), ("bad", Choice::A, true)]);
        assert!(store.record_round_votes(&id, &round).await.is_err());

        assert!(store.session_rounds(&id).await.unwrap().is_empty());
        assert!(store.session_votes(&id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_vote_for_unknown_session_fails() {
        let store = store();
        let result = store
            .record_vote("nope", 1, "v1", "Alice", Choice::A, true)
            .await;
        assert!(matches!(result, Err(StoreError::Sqlite(_))));
    }

    #[tokio::test]
    async fn test_lifetime_stats_accumulate() {
        let store = store();

        let first = store
            .update_lifetime_stats("v1", "Alice", 2, 1, 3)
            .await
            .unwrap();
        assert_eq!(first.total_wins, 2);
        assert!((first.win_rate - 2.0 / 3.0).abs() < 1e-9);

        let second = store
            .update_lifetime_stats("v1", "Alice2", 1, 1, 1)
            .await
            .unwrap();
        assert_eq!(second.total_wins, 3);
        assert_eq!(second.total_games, 2);
        assert_eq!(second.total_rounds, 4);
        assert_eq!(second.win_rate, 0.75);
        assert_eq!(second.username, "Alice2");

        let loaded = store.get_lifetime_stats("v1").await.unwrap().unwrap();
        assert_eq!(loaded, second);
        assert!(store.get_lifetime_stats("v2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_lifetime_stats_zero_rounds() {
        let store = store();
        let stats = store
            .update_lifetime_stats("v1", "Alice", 0, 1, 0)
            .await
            .unwrap();
        assert_eq!(stats.win_rate, 0.0);
        assert_eq!(stats.total_games, 1);
    }

    #[tokio::test]
    async fn test_lifetime_stats_never_decrease() {
        let store = store();
        let mut previous = (0, 0, 0);
        for (wins, rounds) in [(1, 2), (0, 3), (0, 0), (4, 4)] {
            let stats = store
                .update_lifetime_stats("v1", "Alice", wins, 1, rounds)
                .await
                .unwrap();
            assert!(stats.total_wins >= previous.0);
            assert!(stats.total_games > previous.1);
            assert!(stats.total_rounds >= previous.2);
            assert_eq!(stats.win_rate, win_rate(stats.total_wins, stats.total_rounds));
            previous = (stats.total_wins, stats.total_games, stats.total_rounds);
        }
    }

    #[tokio::test]
    async fn test_leaderboard_order_and_filter() {
        let store = store();
        store.update_lifetime_stats("half", "Half", 2, 1, 4).await.unwrap();
        store.update_lifetime_stats("full", "Full", 1, 1, 1).await.unwrap();
        store.update_lifetime_stats("full2", "Full2", 3, 1, 3).await.unwrap();
        store.update_lifetime_stats("idle", "Idle", 0, 1, 0).await.unwrap();

        let board = store.get_leaderboard(10).await.unwrap();
        let ids: Vec<_> = board.iter().map(|s| s.voter_id.as_str()).collect();
        assert_eq!(ids, vec!["full2", "full", "half"]);

        let top = store.get_leaderboard(1).await.unwrap();
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].voter_id, "full2");
    }

    #[tokio::test]
    async fn test_recent_sessions_newest_first() {
        let store = store();
        let mut ids = Vec::new();
        for theme in ["first", "second", "third"] {
            let id = store.create_session("chan", theme, 2, 10).await.unwrap();
            let score = PlayerSessionScore {
                voter_id: "v1".to_string(),
                username: "Alice".to_string(),
                correct_votes: 1,
                total_votes: 2,
            };
            store.record_session_player(&id, &score, 2).await.unwrap();
            store.end_session(&id, Some("v9"), 2).await.unwrap();
            ids.push(id);
        }

        let recent = store.get_recent_sessions("v1", 2).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].session_id, ids[2]);
        assert_eq!(recent[0].theme, "third");
        assert_eq!(recent[1].theme, "second");
        assert_eq!(recent[0].rank, Some(2));
        assert_eq!(recent[0].winner_id.as_deref(), Some("v9"));

        assert!(store.get_recent_sessions("nobody", 5).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_file_database_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("stats.db");

        {
            let store = SqliteStatsStore::open(&path).unwrap();
            store.update_lifetime_stats("v1", "Alice", 1, 1, 2).await.unwrap();
        }

        let store = SqliteStatsStore::open(&path).unwrap();
        let stats = store.get_lifetime_stats("v1").await.unwrap().unwrap();
        assert_eq!(stats.total_rounds, 2);
        assert_eq!(store.schema_version().await.unwrap(), SCHEMA_VERSION);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_sessions_write_independently() {
        let store = Arc::new(store());
        let mut handles = Vec::new();

        for n in 0..8 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                let id = store
                    .create_session(&format!("chan{}", n), "general", 3, 10)
                    .await
                    .unwrap();
                for round in 1..=3 {
                    store.record_round(&id, round, "A", "B", 1, 0).await.unwrap();
                    store
                        .record_vote(&id, round, "shared", "Shared", Choice::A, true)
                        .await
                        .unwrap();
                }
                store
                    .update_lifetime_stats("shared", "Shared", 3, 1, 3)
                    .await
                    .unwrap();
                id
            }));
        }

        for handle in handles {
            let id = handle.await.unwrap();
            assert_eq!(store.session_rounds(&id).await.unwrap().len(), 3);
        }

        let stats = store.get_lifetime_stats("shared").await.unwrap().unwrap();
        assert_eq!(stats.total_games, 8);
        assert_eq!(stats.total_rounds, 24);
    }
}
