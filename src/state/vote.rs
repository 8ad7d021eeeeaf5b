//! Per-round ballot box.
//!
//! `submit` and `snapshot_and_close` share one mutex, so a vote is either in
//! the snapshot or rejected. Nothing is accepted after the window closes.

use indexmap::{IndexMap, IndexSet};
use tokio::sync::Mutex;

use crate::types::{Choice, VoterId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ballot {
    pub username: String,
    pub choice: Choice,
}

/// Votes captured when a window closes.
///
/// Iteration order is the order voters first voted in this round.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VoteSnapshot {
    pub round_no: u32,
    pub votes_a: IndexSet<VoterId>,
    pub votes_b: IndexSet<VoterId>,
    pub raw: IndexMap<VoterId, Ballot>,
}

#[derive(Debug, Default)]
struct Window {
    round_no: u32,
    open: bool,
    ballots: IndexMap<VoterId, Ballot>,
}

#[derive(Debug, Default)]
pub struct VoteCollector {
    window: Mutex<Window>,
}

impl VoteCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a fresh window for `round_no`, dropping anything left over
    pub async fn open(&self, round_no: u32) {
        let mut window = self.window.lock().await;
        window.round_no = round_no;
        window.open = true;
        window.ballots.clear();
    }

    #[cfg(test)]
    pub async fn is_open(&self) -> bool {
        self.window.lock().await.open
    }

    /// Record or overwrite a voter's choice. Returns false when closed.
    pub async fn submit(&self, voter_id: &str, username: &str, choice: Choice) -> bool {
        let mut window = self.window.lock().await;
        if !window.open {
            return false;
        }

        window.ballots.insert(
            voter_id.to_string(),
            Ballot {
                username: username.to_string(),
                choice,
            },
        );
        true
    }

    /// Close the window and hand back everything accepted so far
    pub async fn snapshot_and_close(&self) -> VoteSnapshot {
        let mut window = self.window.lock().await;
        window.open = false;
        let raw = std::mem::take(&mut window.ballots);

        let mut snapshot = VoteSnapshot {
            round_no: window.round_no,
            ..VoteSnapshot::default()
        };
        for (voter_id, ballot) in &raw {
            match ballot.choice {
                Choice::A => snapshot.votes_a.insert(voter_id.clone()),
                Choice::B => snapshot.votes_b.insert(voter_id.clone()),
            };
        }
        snapshot.raw = raw;
        snapshot
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_submit_rejected_before_open() {
        let collector = VoteCollector::new();
        assert!(!collector.submit("v1", "Alice", Choice::A).await);

        let snapshot = collector.snapshot_and_close().await;
        assert!(snapshot.raw.is_empty());
    }

    #[tokio::test]
    async fn test_revote_keeps_last_choice() {
        let collector = VoteCollector::new();
        collector.open(1).await;

        assert!(collector.submit("v1", "Alice", Choice::A).await);
        assert!(collector.submit("v1", "Alice", Choice::B).await);
        assert!(collector.submit("v1", "Alice", Choice::A).await);

        let snapshot = collector.snapshot_and_close().await;
        assert_eq!(snapshot.raw.len(), 1);
        assert_eq!(snapshot.votes_a.len(), 1);
        assert!(snapshot.votes_b.is_empty());
        assert_eq!(snapshot.raw["v1"].choice, Choice::A);
    }

    #[tokio::test]
    async fn test_revote_moves_voter_between_sides() {
        let collector = VoteCollector::new();
        collector.open(3).await;

        collector.submit("v1", "Alice", Choice::A).await;
        collector.submit("v2", "Bob", Choice::A).await;
        collector.submit("v1", "Alice", Choice::B).await;

        let snapshot = collector.snapshot_and_close().await;
        assert_eq!(snapshot.round_no, 3);
        assert!(snapshot.votes_a.contains("v2"));
        assert!(snapshot.votes_b.contains("v1"));
        assert!(!snapshot.votes_a.contains("v1"));
        // first-vote order is kept across re-votes
        let order: Vec<_> = snapshot.raw.keys().cloned().collect();
        assert_eq!(order, vec!["v1".to_string(), "v2".to_string()]);
    }

    #[tokio::test]
    async fn test_no_votes_after_close() {
        let collector = VoteCollector::new();
        collector.open(1).await;
        collector.submit("v1", "Alice", Choice::A).await;

        let snapshot = collector.snapshot_and_close().await;
        assert_eq!(snapshot.raw.len(), 1);
        assert!(!collector.is_open().await);
        assert!(!collector.submit("v2", "Bob", Choice::B).await);

        // reopening starts from an empty box
        collector.open(2).await;
        let snapshot = collector.snapshot_and_close().await;
        assert!(snapshot.raw.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_submits_are_never_lost() {
        let collector = Arc::new(VoteCollector::new());
        collector.open(1).await;

        let mut handles = Vec::new();
        for i in 0..200 {
            let collector = collector.clone();
            handles.push(tokio::spawn(async move {
                let choice = if i % 3 == 0 { Choice::B } else { Choice::A };
                let accepted = collector
                    .submit(&format!("v{}", i), &format!("user{}", i), choice)
                    .await;
                (format!("v{}", i), accepted)
            }));
        }

        // close while submits are still landing
        let snapshot = collector.snapshot_and_close().await;

        for handle in handles {
            let (voter_id, accepted) = handle.await.unwrap();
            assert_eq!(
                accepted,
                snapshot.raw.contains_key(&voter_id),
                "voter {} accepted={} but snapshot disagrees",
                voter_id,
                accepted
            );
        }
        assert_eq!(
            snapshot.votes_a.len() + snapshot.votes_b.len(),
            snapshot.raw.len()
        );
    }
}
