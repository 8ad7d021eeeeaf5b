use indexmap::{IndexMap, IndexSet};

use super::vote::VoteSnapshot;
use crate::types::{Majority, PlayerSessionScore, Standing, VoterId};

/// Outcome of closing one round's vote window
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundTally {
    pub votes_a: u32,
    pub votes_b: u32,
    /// None when nobody voted
    pub majority: Option<Majority>,
    /// Voters credited with a correct pick (both sides on a tie)
    pub scorers: IndexSet<VoterId>,
}

impl RoundTally {
    pub fn from_snapshot(snapshot: &VoteSnapshot) -> Self {
        let votes_a = snapshot.votes_a.len() as u32;
        let votes_b = snapshot.votes_b.len() as u32;

        let majority = Majority::from_counts(votes_a, votes_b);
        let scorers: IndexSet<VoterId> = match majority {
            None => IndexSet::new(),
            Some(Majority::A) => snapshot.votes_a.clone(),
            Some(Majority::B) => snapshot.votes_b.clone(),
            // both sides, in first-vote order
            Some(Majority::Tie) => snapshot.raw.keys().cloned().collect(),
        };

        Self {
            votes_a,
            votes_b,
            majority,
            scorers,
        }
    }

    pub fn is_scorer(&self, voter_id: &str) -> bool {
        self.scorers.contains(voter_id)
    }
}

/// Running per-session scores, kept in first-seen order
#[derive(Debug, Clone, Default)]
pub struct Scoreboard {
    players: IndexMap<VoterId, PlayerSessionScore>,
}

impl Scoreboard {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub(crate) fn len(&self) -> usize {
        self.players.len()
    }

    #[cfg(test)]
    pub fn get(&self, voter_id: &str) -> Option<&PlayerSessionScore> {
        self.players.get(voter_id)
    }

    /// Credit every voter of the round and every scorer
    pub fn apply(&mut self, snapshot: &VoteSnapshot, tally: &RoundTally) {
        for (voter_id, ballot) in &snapshot.raw {
            let score = self
                .players
                .entry(voter_id.clone())
                .or_insert_with(|| PlayerSessionScore {
                    voter_id: voter_id.clone(),
                    username: ballot.username.clone(),
                    correct_votes: 0,
                    total_votes: 0,
                });
            score.username = ballot.username.clone();
            score.total_votes += 1;
            if tally.is_scorer(voter_id) {
                score.correct_votes += 1;
            }
        }
    }

    /// Sorted by correct votes then total votes, both descending.
    /// Equal players keep first-seen order.
    pub fn ranking(&self) -> Vec<PlayerSessionScore> {
        let mut ranked: Vec<PlayerSessionScore> = self.players.values().cloned().collect();
        ranked.sort_by(|a, b| {
            b.correct_votes
                .cmp(&a.correct_votes)
                .then(b.total_votes.cmp(&a.total_votes))
        });
        ranked
    }

    pub fn top(&self, n: usize) -> Vec<PlayerSessionScore> {
        self.ranking().into_iter().take(n).collect()
    }

    pub fn standings(&self) -> Vec<Standing> {
        self.ranking()
            .into_iter()
            .enumerate()
            .map(|(i, score)| Standing {
                rank: i as u32 + 1,
                accuracy: score.accuracy(),
                voter_id: score.voter_id,
                username: score.username,
                correct_votes: score.correct_votes,
                total_votes: score.total_votes,
            })
            .collect()
    }
}
