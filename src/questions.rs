//! Matchup content consumed by the engine.
//!
//! Questions are grouped by theme. A session asks its theme's bank for a pool
//! filtered by the host's excluded tags, then draws one matchup per round.

use rand::seq::IndexedRandom;
use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use crate::error::SessionError;
use crate::types::Matchup;

/// Errors raised while loading question content
#[derive(Debug, thiserror::Error)]
pub enum QuestionLoadError {
    #[error("failed to read questions file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse questions file: {0}")]
    Parse(#[from] serde_json::Error),
}

fn normalize_tag(tag: &str) -> String {
    tag.trim().to_lowercase()
}

/// All matchups for a single theme
#[derive(Debug, Clone, Default)]
pub struct QuestionBank {
    matchups: Vec<Matchup>,
}

impl QuestionBank {
    pub fn new(matchups: Vec<Matchup>) -> Self {
        Self { matchups }
    }

    pub fn len(&self) -> usize {
        self.matchups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matchups.is_empty()
    }

    /// Matchups whose option tags avoid every excluded tag.
    ///
    /// Falls back to the full bank when the exclusions would leave nothing.
    pub fn filter(&self, excluded_tags: &HashSet<String>) -> Vec<Matchup> {
        let excluded: Vec<String> = excluded_tags
            .iter()
            .map(|t| normalize_tag(t))
            .filter(|t| !t.is_empty())
            .collect();

        if excluded.is_empty() {
            return self.matchups.clone();
        }

        let is_excluded = |tag: &Option<String>| {
            tag.as_deref()
                .map(normalize_tag)
                .is_some_and(|tag| excluded.iter().any(|ex| tag.contains(ex.as_str())))
        };

        let pool: Vec<Matchup> = self
            .matchups
            .iter()
            .filter(|m| !is_excluded(&m.tag_a) && !is_excluded(&m.tag_b))
            .cloned()
            .collect();

        if pool.is_empty() {
            tracing::info!(
                excluded = ?excluded,
                "Excluded tags removed every matchup, using the full pool"
            );
            return self.matchups.clone();
        }

        pool
    }

    /// Uniform draw; earlier picks are not excluded
    pub fn pick_random(pool: &[Matchup]) -> Option<&Matchup> {
        pool.choose(&mut rand::rng())
    }
}

/// Theme tag -> question bank
#[derive(Debug, Clone, Default)]
pub struct QuestionLibrary {
    themes: BTreeMap<String, QuestionBank>,
}

impl QuestionLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, theme: impl Into<String>, bank: QuestionBank) {
        self.themes.insert(normalize_tag(&theme.into()), bank);
    }

    pub fn theme(&self, theme: &str) -> Option<&QuestionBank> {
        self.themes.get(&normalize_tag(theme))
    }

    /// Theme names with their matchup counts
    pub fn themes(&self) -> Vec<(String, usize)> {
        self.themes
            .iter()
            .map(|(name, bank)| (name.clone(), bank.len()))
            .collect()
    }

    /// Resolve the filtered pool for a new session
    pub fn pool_for(
        &self,
        theme: &str,
        excluded_tags: &[String],
    ) -> Result<Vec<Matchup>, SessionError> {
        let bank = self
            .theme(theme)
            .ok_or_else(|| SessionError::UnknownTheme(theme.to_string()))?;
        if bank.is_empty() {
            return Err(SessionError::EmptyQuestionPool(theme.to_string()));
        }

        let excluded: HashSet<String> = excluded_tags.iter().cloned().collect();
        Ok(bank.filter(&excluded))
    }

    pub fn from_json(json: &str) -> Result<Self, QuestionLoadError> {
        let raw: BTreeMap<String, Vec<Matchup>> = serde_json::from_str(json)?;
        let mut library = Self::new();
        for (theme, matchups) in raw {
            library.insert(theme, QuestionBank::new(matchups));
        }
        Ok(library)
    }

    pub async fn load(path: impl AsRef<Path>) -> Result<Self, QuestionLoadError> {
        let json = tokio::fs::read_to_string(path).await?;
        Self::from_json(&json)
    }
}
