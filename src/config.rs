use std::path::PathBuf;
use std::time::Duration;

/// Fixed delays around the voting windows
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineTimings {
    /// Pre-game delay after the lobby is shown
    pub countdown: Duration,
    /// Break between a round result and the next prompt
    pub pause: Duration,
    /// Countdown render granularity
    pub tick: Duration,
}

impl Default for EngineTimings {
    fn default() -> Self {
        Self {
            countdown: Duration::from_secs(15),
            pause: Duration::from_secs(3),
            tick: Duration::from_secs(1),
        }
    }
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// SQLite database file
    pub db_path: PathBuf,
    /// Question library JSON file
    pub questions_path: PathBuf,
    pub bind_addr: String,
    pub timings: EngineTimings,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("data/thisorthat.db"),
            questions_path: PathBuf::from("data/questions.json"),
            bind_addr: "0.0.0.0:6574".to_string(),
            timings: EngineTimings::default(),
        }
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    std::env::var(key).ok().and_then(|value| {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    })
}

fn secs_var(key: &str) -> Option<Duration> {
    non_empty_var(key)
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_secs)
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let timings = EngineTimings {
            countdown: secs_var("THISORTHAT_COUNTDOWN_SECS").unwrap_or(defaults.timings.countdown),
            pause: secs_var("THISORTHAT_PAUSE_SECS").unwrap_or(defaults.timings.pause),
            tick: defaults.timings.tick,
        };

        let config = Self {
            db_path: non_empty_var("THISORTHAT_DB_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.db_path),
            questions_path: non_empty_var("THISORTHAT_QUESTIONS_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.questions_path),
            bind_addr: non_empty_var("THISORTHAT_BIND").unwrap_or(defaults.bind_addr),
            timings,
        };

        tracing::info!(
            db_path = %config.db_path.display(),
            questions_path = %config.questions_path.display(),
            bind = %config.bind_addr,
            countdown_secs = config.timings.countdown.as_secs(),
            pause_secs = config.timings.pause.as_secs(),
            "Config loaded"
        );

        config
    }
}
