use std::env;
use std::path::PathBuf;

use crate::quiz::session::TimeLimits;
use crate::quiz::QuizSettings;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name} must be a positive number of seconds, got {value:?}")]
    InvalidSeconds { name: &'static str, value: String },
}

/// Runtime configuration read from the environment (and `.env`, if present).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub settings: QuizSettings,
    /// Directory with `questions.json` and `memory_games.json` replacing the bundled content.
    pub content_dir: Option<PathBuf>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = QuizSettings::default();
        let seconds = |name: &'static str, default: u32| -> Result<u32, ConfigError> {
            match lookup(name) {
                None => Ok(default),
                Some(value) => match value.trim().parse::<u32>() {
                    Ok(seconds) if seconds > 0 => Ok(seconds),
                    _ => Err(ConfigError::InvalidSeconds { name, value }),
                },
            }
        };

        let time_limits = TimeLimits {
            easy: seconds("QUIZ_EASY_SECONDS", defaults.time_limits.easy)?,
            medium: seconds("QUIZ_MEDIUM_SECONDS", defaults.time_limits.medium)?,
            hard: seconds("QUIZ_HARD_SECONDS", defaults.time_limits.hard)?,
        };
        let mini_game_seconds = seconds("QUIZ_MINI_GAME_SECONDS", defaults.mini_game_seconds)?;

        Ok(Self {
            settings: QuizSettings {
                time_limits,
                mini_game_seconds,
                ..defaults
            },
            content_dir: lookup("QUIZ_CONTENT_DIR")
                .filter(|dir| !dir.trim().is_empty())
                .map(PathBuf::from),
        })
    }
}
