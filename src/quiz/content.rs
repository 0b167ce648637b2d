use std::collections::HashSet;
use std::fs::File;
use std::path::Path;

use crate::quiz::{Difficulty, MemoryPair, Question};

const QUESTIONS_JSON: &str = include_str!("../../assets/questions.json");
const MEMORY_GAMES_JSON: &str = include_str!("../../assets/memory_games.json");

pub const OPTIONS_PER_QUESTION: usize = 4;

#[derive(Debug, thiserror::Error)]
pub enum ContentError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("malformed content: {0}")]
    Json(#[from] serde_json::Error),
    #[error("question {id} has {found} options, expected {}", OPTIONS_PER_QUESTION)]
    OptionCount { id: u32, found: usize },
    #[error("question {id} marks option {index} as correct but has only {len} options")]
    CorrectIndexOutOfBounds { id: u32, index: usize, len: usize },
    #[error("question {id} repeats the option {option:?}")]
    DuplicateOption { id: u32, option: String },
    #[error("question id {0} is used more than once")]
    DuplicateQuestionId(u32),
    #[error("there are no {0:?} questions")]
    EmptyTier(Difficulty),
    #[error("memory game {name:?} has no pairs")]
    EmptyMemoryGame { name: String },
    #[error("memory game {name:?} repeats {text:?}")]
    DuplicateMemoryTerm { name: String, text: String },
    #[error("mini-game schedule {schedule:?} does not fit {questions} questions")]
    ScheduleOutOfRange { schedule: Vec<usize>, questions: usize },
    #[error("mini-game schedule needs {needed} memory games but only {available} exist")]
    NotEnoughMemoryGames { needed: usize, available: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct MemoryGameSet {
    pub name: String,
    pub pairs: Vec<MemoryPair>,
}

/// The fixed question list and memory game sets a session is built from.
#[derive(Debug, Clone, PartialEq)]
pub struct Content {
    pub questions: Vec<Question>,
    pub memory_games: Vec<MemoryGameSet>,
}

impl Content {
    /// Content bundled into the binary.
    pub fn builtin() -> Result<Self, ContentError> {
        Self::from_json(QUESTIONS_JSON, MEMORY_GAMES_JSON)
    }

    /// Loads `questions.json` and `memory_games.json` from `dir`.
    pub fn from_dir(dir: &Path) -> Result<Self, ContentError> {
        let questions: Vec<Question> = serde_json::from_reader(open(&dir.join("questions.json"))?)?;
        let memory_games: Vec<MemoryGameSet> =
            serde_json::from_reader(open(&dir.join("memory_games.json"))?)?;
        Self::new(questions, memory_games)
    }

    pub fn from_json(questions: &str, memory_games: &str) -> Result<Self, ContentError> {
        Self::new(serde_json::from_str(questions)?, serde_json::from_str(memory_games)?)
    }

    pub fn new(questions: Vec<Question>, memory_games: Vec<MemoryGameSet>) -> Result<Self, ContentError> {
        let content = Self {
            questions,
            memory_games,
        };
        content.validate()?;
        Ok(content)
    }

    fn validate(&self) -> Result<(), ContentError> {
        let mut ids = HashSet::new();
        for question in &self.questions {
            if !ids.insert(question.id) {
                return Err(ContentError::DuplicateQuestionId(question.id));
            }
            if question.options.len() != OPTIONS_PER_QUESTION {
                return Err(ContentError::OptionCount {
                    id: question.id,
                    found: question.options.len(),
                });
            }
            if question.correct_index >= question.options.len() {
                return Err(ContentError::CorrectIndexOutOfBounds {
                    id: question.id,
                    index: question.correct_index,
                    len: question.options.len(),
                });
            }
            // the option shuffle finds the correct answer again by its text
            if let Some(option) = first_duplicate(question.options.iter().map(String::as_str)) {
                return Err(ContentError::DuplicateOption {
                    id: question.id,
                    option: option.to_string(),
                });
            }
        }

        for tier in Difficulty::PROGRESSION {
            if self.tier_size(tier) == 0 {
                return Err(ContentError::EmptyTier(tier));
            }
        }

        for game in &self.memory_games {
            if game.pairs.is_empty() {
                return Err(ContentError::EmptyMemoryGame {
                    name: game.name.clone(),
                });
            }
            let duplicate = first_duplicate(game.pairs.iter().map(|p| p.left.as_str()))
                .or_else(|| first_duplicate(game.pairs.iter().map(|p| p.right.as_str())));
            if let Some(text) = duplicate {
                return Err(ContentError::DuplicateMemoryTerm {
                    name: game.name.clone(),
                    text: text.to_string(),
                });
            }
        }

        Ok(())
    }

    /// Checks a mini-game schedule (1-based question counts) against this content.
    ///
    /// The schedule is not derived from the tier sizes. Changing the number of
    /// questions per tier means changing the schedule as well.
    pub fn validate_schedule(&self, schedule: &[usize]) -> Result<(), ContentError> {
        let increasing = schedule.windows(2).all(|w| w[0] < w[1]);
        let in_range = schedule
            .iter()
            .all(|&after| after >= 1 && after <= self.questions.len());
        if !increasing || !in_range {
            return Err(ContentError::ScheduleOutOfRange {
                schedule: schedule.to_vec(),
                questions: self.questions.len(),
            });
        }
        if schedule.len() > self.memory_games.len() {
            return Err(ContentError::NotEnoughMemoryGames {
                needed: schedule.len(),
                available: self.memory_games.len(),
            });
        }
        Ok(())
    }

    pub fn tier_size(&self, tier: Difficulty) -> usize {
        self.questions.iter().filter(|q| q.difficulty == tier).count()
    }
}

fn open(path: &Path) -> Result<File, ContentError> {
    File::open(path).map_err(|source| ContentError::Io {
        path: path.display().to_string(),
        source,
    })
}

fn first_duplicate<'a>(items: impl Iterator<Item = &'a str>) -> Option<&'a str> {
    let mut seen = HashSet::new();
    items.into_iter().find(|item| !seen.insert(*item))
}
