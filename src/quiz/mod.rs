pub mod content;
pub mod memory;
pub mod session;
pub mod shuffle;
pub mod stats;
pub mod timer;

pub use content::Content;
pub use session::{Advance, Phase, Quiz, QuizSettings, Tick};

/// Difficulty tier of a question. Determines its time limit and its place in the session order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    /// Order in which the tiers are played.
    pub const PROGRESSION: [Difficulty; 3] = [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard];

    pub fn label(&self) -> &'static str {
        match self {
            Difficulty::Easy => "Fácil",
            Difficulty::Medium => "Média",
            Difficulty::Hard => "Difícil",
        }
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Question {
    pub id: u32,
    pub text: String,
    pub options: Vec<String>,
    pub correct_index: usize,
    pub difficulty: Difficulty,
    pub explanation: String,
    #[serde(default)]
    pub media_ref: Option<String>,
}

impl Question {
    pub fn correct_option(&self) -> &str {
        &self.options[self.correct_index]
    }
}

/// A question as presented in one session: options permuted, correct index remapped.
#[derive(Debug, Clone, PartialEq)]
pub struct ShuffledQuestion {
    pub question: Question,
    pub presented_options: Vec<String>,
    pub presented_correct_index: usize,
}

impl ShuffledQuestion {
    pub fn is_correct(&self, answer: Answer) -> bool {
        answer == Answer::Chosen(self.presented_correct_index)
    }

    pub fn difficulty(&self) -> Difficulty {
        self.question.difficulty
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct MemoryPair {
    pub id: u32,
    pub left: String,
    pub right: String,
}

/// What the player did with a question.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Answer {
    Chosen(usize),
    /// The countdown ran out. Never equal to any chosen option.
    TimedOut,
}
