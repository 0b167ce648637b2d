use crate::quiz::session::SessionState;
use crate::quiz::Difficulty;

/// Summary of a session, derived from its answers and mini-game scores.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct GameStats {
    pub total_questions: usize,
    pub correct_answers: u32,
    pub easy_correct: u32,
    pub medium_correct: u32,
    pub hard_correct: u32,
    pub mini_game_scores: Vec<u32>,
    pub total_mini_game_score: u32,
    pub max_mini_game_score: u32,
    pub questions_only_percentage: f64,
    pub mini_game_only_percentage: f64,
    pub combined_percentage: f64,
}

impl GameStats {
    pub fn compute(state: &SessionState, max_mini_game_score: u32) -> Self {
        let total_questions = state.shuffled_questions.len();
        let correct_answers = state.score;

        let correct_in = |tier: Difficulty| {
            state
                .answers
                .iter()
                .zip(&state.shuffled_questions)
                .filter(|(answer, question)| question.difficulty() == tier && question.is_correct(**answer))
                .count() as u32
        };

        let total_mini_game_score = state.mini_game_scores.iter().sum::<u32>();

        Self {
            total_questions,
            correct_answers,
            easy_correct: correct_in(Difficulty::Easy),
            medium_correct: correct_in(Difficulty::Medium),
            hard_correct: correct_in(Difficulty::Hard),
            mini_game_scores: state.mini_game_scores.clone(),
            total_mini_game_score,
            max_mini_game_score,
            questions_only_percentage: percentage(correct_answers, total_questions as u32),
            mini_game_only_percentage: percentage(total_mini_game_score, max_mini_game_score),
            combined_percentage: percentage(
                correct_answers + total_mini_game_score,
                total_questions as u32 + max_mini_game_score,
            ),
        }
    }

    pub fn correct_in(&self, tier: Difficulty) -> u32 {
        match tier {
            Difficulty::Easy => self.easy_correct,
            Difficulty::Medium => self.medium_correct,
            Difficulty::Hard => self.hard_correct,
        }
    }

    pub fn performance(&self) -> Performance {
        Performance::from_percentage(self.combined_percentage)
    }

    pub fn memory_feedback(&self) -> MemoryFeedback {
        MemoryFeedback::from_score(self.total_mini_game_score, self.max_mini_game_score)
    }
}

fn percentage(part: u32, whole: u32) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    part as f64 * 100.0 / whole as f64
}

/// Overall result tier shown on the results screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum Performance {
    Excellent,
    VeryGood,
    Good,
    KeepStudying,
}

impl Performance {
    pub fn from_percentage(percentage: f64) -> Self {
        if percentage >= 90.0 {
            Performance::Excellent
        } else if percentage >= 70.0 {
            Performance::VeryGood
        } else if percentage >= 50.0 {
            Performance::Good
        } else {
            Performance::KeepStudying
        }
    }
}

/// Tier of the mini-game total: 15 and 10 out of 18 in the standard three games.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum MemoryFeedback {
    Great,
    Good,
    KeepPracticing,
}

impl MemoryFeedback {
    pub fn from_score(total: u32, max: u32) -> Self {
        if max == 0 {
            return MemoryFeedback::KeepPracticing;
        }
        // total/max >= 15/18 and total/max >= 10/18 without floats
        if total * 18 >= max * 15 {
            MemoryFeedback::Great
        } else if total * 18 >= max * 10 {
            MemoryFeedback::Good
        } else {
            MemoryFeedback::KeepPracticing
        }
    }
}
