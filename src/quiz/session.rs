use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::quiz::memory::{MemoryBoard, Selection};
use crate::quiz::shuffle::shuffle_session;
use crate::quiz::stats::GameStats;
use crate::quiz::{Answer, Content, Difficulty, ShuffledQuestion};

/// Bonus games are due after these many answered questions.
///
/// Tied to the 4/4/4 tier split of the bundled content, the last entry being the
/// final question. `Content::validate_schedule` checks it at start-up.
pub const MINI_GAME_SCHEDULE: [usize; 3] = [4, 8, 12];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeLimits {
    pub easy: u32,
    pub medium: u32,
    pub hard: u32,
}

impl TimeLimits {
    pub fn for_difficulty(&self, difficulty: Difficulty) -> u32 {
        match difficulty {
            Difficulty::Easy => self.easy,
            Difficulty::Medium => self.medium,
            Difficulty::Hard => self.hard,
        }
    }
}

impl Default for TimeLimits {
    fn default() -> Self {
        Self {
            easy: 15,
            medium: 30,
            hard: 45,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizSettings {
    pub time_limits: TimeLimits,
    pub mini_game_seconds: u32,
    pub mini_game_schedule: Vec<usize>,
}

impl Default for QuizSettings {
    fn default() -> Self {
        Self {
            time_limits: TimeLimits::default(),
            mini_game_seconds: 60,
            mini_game_schedule: MINI_GAME_SCHEDULE.to_vec(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Phase {
    #[default]
    NotStarted,
    Answering,
    MiniGame,
    Finished,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ActiveMiniGame {
    /// 1-based position in the schedule.
    pub number: usize,
    pub name: String,
    pub board: MemoryBoard,
}

/// Everything one playthrough accumulates. `Default` is the not-started state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionState {
    pub player_name: String,
    pub shuffled_questions: Vec<ShuffledQuestion>,
    pub current_index: usize,
    pub answers: Vec<Answer>,
    pub score: u32,
    pub active_mini_game: Option<ActiveMiniGame>,
    pub mini_game_scores: Vec<u32>,
    pub phase: Phase,
    pub time_remaining: u32,
}

/// What became live after a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    /// Index of the question now being asked.
    Question(usize),
    /// 1-based number of the mini-game now being played.
    MiniGame(usize),
    Finished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// The tick belongs to a countdown that has since been re-armed.
    Stale,
    /// Nothing is counting down.
    Idle,
    Running(u32),
    /// Time ran out and the timeout transition was applied.
    Expired(Advance),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QuizError {
    #[error("cannot {operation} while {phase:?}")]
    WrongPhase { operation: &'static str, phase: Phase },
    #[error("option {index} does not exist, the question has {options} options")]
    NoSuchOption { index: usize, options: usize },
    #[error("the board has no cell {0}")]
    NoSuchCell(usize),
}

/// Session state machine: `NotStarted -> Answering -> (MiniGame <-> Answering)* -> Finished`.
///
/// Every transition that makes a new question or mini-game live bumps the timer
/// epoch. Countdowns tick with the epoch they were armed for, and ticks from an
/// older epoch are ignored.
#[derive(Debug, Clone)]
pub struct Quiz {
    content: Arc<Content>,
    settings: QuizSettings,
    state: SessionState,
    timer_epoch: u64,
    rng: StdRng,
}

impl Quiz {
    pub fn new(content: Arc<Content>, settings: QuizSettings) -> Self {
        Self::with_rng(content, settings, StdRng::from_entropy())
    }

    pub fn with_rng(content: Arc<Content>, settings: QuizSettings, rng: StdRng) -> Self {
        Self {
            content,
            settings,
            state: SessionState::default(),
            timer_epoch: 0,
            rng,
        }
    }

    pub fn start(&mut self, player_name: &str) -> Result<Advance, QuizError> {
        self.expect_phase(Phase::NotStarted, "start")?;

        self.state.player_name = player_name.trim().to_string();
        self.state.shuffled_questions = shuffle_session(&self.content.questions, &mut self.rng);
        self.state.current_index = 0;
        log::info!(
            "Starting session for {:?} with {} questions",
            self.state.player_name,
            self.state.shuffled_questions.len()
        );

        if self.state.shuffled_questions.is_empty() {
            return Ok(self.finish());
        }
        Ok(self.ask(0))
    }

    pub fn submit_answer(&mut self, answer: Answer) -> Result<Advance, QuizError> {
        self.expect_phase(Phase::Answering, "submit an answer")?;

        let question = &self.state.shuffled_questions[self.state.current_index];
        if let Answer::Chosen(index) = answer {
            let options = question.presented_options.len();
            if index >= options {
                return Err(QuizError::NoSuchOption { index, options });
            }
        }

        let correct = question.is_correct(answer);
        self.state.answers.push(answer);
        if correct {
            self.state.score += 1;
        }
        log::debug!(
            "Question {} answered with {:?} ({})",
            self.state.current_index + 1,
            answer,
            if correct { "correct" } else { "incorrect" }
        );

        let answered = self.state.answers.len();
        if let Some(slot) = self
            .settings
            .mini_game_schedule
            .iter()
            .position(|&after| after == answered)
        {
            return Ok(self.play_mini_game(slot));
        }
        Ok(self.next_question_or_finish())
    }

    pub fn complete_mini_game(&mut self, matched: u32) -> Result<Advance, QuizError> {
        self.expect_phase(Phase::MiniGame, "complete a mini-game")?;

        let Some(game) = self.state.active_mini_game.take() else {
            return Err(QuizError::WrongPhase {
                operation: "complete a mini-game",
                phase: self.state.phase,
            });
        };
        let pairs = game.board.len() as u32;
        if matched > pairs {
            log::warn!(
                "Mini-game {} reported {} matches out of {}, clamping",
                game.number,
                matched,
                pairs
            );
        }
        let matched = matched.min(pairs);
        self.state.mini_game_scores.push(matched);
        log::debug!("Mini-game {} completed with {}/{}", game.number, matched, pairs);

        Ok(self.next_question_or_finish())
    }

    pub fn select_left(&mut self, cell: usize) -> Result<Selection, QuizError> {
        self.board_mut("select a term")?
            .select_left(cell)
            .ok_or(QuizError::NoSuchCell(cell))
    }

    pub fn select_right(&mut self, cell: usize) -> Result<Selection, QuizError> {
        self.board_mut("select a definition")?
            .select_right(cell)
            .ok_or(QuizError::NoSuchCell(cell))
    }

    /// One second of the countdown armed at `epoch`.
    pub fn tick(&mut self, epoch: u64) -> Tick {
        if epoch != self.timer_epoch {
            return Tick::Stale;
        }
        if !self.is_counting_down() {
            return Tick::Idle;
        }

        self.state.time_remaining = self.state.time_remaining.saturating_sub(1);
        if self.state.time_remaining > 0 {
            return Tick::Running(self.state.time_remaining);
        }

        let expired = match self.state.phase {
            Phase::Answering => {
                log::debug!("Question {} timed out", self.state.current_index + 1);
                self.submit_answer(Answer::TimedOut)
            }
            _ => {
                let matched = self
                    .state
                    .active_mini_game
                    .as_ref()
                    .map(|game| game.board.matched())
                    .unwrap_or(0);
                log::debug!("Mini-game timed out with {} matches", matched);
                self.complete_mini_game(matched)
            }
        };
        match expired {
            Ok(advance) => Tick::Expired(advance),
            Err(_) => Tick::Idle,
        }
    }

    pub fn reset(&mut self) {
        log::debug!("Resetting session of {:?}", self.state.player_name);
        self.state = SessionState::default();
        self.timer_epoch += 1;
    }

    pub fn phase(&self) -> Phase {
        self.state.phase
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn current_question(&self) -> Option<&ShuffledQuestion> {
        match self.state.phase {
            Phase::Answering => self.state.shuffled_questions.get(self.state.current_index),
            _ => None,
        }
    }

    /// The most recently answered question and the answer it got.
    pub fn last_answered(&self) -> Option<(&ShuffledQuestion, Answer)> {
        let answer = *self.state.answers.last()?;
        let question = self.state.shuffled_questions.get(self.state.answers.len() - 1)?;
        Some((question, answer))
    }

    pub fn active_mini_game(&self) -> Option<&ActiveMiniGame> {
        self.state.active_mini_game.as_ref()
    }

    pub fn time_remaining(&self) -> u32 {
        self.state.time_remaining
    }

    pub fn timer_epoch(&self) -> u64 {
        self.timer_epoch
    }

    /// Whether a question or mini-game is live and its countdown should run.
    pub fn is_counting_down(&self) -> bool {
        matches!(self.state.phase, Phase::Answering | Phase::MiniGame)
    }

    pub fn should_show_results(&self) -> bool {
        self.state.phase == Phase::Finished
    }

    pub fn total_questions(&self) -> usize {
        self.state.shuffled_questions.len()
    }

    /// Sum of the pair counts of every scheduled mini-game.
    pub fn max_mini_game_score(&self) -> u32 {
        self.content
            .memory_games
            .iter()
            .take(self.settings.mini_game_schedule.len())
            .map(|game| game.pairs.len() as u32)
            .sum()
    }

    pub fn stats(&self) -> GameStats {
        GameStats::compute(&self.state, self.max_mini_game_score())
    }

    fn expect_phase(&self, phase: Phase, operation: &'static str) -> Result<(), QuizError> {
        if self.state.phase != phase {
            log::warn!("Rejected attempt to {} while {:?}", operation, self.state.phase);
            return Err(QuizError::WrongPhase {
                operation,
                phase: self.state.phase,
            });
        }
        Ok(())
    }

    fn board_mut(&mut self, operation: &'static str) -> Result<&mut MemoryBoard, QuizError> {
        self.expect_phase(Phase::MiniGame, operation)?;
        let phase = self.state.phase;
        self.state
            .active_mini_game
            .as_mut()
            .map(|game| &mut game.board)
            .ok_or(QuizError::WrongPhase { operation, phase })
    }

    fn arm(&mut self, seconds: u32) {
        self.state.time_remaining = seconds;
        self.timer_epoch += 1;
    }

    fn ask(&mut self, index: usize) -> Advance {
        self.state.current_index = index;
        self.state.phase = Phase::Answering;
        let limit = self
            .settings
            .time_limits
            .for_difficulty(self.state.shuffled_questions[index].difficulty());
        self.arm(limit);
        Advance::Question(index)
    }

    fn play_mini_game(&mut self, slot: usize) -> Advance {
        let set = &self.content.memory_games[slot];
        let number = slot + 1;
        log::debug!("Mini-game {} ({}) is live", number, set.name);
        self.state.active_mini_game = Some(ActiveMiniGame {
            number,
            name: set.name.clone(),
            board: MemoryBoard::new(&set.pairs, &mut self.rng),
        });
        self.state.phase = Phase::MiniGame;
        self.arm(self.settings.mini_game_seconds);
        Advance::MiniGame(number)
    }

    fn next_question_or_finish(&mut self) -> Advance {
        let next = self.state.current_index + 1;
        if next < self.state.shuffled_questions.len() {
            self.ask(next)
        } else {
            self.finish()
        }
    }

    fn finish(&mut self) -> Advance {
        self.state.phase = Phase::Finished;
        self.state.active_mini_game = None;
        self.arm(0);
        match serde_json::to_string(&self.stats()) {
            Ok(stats) => log::info!("Session of {:?} finished: {}", self.state.player_name, stats),
            Err(err) => log::warn!("Could not serialize final statistics: {}", err),
        }
        Advance::Finished
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quiz(seed: u64) -> Quiz {
        let content = Arc::new(Content::builtin().unwrap());
        Quiz::with_rng(content, QuizSettings::default(), StdRng::seed_from_u64(seed))
    }

    fn correct(quiz: &Quiz) -> Answer {
        Answer::Chosen(quiz.current_question().unwrap().presented_correct_index)
    }

    fn wrong(quiz: &Quiz) -> Answer {
        let correct = quiz.current_question().unwrap().presented_correct_index;
        Answer::Chosen((correct + 1) % 4)
    }

    fn recomputed_score(state: &SessionState) -> u32 {
        state
            .answers
            .iter()
            .zip(&state.shuffled_questions)
            .filter(|(answer, question)| question.is_correct(**answer))
            .count() as u32
    }

    #[test]
    fn start_arms_first_easy_question() {
        let mut quiz = quiz(1);
        assert_eq!(quiz.phase(), Phase::NotStarted);
        assert!(quiz.current_question().is_none());

        assert_eq!(quiz.start("  Ana "), Ok(Advance::Question(0)));
        assert_eq!(quiz.phase(), Phase::Answering);
        assert_eq!(quiz.state().player_name, "Ana");
        assert_eq!(quiz.state().shuffled_questions.len(), 12);
        assert_eq!(quiz.current_question().unwrap().difficulty(), Difficulty::Easy);
        assert_eq!(quiz.time_remaining(), 15);
        assert_eq!(quiz.timer_epoch(), 1);
    }

    #[test]
    fn start_twice_is_rejected() {
        let mut quiz = quiz(1);
        quiz.start("Ana").unwrap();
        let before = quiz.state().clone();
        assert!(matches!(quiz.start("Bia"), Err(QuizError::WrongPhase { .. })));
        assert_eq!(quiz.state(), &before);
    }

    #[test]
    fn transitions_in_wrong_phase_leave_state_untouched() {
        let mut quiz = quiz(2);
        assert_eq!(
            quiz.submit_answer(Answer::Chosen(0)),
            Err(QuizError::WrongPhase {
                operation: "submit an answer",
                phase: Phase::NotStarted
            })
        );
        assert!(quiz.complete_mini_game(3).is_err());
        assert_eq!(quiz.state(), &SessionState::default());

        quiz.start("Ana").unwrap();
        let before = quiz.state().clone();
        assert!(quiz.complete_mini_game(3).is_err());
        assert!(quiz.select_left(0).is_err());
        assert_eq!(
            quiz.submit_answer(Answer::Chosen(4)),
            Err(QuizError::NoSuchOption { index: 4, options: 4 })
        );
        assert_eq!(quiz.state(), &before);
    }

    #[test]
    fn answers_and_score_stay_aligned() {
        let mut quiz = quiz(3);
        quiz.start("Ana").unwrap();
        let mut k = 0;
        while quiz.phase() != Phase::Finished {
            match quiz.phase() {
                Phase::Answering => {
                    let answer = match k % 3 {
                        0 => correct(&quiz),
                        1 => wrong(&quiz),
                        _ => Answer::TimedOut,
                    };
                    quiz.submit_answer(answer).unwrap();
                    k += 1;
                    assert_eq!(quiz.state().answers.len(), k);
                    assert_eq!(quiz.state().score, recomputed_score(quiz.state()));
                }
                Phase::MiniGame => {
                    quiz.complete_mini_game(2).unwrap();
                }
                phase => panic!("unexpected phase {:?}", phase),
            }
        }
        assert_eq!(k, 12);
        assert_eq!(quiz.state().score, 4);
    }

    #[test]
    fn mini_games_follow_the_schedule() {
        let mut quiz = quiz(4);
        quiz.start("Ana").unwrap();
        let mut mini_game_after = Vec::new();
        for answered in 1..=12 {
            let advance = quiz.submit_answer(wrong(&quiz)).unwrap();
            if quiz.phase() == Phase::MiniGame {
                let number = quiz.active_mini_game().unwrap().number;
                assert_eq!(advance, Advance::MiniGame(number));
                assert_eq!(quiz.time_remaining(), 60);
                mini_game_after.push(answered);
                let next = quiz.complete_mini_game(0).unwrap();
                if answered < 12 {
                    assert_eq!(next, Advance::Question(answered));
                }
            } else {
                assert_eq!(advance, Advance::Question(answered));
            }
        }
        assert_eq!(mini_game_after, vec![4, 8, 12]);
        assert_eq!(quiz.phase(), Phase::Finished);
        assert!(quiz.should_show_results());
    }

    #[test]
    fn time_limits_follow_difficulty() {
        let mut quiz = quiz(5);
        quiz.start("Ana").unwrap();
        let mut limits = Vec::new();
        while quiz.phase() != Phase::Finished {
            if quiz.phase() == Phase::MiniGame {
                quiz.complete_mini_game(0).unwrap();
                continue;
            }
            limits.push(quiz.time_remaining());
            quiz.submit_answer(Answer::TimedOut).unwrap();
        }
        let mut expected = vec![15; 4];
        expected.extend([30; 4]);
        expected.extend([45; 4]);
        assert_eq!(limits, expected);
    }

    #[test]
    fn countdown_expiry_equals_timeout_answer() {
        let mut ticked = quiz(6);
        let mut submitted = quiz(6);
        ticked.start("Ana").unwrap();
        submitted.start("Ana").unwrap();

        let epoch = ticked.timer_epoch();
        for remaining in (1..15).rev() {
            assert_eq!(ticked.tick(epoch), Tick::Running(remaining));
        }
        assert_eq!(ticked.tick(epoch), Tick::Expired(Advance::Question(1)));

        let advance = submitted.submit_answer(Answer::TimedOut).unwrap();
        assert_eq!(advance, Advance::Question(1));
        assert_eq!(ticked.state(), submitted.state());
        assert_eq!(ticked.state().answers, vec![Answer::TimedOut]);
        assert_eq!(ticked.state().score, 0);
    }

    #[test]
    fn mini_game_expiry_keeps_partial_matches() {
        let mut quiz = quiz(7);
        quiz.start("Ana").unwrap();
        for _ in 0..4 {
            quiz.submit_answer(correct(&quiz)).unwrap();
        }
        assert_eq!(quiz.phase(), Phase::MiniGame);

        // match the first two terms
        for _ in 0..2 {
            let board = &quiz.active_mini_game().unwrap().board;
            let (left, term) = board.unmatched_left()[0];
            let term = term.to_string();
            let pairs = &quiz.content.memory_games[0].pairs;
            let definition = &pairs.iter().find(|p| p.left == term).unwrap().right;
            let right = board
                .unmatched_right()
                .iter()
                .find(|(_, text)| *text == definition.as_str())
                .unwrap()
                .0;
            assert_eq!(quiz.select_left(left), Ok(Selection::Pending));
            assert_eq!(quiz.select_right(right), Ok(Selection::Matched));
        }

        let epoch = quiz.timer_epoch();
        for _ in 1..60 {
            assert!(matches!(quiz.tick(epoch), Tick::Running(_)));
        }
        assert_eq!(quiz.tick(epoch), Tick::Expired(Advance::Question(4)));
        assert_eq!(quiz.state().mini_game_scores, vec![2]);
        assert_eq!(quiz.time_remaining(), 30);
    }

    #[test]
    fn stale_ticks_do_not_touch_new_question() {
        let mut quiz = quiz(8);
        quiz.start("Ana").unwrap();
        let old_epoch = quiz.timer_epoch();
        quiz.tick(old_epoch);
        quiz.submit_answer(correct(&quiz)).unwrap();

        assert_eq!(quiz.time_remaining(), 15);
        assert_eq!(quiz.tick(old_epoch), Tick::Stale);
        assert_eq!(quiz.time_remaining(), 15);
        assert_eq!(quiz.tick(quiz.timer_epoch()), Tick::Running(14));
    }

    #[test]
    fn finished_session_does_not_count_down() {
        let mut quiz = quiz(9);
        quiz.start("Ana").unwrap();
        while quiz.phase() != Phase::Finished {
            match quiz.phase() {
                Phase::Answering => quiz.submit_answer(Answer::TimedOut).unwrap(),
                _ => quiz.complete_mini_game(0).unwrap(),
            };
        }
        assert_eq!(quiz.tick(quiz.timer_epoch()), Tick::Idle);
        assert_eq!(quiz.time_remaining(), 0);
    }

    #[test]
    fn reset_restores_initial_state_from_any_phase() {
        for stop_after in [0, 2, 4, 20] {
            let mut quiz = quiz(10);
            quiz.start("Ana").unwrap();
            for _ in 0..stop_after {
                match quiz.phase() {
                    Phase::Answering => {
                        quiz.submit_answer(correct(&quiz)).unwrap();
                    }
                    Phase::MiniGame => {
                        quiz.complete_mini_game(6).unwrap();
                    }
                    _ => break,
                }
            }
            let epoch = quiz.timer_epoch();
            quiz.reset();
            assert_eq!(quiz.state(), &SessionState::default());
            assert_eq!(quiz.tick(epoch), Tick::Stale);
            quiz.reset();
            assert_eq!(quiz.state(), &SessionState::default());
        }
    }

    #[test]
    fn restart_builds_a_fresh_session() {
        let mut quiz = quiz(11);
        quiz.start("Ana").unwrap();
        let first = quiz.state().shuffled_questions.clone();
        quiz.submit_answer(correct(&quiz)).unwrap();
        quiz.reset();

        quiz.start("Bia").unwrap();
        assert_eq!(quiz.state().player_name, "Bia");
        assert!(quiz.state().answers.is_empty());
        assert_eq!(quiz.state().score, 0);
        assert_eq!(quiz.state().shuffled_questions.len(), first.len());
        assert_ne!(quiz.state().shuffled_questions, first);
    }

    #[test]
    fn oversized_mini_game_count_is_clamped() {
        let mut quiz = quiz(12);
        quiz.start("Ana").unwrap();
        for _ in 0..4 {
            quiz.submit_answer(wrong(&quiz)).unwrap();
        }
        quiz.complete_mini_game(99).unwrap();
        assert_eq!(quiz.state().mini_game_scores, vec![6]);
    }

    #[test]
    fn full_playthrough() {
        let mut quiz = quiz(13);
        quiz.start("Ana").unwrap();

        for _ in 0..4 {
            quiz.submit_answer(correct(&quiz)).unwrap();
        }
        assert_eq!(quiz.phase(), Phase::MiniGame);
        assert_eq!(quiz.active_mini_game().unwrap().number, 1);
        quiz.complete_mini_game(6).unwrap();

        for i in 0..4 {
            assert_eq!(quiz.current_question().unwrap().difficulty(), Difficulty::Medium);
            let answer = if i < 2 { correct(&quiz) } else { wrong(&quiz) };
            quiz.submit_answer(answer).unwrap();
        }
        assert_eq!(quiz.phase(), Phase::MiniGame);
        assert_eq!(quiz.active_mini_game().unwrap().number, 2);
        quiz.complete_mini_game(3).unwrap();

        quiz.submit_answer(correct(&quiz)).unwrap();
        for _ in 0..3 {
            let epoch = quiz.timer_epoch();
            while let Tick::Running(_) = quiz.tick(epoch) {}
        }
        assert_eq!(quiz.phase(), Phase::MiniGame);
        assert_eq!(quiz.active_mini_game().unwrap().number, 3);
        quiz.complete_mini_game(4).unwrap();

        assert_eq!(quiz.phase(), Phase::Finished);
        let stats = quiz.stats();
        assert_eq!(stats.correct_answers, 7);
        assert_eq!(stats.total_mini_game_score, 13);
        assert_eq!(stats.max_mini_game_score, 18);
        assert_eq!(stats.easy_correct, 4);
        assert_eq!(stats.medium_correct, 2);
        assert_eq!(stats.hard_correct, 1);
        assert_eq!(quiz.state().answers[9..], [Answer::TimedOut; 3]);
    }
}
