use std::collections::HashMap;
use std::ops::ControlFlow;
use std::sync::Arc;

use teloxide::prelude::*;
use tokio::sync::{Mutex, MutexGuard};

use crate::quiz::memory::Selection;
use crate::quiz::session::Phase;
use crate::quiz::timer::Countdown;
use crate::quiz::{Answer, Content, Quiz, QuizSettings, Tick};
use crate::render::{self, Reply};

/// A chat's quiz and the countdown running for it.
pub struct Table {
    pub quiz: Quiz,
    countdown: Option<Countdown>,
}

impl Table {
    pub fn new(quiz: Quiz) -> Self {
        Self {
            quiz,
            countdown: None,
        }
    }

    /// Applies one message of the player to the live quiz.
    pub fn handle(&mut self, text: &str) -> Vec<Reply> {
        match self.quiz.phase() {
            Phase::Answering => self.answer(text),
            Phase::MiniGame => self.pick(text),
            Phase::Finished | Phase::NotStarted => render::prompt(&self.quiz),
        }
    }

    fn answer(&mut self, text: &str) -> Vec<Reply> {
        let Some(index) = self
            .quiz
            .current_question()
            .and_then(|q| q.presented_options.iter().position(|option| option == text))
        else {
            return vec![render::not_an_option()];
        };

        match self.quiz.submit_answer(Answer::Chosen(index)) {
            Ok(advance) => {
                let mut replies = render::feedback(&self.quiz).into_iter().collect::<Vec<_>>();
                replies.extend(render::advanced(&self.quiz, advance));
                replies
            }
            Err(err) => {
                log::warn!("Ignoring answer {:?}: {}", text, err);
                Vec::new()
            }
        }
    }

    fn pick(&mut self, text: &str) -> Vec<Reply> {
        let Some(game) = self.quiz.active_mini_game() else {
            return Vec::new();
        };
        let board = &game.board;
        let pairs = board.len();
        let left = find_cell(board.unmatched_left(), text);
        let right = find_cell(board.unmatched_right(), text);
        let wants_right = board.selected_left().is_some();

        let selection = match (left, right) {
            (Some(_), Some(r)) if wants_right => self.quiz.select_right(r),
            (Some(l), _) => self.quiz.select_left(l),
            (None, Some(r)) => self.quiz.select_right(r),
            (None, None) => {
                let mut replies = vec![render::not_on_board()];
                replies.extend(render::prompt(&self.quiz));
                return replies;
            }
        };

        let mut replies = Vec::new();
        match selection {
            Ok(Selection::Matched) => replies.push(render::matched()),
            Ok(Selection::Mismatch) => replies.push(render::mismatch()),
            Ok(Selection::Pending) | Ok(Selection::AlreadyMatched) => {}
            Err(err) => {
                log::warn!("Ignoring selection {:?}: {}", text, err);
                return replies;
            }
        }

        let finished = self
            .quiz
            .active_mini_game()
            .filter(|game| game.board.is_complete())
            .map(|game| game.board.matched());
        match finished {
            Some(matched) => match self.quiz.complete_mini_game(matched) {
                Ok(advance) => {
                    replies.extend(render::mini_game_done(&self.quiz, false, pairs));
                    replies.extend(render::advanced(&self.quiz, advance));
                }
                Err(err) => log::warn!("Could not complete mini-game: {}", err),
            },
            None => replies.extend(render::prompt(&self.quiz)),
        }
        replies
    }
}

fn find_cell(cells: Vec<(usize, &str)>, text: &str) -> Option<usize> {
    cells
        .into_iter()
        .find(|(_, cell)| *cell == text)
        .map(|(cell, _)| cell)
}

/// Live tables of every chat. Message handlers and countdown ticks both go
/// through the same lock, so transitions never overlap.
#[derive(Clone)]
pub struct Tables {
    inner: Arc<Mutex<HashMap<ChatId, Table>>>,
    content: Arc<Content>,
    settings: QuizSettings,
}

impl Tables {
    pub fn new(content: Arc<Content>, settings: QuizSettings) -> Self {
        Self {
            inner: Arc::new(Mutex::new(HashMap::new())),
            content,
            settings,
        }
    }

    pub async fn lock(&self) -> MutexGuard<'_, HashMap<ChatId, Table>> {
        self.inner.lock().await
    }

    pub fn open(&self) -> Table {
        Table::new(Quiz::new(self.content.clone(), self.settings.clone()))
    }

    /// Replaces the chat's countdown with one armed for the quiz's current timer epoch.
    ///
    /// Call after every transition. Nothing is armed once the quiz is finished or reset.
    pub fn rearm(&self, bot: &Bot, chat_id: ChatId, table: &mut Table) {
        if let Some(countdown) = table.countdown.take() {
            countdown.cancel();
        }
        if !table.quiz.is_counting_down() {
            return;
        }

        let epoch = table.quiz.timer_epoch();
        log::debug!(
            "Arming countdown for chat {} at epoch {} ({}s)",
            chat_id,
            epoch,
            table.quiz.time_remaining()
        );
        let tables = self.clone();
        let bot = bot.clone();
        table.countdown = Some(Countdown::arm(move || {
            let tables = tables.clone();
            let bot = bot.clone();
            async move { tables.tick(bot, chat_id, epoch).await }
        }));
    }

    /// Re-arms the chat's countdown after a transition and releases the
    /// table once its results are out.
    pub fn follow_up(&self, bot: &Bot, chat_id: ChatId, seats: &mut HashMap<ChatId, Table>) {
        let Some(table) = seats.get_mut(&chat_id) else {
            return;
        };
        self.rearm(bot, chat_id, table);
        if table.quiz.should_show_results() {
            log::debug!("Releasing finished session of chat {}", chat_id);
            seats.remove(&chat_id);
        }
    }

    async fn tick(&self, bot: Bot, chat_id: ChatId, epoch: u64) -> ControlFlow<()> {
        let mut tables = self.inner.lock().await;
        let Some(table) = tables.get_mut(&chat_id) else {
            return ControlFlow::Break(());
        };

        let phase = table.quiz.phase();
        let pairs = table
            .quiz
            .active_mini_game()
            .map(|game| game.board.len())
            .unwrap_or(0);
        match table.quiz.tick(epoch) {
            Tick::Running(_) => ControlFlow::Continue(()),
            Tick::Stale | Tick::Idle => ControlFlow::Break(()),
            Tick::Expired(advance) => {
                log::debug!("Countdown expired for chat {} in {:?}", chat_id, phase);
                let replies = render::expired(&table.quiz, phase, pairs, advance);
                // replaces or drops this countdown, so nothing below may await
                self.follow_up(&bot, chat_id, &mut tables);
                tokio::spawn(async move {
                    if let Err(err) = render::send_all(&bot, chat_id, replies).await {
                        log::error!("Failed to send timeout messages to {}: {}", chat_id, err);
                    }
                });
                ControlFlow::Break(())
            }
        }
    }
}
