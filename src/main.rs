mod config;
mod quiz;
mod render;
mod table;

use std::sync::Arc;

use config::Config;
use dotenv::dotenv;
use quiz::{Content, Phase};
use render::{Reply, ABOUT_COMMAND, ASK_NAME_AGAIN, GREETING_TEXT, PLAY_AGAIN_BUTTON, RESTART_COMMAND};
use table::Tables;
use teloxide::{dispatching::dialogue::InMemStorage, prelude::*};

type QuizDialogue = Dialogue<State, InMemStorage<State>>;
type HandlerResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

#[derive(Clone, Default)]
pub enum State {
    #[default]
    Start,
    ReceiveName,
    Playing,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    dotenv().ok();
    pretty_env_logger::init();
    log::info!("Starting quiz bot...");

    let config = Config::from_env()?;

    let content = match &config.content_dir {
        Some(dir) => {
            log::info!("Loading content from {}", dir.display());
            Content::from_dir(dir)?
        }
        None => Content::builtin()?,
    };
    content.validate_schedule(&config.settings.mini_game_schedule)?;
    log::info!(
        "Loaded {} questions and {} memory games",
        content.questions.len(),
        content.memory_games.len()
    );

    let tables = Tables::new(Arc::new(content), config.settings);
    let bot = Bot::from_env();

    Dispatcher::builder(
        bot,
        Update::filter_message()
            .enter_dialogue::<Message, InMemStorage<State>, State>()
            .branch(
                dptree::filter(|msg: Message| msg.text().map(str::trim) == Some(ABOUT_COMMAND))
                    .endpoint(about),
            )
            .branch(dptree::case![State::Start].endpoint(start))
            .branch(dptree::case![State::ReceiveName].endpoint(receive_name))
            .branch(dptree::case![State::Playing].endpoint(play)),
    )
    .dependencies(dptree::deps![InMemStorage::<State>::new(), tables])
    .enable_ctrlc_handler()
    .build()
    .dispatch()
    .await;

    Ok(())
}

async fn start(bot: Bot, dialogue: QuizDialogue, msg: Message) -> HandlerResult {
    bot.send_message(msg.chat.id, GREETING_TEXT).await?;

    dialogue.update(State::ReceiveName).await?;
    Ok(())
}

async fn about(bot: Bot, msg: Message) -> HandlerResult {
    render::send_all(&bot, msg.chat.id, vec![render::about()]).await?;
    Ok(())
}

async fn receive_name(bot: Bot, dialogue: QuizDialogue, tables: Tables, msg: Message) -> HandlerResult {
    let name = msg
        .text()
        .map(str::trim)
        .filter(|name| !name.is_empty() && !name.starts_with('/'));
    let Some(name) = name else {
        bot.send_message(msg.chat.id, ASK_NAME_AGAIN).await?;
        return Ok(());
    };

    let replies = {
        let mut seats = tables.lock().await;
        let table = seats.entry(msg.chat.id).or_insert_with(|| tables.open());
        if table.quiz.phase() != Phase::NotStarted {
            table.quiz.reset();
        }
        let advance = table.quiz.start(name)?;
        tables.rearm(&bot, msg.chat.id, table);

        let mut replies = vec![render::welcome(name)];
        replies.extend(render::advanced(&table.quiz, advance));
        replies
    };
    render::send_all(&bot, msg.chat.id, replies).await?;

    dialogue.update(State::Playing).await?;
    Ok(())
}

async fn play(bot: Bot, dialogue: QuizDialogue, tables: Tables, msg: Message) -> HandlerResult {
    let chat_id = msg.chat.id;
    let text = msg.text().map(str::trim).unwrap_or_default();
    if text == RESTART_COMMAND || text == "/start" || text == PLAY_AGAIN_BUTTON {
        return restart(bot, dialogue, tables, chat_id).await;
    }

    let replies = {
        let mut seats = tables.lock().await;
        let handled = seats.get_mut(&chat_id).map(|table| {
            let epoch = table.quiz.timer_epoch();
            let replies = table.handle(text);
            (replies, table.quiz.timer_epoch() != epoch)
        });
        if let Some((_, true)) = &handled {
            tables.follow_up(&bot, chat_id, &mut seats);
        }
        handled.map(|(replies, _)| replies)
    };

    match replies {
        Some(replies) => render::send_all(&bot, chat_id, replies).await?,
        // never started, or released after the results
        None => return restart(bot, dialogue, tables, chat_id).await,
    }
    Ok(())
}

async fn restart(bot: Bot, dialogue: QuizDialogue, tables: Tables, chat_id: ChatId) -> HandlerResult {
    // dropping the table also stops its countdown
    if tables.lock().await.remove(&chat_id).is_some() {
        log::debug!("Chat {} restarted", chat_id);
    }

    render::send_all(&bot, chat_id, vec![Reply::clearing(GREETING_TEXT)]).await?;
    dialogue.update(State::ReceiveName).await?;
    Ok(())
}
