use teloxide::{
    prelude::*,
    types::{KeyboardButton, KeyboardMarkup, KeyboardRemove, ParseMode, ReplyMarkup},
    utils::html::{bold, escape},
};

use crate::quiz::session::{ActiveMiniGame, Phase};
use crate::quiz::stats::{GameStats, MemoryFeedback, Performance};
use crate::quiz::{Advance, Answer, Difficulty, Quiz, ShuffledQuestion};

pub const GREETING_TEXT: &str = "Olá! Bem-vindo ao Desafio da Trinca, o quiz da Ordem DeMolay! Você vai responder perguntas fáceis, médias e difíceis contra o relógio, com jogos da memória entre elas. Para começar, qual é o seu nome?";
pub const ASK_NAME_AGAIN: &str = "Por favor, digite o seu nome (em texto).";
pub const PLAY_AGAIN_BUTTON: &str = "Jogar novamente";
pub const RESTART_COMMAND: &str = "/reiniciar";
pub const ABOUT_COMMAND: &str = "/sobre";

const ABOUT_PURPOSE: &str = "O <b>Desafio da Trinca</b> nasce como uma iniciativa da equipe <b>Trinca de Ouro</b>, com o objetivo de valorizar a simbologia da Cerimônia de Iniciação na Ordem DeMolay. O jogo foi desenvolvido especialmente para as <b>Olimpíadas DeMolay 2025</b>, buscando promover o entendimento mais profundo dos ensinamentos que moldam nossa identidade e fortalecer o sentimento de pertencimento entre os irmãos.";
const ABOUT_SPIRIT: &str = "Acreditamos que o conhecimento simbólico, quando aliado à experiência lúdica, torna-se ainda mais marcante, conectando razão e emoção, tradição e inovação. Este projeto é uma homenagem aos valores que nos unem e aos momentos que nos transformam.";

/// One outgoing chat message.
#[derive(Debug, Clone)]
pub struct Reply {
    pub text: String,
    pub keyboard: Option<ReplyMarkup>,
}

impl Reply {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            keyboard: None,
        }
    }

    pub fn with_keyboard(text: impl Into<String>, buttons: Vec<String>) -> Self {
        Self {
            text: text.into(),
            keyboard: Some(ReplyMarkup::Keyboard(KeyboardMarkup::new(
                buttons
                    .into_iter()
                    .map(|b| vec![KeyboardButton::new(b)])
                    .collect::<Vec<_>>(),
            ))),
        }
    }

    /// A message that also hides the previous keyboard.
    pub fn clearing(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            keyboard: Some(ReplyMarkup::KeyboardRemove(KeyboardRemove::new())),
        }
    }
}

pub async fn send_all(bot: &Bot, chat_id: ChatId, replies: Vec<Reply>) -> ResponseResult<()> {
    for reply in replies {
        let mut request = bot.send_message(chat_id, reply.text).parse_mode(ParseMode::Html);
        if let Some(keyboard) = reply.keyboard {
            request = request.reply_markup(keyboard);
        }
        request.await?;
    }
    Ok(())
}

pub fn welcome(player_name: &str) -> Reply {
    Reply::text(format!(
        "Prazer, {}! Boa sorte. Para recomeçar a qualquer momento, envie {}. Para conhecer o projeto, envie {}.",
        escape(player_name),
        RESTART_COMMAND,
        ABOUT_COMMAND
    ))
}

/// What the player should see for the phase the quiz is in right now.
pub fn prompt(quiz: &Quiz) -> Vec<Reply> {
    match quiz.phase() {
        Phase::NotStarted => vec![Reply::text(GREETING_TEXT)],
        Phase::Answering => question(quiz).into_iter().collect(),
        Phase::MiniGame => quiz.active_mini_game().map(board).into_iter().collect(),
        Phase::Finished => results(quiz),
    }
}

/// Messages introducing whatever `advance` made live.
pub fn advanced(quiz: &Quiz, advance: Advance) -> Vec<Reply> {
    match advance {
        Advance::MiniGame(_) => {
            let mut replies = Vec::new();
            if let Some(game) = quiz.active_mini_game() {
                replies.push(mini_game_intro(quiz, game));
            }
            replies.extend(prompt(quiz));
            replies
        }
        Advance::Question(_) | Advance::Finished => prompt(quiz),
    }
}

pub fn question(quiz: &Quiz) -> Option<Reply> {
    let question = quiz.current_question()?;
    let number = quiz.state().current_index + 1;
    let text = format!(
        "{} · {} · ⏱ {}s\n\n{}",
        bold(&format!("Pergunta {}/{}", number, quiz.total_questions())),
        question.difficulty().label(),
        quiz.time_remaining(),
        escape(&question.question.text)
    );
    Some(Reply::with_keyboard(text, question.presented_options.clone()))
}

/// Verdict on the most recently answered question.
pub fn feedback(quiz: &Quiz) -> Option<Reply> {
    let (question, answer) = quiz.last_answered()?;
    let correct_option = escape(correct_text(question));
    let verdict = match answer {
        _ if question.is_correct(answer) => "✅ Correto!".to_string(),
        Answer::TimedOut => format!("⏰ Tempo esgotado! Resposta certa: {}", bold(&correct_option)),
        Answer::Chosen(_) => format!("❌ Incorreto. Resposta certa: {}", bold(&correct_option)),
    };
    Some(Reply::text(format!("{}\n\n{}", verdict, explained(question))))
}

fn correct_text(question: &ShuffledQuestion) -> &str {
    &question.presented_options[question.presented_correct_index]
}

/// Explanation line plus the media link, if the question has one.
fn explained(question: &ShuffledQuestion) -> String {
    let mut text = format!("💡 {}", escape(&question.question.explanation));
    if let Some(media) = &question.question.media_ref {
        text.push_str(&format!("\n🎬 {}", escape(media)));
    }
    text
}

pub fn not_an_option() -> Reply {
    Reply::text("Escolha uma das alternativas do teclado.")
}

fn mini_game_intro(quiz: &Quiz, game: &ActiveMiniGame) -> Reply {
    Reply::text(format!(
        "🧠 {}\nLigue cada termo à sua definição. Você tem {}s!",
        bold(&format!("Jogo da memória {}: {}", game.number, escape(&game.name))),
        quiz.time_remaining()
    ))
}

pub fn board(game: &ActiveMiniGame) -> Reply {
    let board = &game.board;
    let progress = format!("Pares encontrados: {}/{}", board.matched(), board.len());

    if let Some(term) = board.selected_left().and_then(|cell| board.left_text(cell)) {
        return Reply::with_keyboard(
            format!("{}\nTermo: {}\nAgora escolha a definição.", progress, bold(&escape(term))),
            texts(board.unmatched_right()),
        );
    }
    if let Some(definition) = board.selected_right().and_then(|cell| board.right_text(cell)) {
        return Reply::with_keyboard(
            format!("{}\nDefinição: {}\nAgora escolha o termo.", progress, bold(&escape(definition))),
            texts(board.unmatched_left()),
        );
    }
    Reply::with_keyboard(format!("{}\nEscolha um termo.", progress), texts(board.unmatched_left()))
}

fn texts(cells: Vec<(usize, &str)>) -> Vec<String> {
    cells.into_iter().map(|(_, text)| text.to_string()).collect()
}

pub fn matched() -> Reply {
    Reply::text("✔️ Par correto!")
}

pub fn mismatch() -> Reply {
    Reply::text("✖️ Esses dois não formam um par.")
}

pub fn not_on_board() -> Reply {
    Reply::text("Escolha um item do teclado.")
}

/// Summary of the mini-game that was just completed.
pub fn mini_game_done(quiz: &Quiz, timed_out: bool, pairs: usize) -> Option<Reply> {
    let score = *quiz.state().mini_game_scores.last()?;
    let header = if timed_out {
        "⏰ Tempo esgotado no jogo da memória!"
    } else {
        "🎉 Jogo da memória concluído!"
    };
    Some(Reply::text(format!("{}\nVocê conectou {} de {} pares.", header, score, pairs)))
}

/// Messages for a countdown that ran out while the quiz was in `phase`.
pub fn expired(quiz: &Quiz, phase: Phase, pairs: usize, advance: Advance) -> Vec<Reply> {
    let mut replies = Vec::new();
    match phase {
        Phase::Answering => replies.extend(feedback(quiz)),
        Phase::MiniGame => replies.extend(mini_game_done(quiz, true, pairs)),
        _ => {}
    }
    replies.extend(advanced(quiz, advance));
    replies
}

pub fn performance_title(performance: Performance) -> &'static str {
    match performance {
        Performance::Excellent => "🏆 PERFORMANCE EXCEPCIONAL!",
        Performance::VeryGood => "🥇 ÓTIMA PERFORMANCE!",
        Performance::Good => "⭐ BOA PERFORMANCE!",
        Performance::KeepStudying => "📚 CONTINUE ESTUDANDO!",
    }
}

pub fn performance_message(performance: Performance, name: &str) -> String {
    match performance {
        Performance::Excellent => format!("Excelente, {}! Você é um verdadeiro conhecedor da Ordem DeMolay! Seu conhecimento é impressionante e demonstra grande dedicação aos estudos da Ordem.", name),
        Performance::VeryGood => format!("Muito bom, {}! Você tem um sólido conhecimento sobre a Ordem DeMolay. Continue assim e logo será um expert no assunto!", name),
        Performance::Good => format!("Bom trabalho, {}! Você está no caminho certo. Continue estudando para aprimorar ainda mais seus conhecimentos sobre a Ordem DeMolay.", name),
        Performance::KeepStudying => format!("Continue estudando, {}! A Ordem DeMolay tem muito a ensinar. Não desanime, cada erro é uma oportunidade de aprendizado!", name),
    }
}

pub fn memory_message(stats: &GameStats) -> String {
    match stats.memory_feedback() {
        MemoryFeedback::Great => "🎉 Excelente memória! Você domina os conceitos da Ordem!".to_string(),
        MemoryFeedback::Good => format!(
            "🧠 Boa memória! Você conectou {} de {} conceitos.",
            stats.total_mini_game_score, stats.max_mini_game_score
        ),
        MemoryFeedback::KeepPracticing => format!(
            "💪 Continue praticando! Você conectou {} de {} conceitos.",
            stats.total_mini_game_score, stats.max_mini_game_score
        ),
    }
}

/// Results screen followed by the share card.
pub fn results(quiz: &Quiz) -> Vec<Reply> {
    let stats = quiz.stats();
    let name = escape(&quiz.state().player_name);
    let performance = stats.performance();

    let tiers = Difficulty::PROGRESSION
        .iter()
        .map(|tier| {
            format!(
                "• {}: {}/{}",
                tier.label(),
                stats.correct_in(*tier),
                tier_size(quiz, *tier)
            )
        })
        .collect::<Vec<_>>()
        .join("\n");
    let games = stats
        .mini_game_scores
        .iter()
        .enumerate()
        .map(|(i, score)| format!("• Jogo {}: {}", i + 1, score))
        .collect::<Vec<_>>()
        .join("\n");

    let text = format!(
        "{}\n\n{}\n\n{}\nAcertos: {}/{} ({:.0}%)\n{}\n\n{}\nPares: {}/{} ({:.0}%)\n{}\n{}\n\n{}",
        bold(performance_title(performance)),
        performance_message(performance, &name),
        bold("Perguntas"),
        stats.correct_answers,
        stats.total_questions,
        stats.questions_only_percentage,
        tiers,
        bold("Jogos da memória"),
        stats.total_mini_game_score,
        stats.max_mini_game_score,
        stats.mini_game_only_percentage,
        games,
        memory_message(&stats),
        bold(&format!("Pontuação geral: {:.0}%", stats.combined_percentage)),
    );

    let mut replies = vec![Reply::text(text)];
    replies.extend(review(quiz));
    replies.push(Reply::with_keyboard(
        share_card(quiz, &stats),
        vec![PLAY_AGAIN_BUTTON.to_string()],
    ));
    replies
}

/// Walk through every answered question, one message per tier.
pub fn review(quiz: &Quiz) -> Vec<Reply> {
    let state = quiz.state();
    let reviewed = state
        .shuffled_questions
        .iter()
        .zip(state.answers.iter().copied())
        .enumerate()
        .collect::<Vec<_>>();

    Difficulty::PROGRESSION
        .iter()
        .filter_map(|tier| {
            let entries = reviewed
                .iter()
                .filter(|(_, (question, _))| question.difficulty() == *tier)
                .map(|(index, (question, answer))| reviewed_question(*index, question, *answer))
                .collect::<Vec<_>>();
            if entries.is_empty() {
                return None;
            }
            Some(Reply::text(format!(
                "{}\n\n{}",
                bold(&format!("Revisão das Perguntas · {}", tier.label())),
                entries.join("\n\n")
            )))
        })
        .collect()
}

fn reviewed_question(index: usize, question: &ShuffledQuestion, answer: Answer) -> String {
    let correct = question.is_correct(answer);
    let status = match answer {
        _ if correct => "✅ Correto",
        Answer::TimedOut => "⏰ Tempo esgotado · Não respondida",
        Answer::Chosen(_) => "❌ Incorreto",
    };

    let mut text = format!(
        "{} · {} · {}\n{}\nResposta certa: {}",
        bold(&format!("Pergunta {}", index + 1)),
        question.difficulty().label(),
        status,
        escape(&question.question.text),
        bold(&escape(correct_text(question)))
    );
    if let Answer::Chosen(chosen) = answer {
        if !correct {
            if let Some(option) = question.presented_options.get(chosen) {
                text.push_str(&format!("\nSua resposta: {}", escape(option)));
            }
        }
    }
    text.push('\n');
    text.push_str(&explained(question));
    text
}

pub fn about() -> Reply {
    Reply::text(format!(
        "{}\n\n{}\n\n{}\n\n{}\nUF: Rio Grande do Sul\n• Capitão: Lorenzo Gabriel de Azevedo Viera (ID 70758), capítulos Santo Ângelo nº 306 e Porto Alegre nº 46\n• Desenvolvedor: Gabriel Giovanella (ID 110776), capítulo Cavaleiros da Esperança nº 1063\n• Editor e Videomaker: Augusto Knak (ID 76025), capítulo Venâncio Aires nº 906\n\n{}\n<i>Trinca, trinca, pode acreditar!\nSomos de ouro, viemos pra ganhar!\nForça, união e muito saber,\nTrinca de Ouro vai vencer!</i>\n\n{}\n💥 Finalizou o desafio? Compartilhe o seu resultado no Instagram marcando @demolayrs e @demolaybrasil!",
        bold("Sobre o Projeto"),
        ABOUT_PURPOSE,
        ABOUT_SPIRIT,
        bold("Equipe Trinca de Ouro"),
        bold("Nosso Lema"),
        bold("Compartilhe seu resultado!"),
    ))
}

/// Compact card meant to be forwarded or screenshotted.
pub fn share_card(quiz: &Quiz, stats: &GameStats) -> String {
    let tiers = Difficulty::PROGRESSION
        .iter()
        .map(|tier| format!("{} {}/{}", tier.label(), stats.correct_in(*tier), tier_size(quiz, *tier)))
        .collect::<Vec<_>>()
        .join(" · ");
    format!(
        "🏆 {}\nOrdem DeMolay\n\nParabéns, {}!\n\n✅ {} acertos · 📊 {:.0}% de aproveitamento\n🧠 {}/{} pares na memória\n{}",
        bold("Desafio da Trinca"),
        bold(&escape(&quiz.state().player_name)),
        stats.correct_answers,
        stats.combined_percentage,
        stats.total_mini_game_score,
        stats.max_mini_game_score,
        tiers
    )
}

fn tier_size(quiz: &Quiz, tier: Difficulty) -> usize {
    quiz.state()
        .shuffled_questions
        .iter()
        .filter(|q| q.difficulty() == tier)
        .count()
}
