use rand::seq::SliceRandom;
use rand::Rng;

use crate::quiz::{Difficulty, Question, ShuffledQuestion};

/// Returns a uniformly random permutation of `items`, leaving the input untouched.
pub fn shuffle_items<T: Clone, R: Rng + ?Sized>(items: &[T], rng: &mut R) -> Vec<T> {
    let mut shuffled = items.to_vec();
    // `SliceRandom::shuffle` is a Fisher-Yates shuffle
    shuffled.shuffle(rng);
    shuffled
}

/// Permutes the options of `question` and tracks where the correct one ended up.
///
/// The correct option is found again by text, taking the first match. Two options
/// with identical text would make this ambiguous; content validation rejects
/// such questions before they get here.
pub fn shuffle_question_options<R: Rng + ?Sized>(question: &Question, rng: &mut R) -> ShuffledQuestion {
    let correct = question.correct_option();
    let presented_options = shuffle_items(&question.options, rng);
    let presented_correct_index = presented_options
        .iter()
        .position(|option| option == correct)
        // a permutation always contains the original correct option
        .unwrap_or(question.correct_index);

    ShuffledQuestion {
        question: question.clone(),
        presented_options,
        presented_correct_index,
    }
}

/// Builds the question order for one session.
///
/// Questions are grouped by tier, each tier is shuffled on its own, the tiers are
/// played easy, medium, hard, and every question gets its options shuffled.
pub fn shuffle_session<R: Rng + ?Sized>(questions: &[Question], rng: &mut R) -> Vec<ShuffledQuestion> {
    let mut ordered = Vec::with_capacity(questions.len());
    for tier in Difficulty::PROGRESSION {
        let group = questions
            .iter()
            .filter(|q| q.difficulty == tier)
            .cloned()
            .collect::<Vec<_>>();
        ordered.extend(shuffle_items(&group, rng));
    }

    ordered
        .iter()
        .map(|question| shuffle_question_options(question, rng))
        .collect()
}
