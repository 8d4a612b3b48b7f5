use rand::Rng;
use rand::seq::SliceRandom;

use quiz_core::model::Question;

/// Returns a uniformly random permutation of `items`, leaving the input untouched.
///
/// Uses the Fisher-Yates shuffle from `rand`.
pub fn shuffled<T: Clone, R: Rng + ?Sized>(items: &[T], rng: &mut R) -> Vec<T> {
    let mut out = items.to_vec();
    out.shuffle(rng);
    out
}

/// Returns a copy of `question` with its options permuted.
///
/// The correct-option index is re-derived from the permutation so it still
/// names the same option text.
pub fn shuffle_options<R: Rng + ?Sized>(question: &Question, rng: &mut R) -> Question {
    let order: Vec<usize> = shuffled(
        &(0..question.options().len()).collect::<Vec<_>>(),
        rng,
    );
    question
        .reorder_options(&order)
        .unwrap_or_else(|| question.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiz_core::model::{QuestionId, TopicId};
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::collections::HashMap;

    fn build_question(correct: usize) -> Question {
        Question::new(
            QuestionId::new(1),
            TopicId::new("1.1").unwrap(),
            "Q",
            vec!["alpha".into(), "beta".into(), "gamma".into(), "delta".into()],
            correct,
        )
        .unwrap()
    }

    #[test]
    fn shuffled_leaves_input_untouched() {
        let items = vec![1, 2, 3, 4, 5, 6, 7, 8];
        let mut rng = StdRng::seed_from_u64(7);
        let out = shuffled(&items, &mut rng);

        assert_eq!(items, vec![1, 2, 3, 4, 5, 6, 7, 8]);
        let mut sorted = out.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, items);
    }

    #[test]
    fn shuffled_is_roughly_uniform() {
        let items = ['a', 'b', 'c'];
        let mut rng = StdRng::seed_from_u64(42);
        let mut counts: HashMap<Vec<char>, usize> = HashMap::new();
        for _ in 0..6_000 {
            *counts.entry(shuffled(&items, &mut rng)).or_default() += 1;
        }

        assert_eq!(counts.len(), 6);
        for count in counts.values() {
            assert!((800..=1_200).contains(count), "skewed count {count}");
        }
    }

    #[test]
    fn option_shuffle_keeps_correct_text() {
        for seed in 0..200 {
            let mut rng = StdRng::seed_from_u64(seed);
            let correct = usize::try_from(seed % 4).unwrap();
            let question = build_question(correct);
            let shuffled = shuffle_options(&question, &mut rng);

            assert_eq!(shuffled.correct_option(), question.correct_option());
            assert_eq!(shuffled.options().len(), question.options().len());
            assert_eq!(shuffled.id(), question.id());
        }
    }

    #[test]
    fn option_shuffle_moves_correct_position() {
        let question = build_question(0);
        let mut rng = StdRng::seed_from_u64(3);
        let positions: std::collections::HashSet<usize> = (0..100)
            .map(|_| shuffle_options(&question, &mut rng).correct_answer())
            .collect();
        assert_eq!(positions.len(), 4);
    }
}
