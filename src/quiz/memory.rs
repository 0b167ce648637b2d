use rand::Rng;

use crate::quiz::shuffle::shuffle_items;
use crate::quiz::MemoryPair;

/// Outcome of selecting a cell on the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    /// Waiting for a cell on the other side.
    Pending,
    Matched,
    Mismatch,
    AlreadyMatched,
}

/// Term/definition matching board of one mini-game.
///
/// Both columns are shuffled independently. Cells hold the index of the pair
/// they came from, so a left and a right cell match when they share it.
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryBoard {
    pairs: Vec<MemoryPair>,
    left: Vec<usize>,
    right: Vec<usize>,
    matched: Vec<bool>,
    selected_left: Option<usize>,
    selected_right: Option<usize>,
}

impl MemoryBoard {
    pub fn new<R: Rng + ?Sized>(pairs: &[MemoryPair], rng: &mut R) -> Self {
        let order = (0..pairs.len()).collect::<Vec<_>>();
        Self {
            pairs: pairs.to_vec(),
            left: shuffle_items(&order, rng),
            right: shuffle_items(&order, rng),
            matched: vec![false; pairs.len()],
            selected_left: None,
            selected_right: None,
        }
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn left_text(&self, cell: usize) -> Option<&str> {
        self.left.get(cell).map(|&pair| self.pairs[pair].left.as_str())
    }

    pub fn right_text(&self, cell: usize) -> Option<&str> {
        self.right.get(cell).map(|&pair| self.pairs[pair].right.as_str())
    }

    /// Left cells still open for matching, as `(cell, text)`.
    pub fn unmatched_left(&self) -> Vec<(usize, &str)> {
        self.left
            .iter()
            .enumerate()
            .filter(|(_, pair)| !self.matched[**pair])
            .map(|(cell, &pair)| (cell, self.pairs[pair].left.as_str()))
            .collect()
    }

    pub fn unmatched_right(&self) -> Vec<(usize, &str)> {
        self.right
            .iter()
            .enumerate()
            .filter(|(_, pair)| !self.matched[**pair])
            .map(|(cell, &pair)| (cell, self.pairs[pair].right.as_str()))
            .collect()
    }

    pub fn selected_left(&self) -> Option<usize> {
        self.selected_left
    }

    pub fn selected_right(&self) -> Option<usize> {
        self.selected_right
    }

    pub fn select_left(&mut self, cell: usize) -> Option<Selection> {
        let pair = *self.left.get(cell)?;
        if self.matched[pair] {
            return Some(Selection::AlreadyMatched);
        }
        self.selected_left = Some(cell);
        Some(self.resolve())
    }

    pub fn select_right(&mut self, cell: usize) -> Option<Selection> {
        let pair = *self.right.get(cell)?;
        if self.matched[pair] {
            return Some(Selection::AlreadyMatched);
        }
        self.selected_right = Some(cell);
        Some(self.resolve())
    }

    fn resolve(&mut self) -> Selection {
        let (Some(left), Some(right)) = (self.selected_left, self.selected_right) else {
            return Selection::Pending;
        };
        self.selected_left = None;
        self.selected_right = None;

        let pair = self.left[left];
        if pair == self.right[right] {
            self.matched[pair] = true;
            Selection::Matched
        } else {
            Selection::Mismatch
        }
    }

    pub fn matched(&self) -> u32 {
        self.matched.iter().filter(|m| **m).count() as u32
    }

    pub fn is_complete(&self) -> bool {
        self.matched.iter().all(|m| *m)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quiz::Content;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn board() -> MemoryBoard {
        let content = Content::builtin().unwrap();
        MemoryBoard::new(&content.memory_games[1].pairs, &mut StdRng::seed_from_u64(9))
    }

    fn right_cell_for(board: &MemoryBoard, left_cell: usize) -> usize {
        let pair = board.left[left_cell];
        board.right.iter().position(|&p| p == pair).unwrap()
    }

    #[test]
    fn columns_are_permutations_of_the_pairs() {
        let board = board();
        let mut left = board.unmatched_left().iter().map(|(_, t)| t.to_string()).collect::<Vec<_>>();
        left.sort();
        let mut expected = board.pairs.iter().map(|p| p.left.clone()).collect::<Vec<_>>();
        expected.sort();
        assert_eq!(left, expected);
        assert_eq!(board.unmatched_right().len(), 6);
        assert_eq!(board.matched(), 0);
        assert!(!board.is_complete());
    }

    #[test]
    fn matching_pair_counts_once() {
        let mut board = board();
        let right = right_cell_for(&board, 0);

        assert_eq!(board.select_left(0), Some(Selection::Pending));
        assert_eq!(board.select_right(right), Some(Selection::Matched));
        assert_eq!(board.matched(), 1);

        assert_eq!(board.select_left(0), Some(Selection::AlreadyMatched));
        assert_eq!(board.select_right(right), Some(Selection::AlreadyMatched));
        assert_eq!(board.matched(), 1);
        assert_eq!(board.unmatched_left().len(), 5);
    }

    #[test]
    fn mismatch_clears_selection() {
        let mut board = board();
        let right = right_cell_for(&board, 0);
        let wrong = (0..board.len()).find(|&cell| cell != right).unwrap();

        assert_eq!(board.select_right(wrong), Some(Selection::Pending));
        assert_eq!(board.select_left(0), Some(Selection::Mismatch));
        assert_eq!(board.selected_left(), None);
        assert_eq!(board.selected_right(), None);
        assert_eq!(board.matched(), 0);
    }

    #[test]
    fn reselecting_same_side_replaces_pending_cell() {
        let mut board = board();
        let right = right_cell_for(&board, 1);
        assert_eq!(board.select_left(0), Some(Selection::Pending));
        assert_eq!(board.select_left(1), Some(Selection::Pending));
        assert_eq!(board.select_right(right), Some(Selection::Matched));
    }

    #[test]
    fn out_of_range_cell_is_rejected() {
        let mut board = board();
        assert_eq!(board.select_left(6), None);
        assert_eq!(board.select_right(42), None);
        assert_eq!(board.selected_left(), None);
    }

    #[test]
    fn completes_when_all_pairs_matched() {
        let mut board = board();
        for cell in 0..board.len() {
            let right = right_cell_for(&board, cell);
            board.select_left(cell);
            assert_eq!(board.select_right(right), Some(Selection::Matched));
        }
        assert_eq!(board.matched(), 6);
        assert!(board.is_complete());
        assert!(board.unmatched_right().is_empty());
    }
}
