use crate::error::GameError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cell {
    Word (String),
    Marked,
}

/// A participant's square of words, stored row-major.
///
/// Cells only ever move from `Word` to `Marked`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grid {
    size: usize,
    cells: Vec<Cell>,
}

impl Grid {
    pub fn construct(words: Vec<String>, size: usize) -> Result<Grid, GameError> {
        if size == 0 {
            return Err(GameError::ZeroGridSize);
        }
        let expected = size * size;
        if words.len() != expected {
            return Err(GameError::GridShape { size, expected, got: words.len() });
        }
        Ok(Grid {
            size,
            cells: words.into_iter().map(Cell::Word).collect(),
        })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn cell(&self, row: usize, col: usize) -> Option<&Cell> {
        if row >= self.size || col >= self.size {
            return None;
        }
        self.cells.get(row * self.size + col)
    }

    pub fn rows(&self) -> impl Iterator<Item = &[Cell]> {
        self.cells.chunks(self.size)
    }

    pub fn contains(&self, word: &str) -> bool {
        self.locate(word).is_some()
    }

    pub fn locate(&self, word: &str) -> Option<(usize, usize)> {
        let index = self.cells.iter().position(|cell| matches!(cell, Cell::Word (w) if w == word))?;
        Some((index / self.size, index % self.size))
    }

    pub fn is_marked(&self, row: usize, col: usize) -> bool {
        matches!(self.cell(row, col), Some(Cell::Marked))
    }

    /// Marking twice is a no-op, as is marking outside the grid.
    pub fn mark(&mut self, row: usize, col: usize) {
        if row >= self.size || col >= self.size {
            return;
        }
        self.cells[row * self.size + col] = Cell::Marked;
    }

    pub fn mark_word(&mut self, word: &str) -> Option<(usize, usize)> {
        let (row, col) = self.locate(word)?;
        self.mark(row, col);
        Some((row, col))
    }

    /// Any full row, any full column, or either full diagonal.
    pub fn has_winning_line(&self) -> bool {
        let n = self.size;
        let row = |r: usize| (0..n).all(|c| self.is_marked(r, c));
        let col = |c: usize| (0..n).all(|r| self.is_marked(r, c));

        (0..n).any(row)
            || (0..n).any(col)
            || (0..n).all(|i| self.is_marked(i, i))
            || (0..n).all(|i| self.is_marked(i, n - 1 - i))
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn numbered(size: usize) -> Grid {
        let words = (0..size * size).map(|i| format!("w{i}")).collect();
        Grid::construct(words, size).unwrap()
    }

    fn with_mask(size: usize, mask: u64) -> Grid {
        let mut grid = numbered(size);
        for i in 0..size * size {
            if mask & (1 << i) != 0 {
                grid.mark(i / size, i % size);
            }
        }
        grid
    }

    /// Every row, column and both diagonals as lists of cell indices.
    fn lines(size: usize) -> Vec<Vec<usize>> {
        let mut lines = Vec::new();
        for r in 0..size {
            lines.push((0..size).map(|c| r * size + c).collect());
        }
        for c in 0..size {
            lines.push((0..size).map(|r| r * size + c).collect());
        }
        lines.push((0..size).map(|i| i * size + i).collect());
        lines.push((0..size).map(|i| i * size + (size - 1 - i)).collect());
        lines
    }

    fn expected_win(size: usize, mask: u64) -> bool {
        lines(size).iter().any(|line| line.iter().all(|i| mask & (1 << i) != 0))
    }

    #[test]
    fn construct_is_row_major() {
        let grid = Grid::construct(
            vec!["cloud".into(), "synergy".into(), "pivot".into(), "disrupt".into()],
            2,
        ).unwrap();
        assert_eq!(grid.locate("cloud"), Some((0, 0)));
        assert_eq!(grid.locate("synergy"), Some((0, 1)));
        assert_eq!(grid.locate("pivot"), Some((1, 0)));
        assert_eq!(grid.locate("disrupt"), Some((1, 1)));
        assert_eq!(grid.locate("leverage"), None);
    }

    #[test]
    fn construct_rejects_wrong_word_count() {
        let err = Grid::construct(vec!["a".into(), "b".into(), "c".into()], 2).unwrap_err();
        assert!(matches!(err, GameError::GridShape { size: 2, expected: 4, got: 3 }));
        assert!(matches!(Grid::construct(Vec::new(), 0), Err(GameError::ZeroGridSize)));
    }

    #[test]
    fn matching_is_exact() {
        let grid = Grid::construct(vec!["Cloud".into()], 1).unwrap();
        assert!(grid.contains("Cloud"));
        assert!(!grid.contains("cloud"));
        assert!(!grid.contains("Cloud "));
    }

    #[test]
    fn marked_word_is_no_longer_found() {
        let mut grid = numbered(3);
        assert_eq!(grid.mark_word("w4"), Some((1, 1)));
        assert!(!grid.contains("w4"));
        assert!(grid.is_marked(1, 1));
        assert_eq!(grid.mark_word("w4"), None);
    }

    #[test]
    fn marking_twice_is_idempotent() {
        let mut once = numbered(3);
        once.mark(2, 1);
        let mut twice = numbered(3);
        twice.mark(2, 1);
        twice.mark(2, 1);
        assert_eq!(once, twice);
    }

    #[test]
    fn marking_outside_is_ignored() {
        let mut grid = numbered(2);
        grid.mark(2, 0);
        grid.mark(0, 5);
        assert_eq!(grid, numbered(2));
    }

    #[test]
    fn exhaustive_win_check_for_small_grids() {
        for size in 1..=3 {
            for mask in 0..(1u64 << (size * size)) {
                assert_eq!(
                    with_mask(size, mask).has_winning_line(),
                    expected_win(size, mask),
                    "size {size} mask {mask:b}",
                );
            }
        }
    }

    #[test]
    #[ignore = "walks all 2^25 markings; run with --ignored"]
    fn exhaustive_win_check_for_five_by_five() {
        let base = numbered(5);
        let line_masks: Vec<u64> = lines(5)
            .iter()
            .map(|line| line.iter().fold(0u64, |mask, i| mask | (1 << i)))
            .collect();
        for mask in 0..(1u64 << 25) {
            let mut grid = base.clone();
            for i in 0..25 {
                if mask & (1 << i) != 0 {
                    grid.mark(i / 5, i % 5);
                }
            }
            let expected = line_masks.iter().any(|line| mask & line == *line);
            assert_eq!(grid.has_winning_line(), expected, "mask {mask:b}");
        }
    }

    #[test]
    fn every_single_line_wins_on_five_by_five() {
        for line in lines(5) {
            let mask = line.iter().fold(0u64, |mask, i| mask | (1 << i));
            assert!(with_mask(5, mask).has_winning_line());
            for missing in &line {
                assert!(!with_mask(5, mask & !(1 << missing)).has_winning_line());
            }
        }
    }

    #[test]
    fn both_diagonals_count_on_even_grids() {
        let mut grid = numbered(4);
        for i in 0..4 {
            grid.mark(i, 3 - i);
        }
        assert!(grid.has_winning_line());
    }

    #[test]
    fn left_column_wins() {
        let mut grid = Grid::construct(
            vec!["cloud".into(), "synergy".into(), "pivot".into(), "disrupt".into()],
            2,
        ).unwrap();
        grid.mark_word("cloud");
        assert!(!grid.has_winning_line());
        grid.mark_word("pivot");
        assert!(grid.has_winning_line());
    }

    proptest! {
        #[test]
        fn win_check_matches_line_enumeration_on_five_by_five(mask in 0u64..(1 << 25)) {
            prop_assert_eq!(with_mask(5, mask).has_winning_line(), expected_win(5, mask));
        }
    }
}
