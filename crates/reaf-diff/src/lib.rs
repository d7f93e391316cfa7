//! Line diff engine for requirement review.
//!
//! Compares an original and a proposed requirement text line by line and
//! produces a single merged sequence of [`DiffLine`]s. The review screen
//! renders that sequence as two aligned columns (see [`side_by_side`]).
//!
//! # Key Types
//!
//! - [`diff`] -- Greedy one-line-lookahead diff (the default)
//! - [`diff_with`] / [`DiffStrategy`] -- Opt-in full Myers diff
//! - [`DiffLine`] / [`DiffKind`] -- One emitted line of the merged sequence
//! - [`DiffRow`] -- One row of the two-column rendering
//!
//! The engine has no error conditions: any two strings, including empty ones,
//! produce a valid sequence.

pub mod columns;
pub mod line_diff;
pub mod myers;

pub use columns::{side_by_side, DiffRow};
pub use line_diff::{
    diff, reconstruct_original, reconstruct_proposed, DiffKind, DiffLine, DiffSummary,
};
pub use myers::diff_myers;

/// Algorithm used to align the two texts.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DiffStrategy {
    /// One-line lookahead. Cheap; misaligns on multi-line insertions and
    /// deletions.
    #[default]
    Lookahead,
    /// Minimal edit script via the Myers algorithm.
    Myers,
}

/// Diff two texts with an explicit strategy.
pub fn diff_with(strategy: DiffStrategy, original: &str, proposed: &str) -> Vec<DiffLine> {
    match strategy {
        DiffStrategy::Lookahead => diff(original, proposed),
        DiffStrategy::Myers => diff_myers(original, proposed),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_strategy_is_lookahead() {
        assert_eq!(DiffStrategy::default(), DiffStrategy::Lookahead);
        let a = "A\nD";
        let b = "A\nB\nC\nD";
        assert_eq!(diff_with(DiffStrategy::default(), a, b), diff(a, b));
    }

    #[test]
    fn strategies_agree_on_single_line_edits() {
        for (a, b) in [("A\nC", "A\nB\nC"), ("A\nB\nC", "A\nC")] {
            assert_eq!(
                diff_with(DiffStrategy::Lookahead, a, b),
                diff_with(DiffStrategy::Myers, a, b)
            );
        }
    }
}
