//! Full diff backed by the `similar` crate (Myers algorithm).
//!
//! Produces the same [`DiffLine`] shape and numbering as the lookahead
//! engine, so the column rendering works unchanged.

use similar::{Algorithm, ChangeTag, TextDiff};

use crate::line_diff::{split_lines, DiffKind, DiffLine, LineSink};

/// Diff `original` against `proposed` with a minimal edit script.
pub fn diff_myers(original: &str, proposed: &str) -> Vec<DiffLine> {
    let old = split_lines(original);
    let new = split_lines(proposed);

    let text_diff = TextDiff::configure()
        .algorithm(Algorithm::Myers)
        .diff_slices(&old, &new);

    let mut sink = LineSink::with_capacity(old.len().max(new.len()));
    for change in text_diff.iter_all_changes() {
        let kind = match change.tag() {
            ChangeTag::Equal => DiffKind::Unchanged,
            ChangeTag::Delete => DiffKind::Removed,
            ChangeTag::Insert => DiffKind::Added,
        };
        sink.push(kind, change.value());
    }
    sink.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::line_diff::{reconstruct_original, reconstruct_proposed, DiffSummary};

    #[test]
    fn multi_line_insertion_is_a_clean_block() {
        let d = diff_myers("A\nD", "A\nB\nC\nD");
        let kinds: Vec<DiffKind> = d.iter().map(|l| l.kind).collect();
        assert_eq!(
            kinds,
            vec![
                DiffKind::Unchanged,
                DiffKind::Added,
                DiffKind::Added,
                DiffKind::Unchanged,
            ]
        );
    }

    #[test]
    fn reconstructs_both_sides() {
        let a = "alpha\nbeta\ngamma\ndelta";
        let b = "alpha\ngamma\nepsilon\ndelta\nzeta";
        let d = diff_myers(a, b);
        assert_eq!(reconstruct_original(&d), a);
        assert_eq!(reconstruct_proposed(&d), b);
    }

    #[test]
    fn identical_texts() {
        let d = diff_myers("x\ny", "x\ny");
        assert!(d.is_identical());
        assert_eq!(d.len(), 2);
    }
}
