//! Greedy one-line-lookahead line diff.
//!
//! Walks both texts with independent cursors. When the current lines differ
//! the engine peeks one line ahead on each side to tell a single-line
//! deletion or insertion apart from a replacement. Insertions or deletions
//! spanning two or more consecutive lines come out as REMOVED/ADDED pairs
//! rather than a clean block; callers wanting a minimal script use
//! [`crate::diff_myers`].

use serde::{Deserialize, Serialize};

/// Classification of an emitted line.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiffKind {
    /// Present in both texts.
    Unchanged,
    /// Present only in the proposed text.
    Added,
    /// Present only in the original text.
    Removed,
}

/// One line of the merged diff sequence.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffLine {
    pub kind: DiffKind,
    pub content: String,
    /// 1-based position in the merged sequence, not in either source text.
    pub line_number: usize,
}

impl DiffLine {
    /// Unified-diff style marker: `+`, `-` or a space.
    pub fn marker(&self) -> char {
        match self.kind {
            DiffKind::Unchanged => ' ',
            DiffKind::Added => '+',
            DiffKind::Removed => '-',
        }
    }

    /// Whether the line belongs to the original text.
    pub fn in_original(&self) -> bool {
        self.kind != DiffKind::Added
    }

    /// Whether the line belongs to the proposed text.
    pub fn in_proposed(&self) -> bool {
        self.kind != DiffKind::Removed
    }
}

/// Counts over a diff sequence.
pub trait DiffSummary {
    fn additions(&self) -> usize;
    fn deletions(&self) -> usize;
    fn unchanged(&self) -> usize;

    /// Returns `true` if nothing was added or removed.
    fn is_identical(&self) -> bool {
        self.additions() == 0 && self.deletions() == 0
    }
}

impl DiffSummary for [DiffLine] {
    fn additions(&self) -> usize {
        self.iter().filter(|l| l.kind == DiffKind::Added).count()
    }

    fn deletions(&self) -> usize {
        self.iter().filter(|l| l.kind == DiffKind::Removed).count()
    }

    fn unchanged(&self) -> usize {
        self.iter().filter(|l| l.kind == DiffKind::Unchanged).count()
    }
}

/// Accumulates emitted lines and numbers them.
pub(crate) struct LineSink {
    lines: Vec<DiffLine>,
}

impl LineSink {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            lines: Vec::with_capacity(capacity),
        }
    }

    pub(crate) fn push(&mut self, kind: DiffKind, content: &str) {
        let line_number = self.lines.len() + 1;
        self.lines.push(DiffLine {
            kind,
            content: content.to_string(),
            line_number,
        });
    }

    pub(crate) fn finish(self) -> Vec<DiffLine> {
        self.lines
    }
}

pub(crate) fn split_lines(text: &str) -> Vec<&str> {
    text.split('\n').collect()
}

/// Diff `original` against `proposed` line by line.
pub fn diff(original: &str, proposed: &str) -> Vec<DiffLine> {
    let old = split_lines(original);
    let new = split_lines(proposed);
    let mut sink = LineSink::with_capacity(old.len().max(new.len()));

    let (mut i, mut j) = (0, 0);
    while i < old.len() || j < new.len() {
        if i >= old.len() {
            sink.push(DiffKind::Added, new[j]);
            j += 1;
        } else if j >= new.len() {
            sink.push(DiffKind::Removed, old[i]);
            i += 1;
        } else if old[i] == new[j] {
            sink.push(DiffKind::Unchanged, old[i]);
            i += 1;
            j += 1;
        } else if old.get(i + 1) == Some(&new[j]) {
            sink.push(DiffKind::Removed, old[i]);
            i += 1;
        } else if new.get(j + 1) == Some(&old[i]) {
            sink.push(DiffKind::Added, new[j]);
            j += 1;
        } else {
            sink.push(DiffKind::Removed, old[i]);
            sink.push(DiffKind::Added, new[j]);
            i += 1;
            j += 1;
        }
    }

    sink.finish()
}

/// Rebuild the original text from a diff sequence.
pub fn reconstruct_original(lines: &[DiffLine]) -> String {
    join(lines.iter().filter(|l| l.in_original()))
}

/// Rebuild the proposed text from a diff sequence.
pub fn reconstruct_proposed(lines: &[DiffLine]) -> String {
    join(lines.iter().filter(|l| l.in_proposed()))
}

fn join<'a>(lines: impl Iterator<Item = &'a DiffLine>) -> String {
    lines
        .map(|l| l.content.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn kinds(lines: &[DiffLine]) -> Vec<(DiffKind, &str)> {
        lines.iter().map(|l| (l.kind, l.content.as_str())).collect()
    }

    #[test]
    fn single_line_insertion() {
        let d = diff("A\nC", "A\nB\nC");
        assert_eq!(
            kinds(&d),
            vec![
                (DiffKind::Unchanged, "A"),
                (DiffKind::Added, "B"),
                (DiffKind::Unchanged, "C"),
            ]
        );
    }

    #[test]
    fn single_line_deletion() {
        let d = diff("A\nB\nC", "A\nC");
        assert_eq!(
            kinds(&d),
            vec![
                (DiffKind::Unchanged, "A"),
                (DiffKind::Removed, "B"),
                (DiffKind::Unchanged, "C"),
            ]
        );
    }

    #[test]
    fn single_line_replacement() {
        let d = diff("A\nB\nC", "A\nX\nC");
        assert_eq!(
            kinds(&d),
            vec![
                (DiffKind::Unchanged, "A"),
                (DiffKind::Removed, "B"),
                (DiffKind::Added, "X"),
                (DiffKind::Unchanged, "C"),
            ]
        );
    }

    #[test]
    fn multi_line_insertion_is_not_realigned() {
        let d = diff("A\nD", "A\nB\nC\nD");
        assert_eq!(
            kinds(&d),
            vec![
                (DiffKind::Unchanged, "A"),
                (DiffKind::Removed, "D"),
                (DiffKind::Added, "B"),
                (DiffKind::Added, "C"),
                (DiffKind::Added, "D"),
            ]
        );
    }

    #[test]
    fn line_numbers_count_emitted_lines() {
        let d = diff("A\nB\nC", "A\nX\nC");
        let numbers: Vec<usize> = d.iter().map(|l| l.line_number).collect();
        assert_eq!(numbers, vec![1, 2, 3, 4]);
    }

    #[test]
    fn empty_inputs() {
        let d = diff("", "");
        assert_eq!(kinds(&d), vec![(DiffKind::Unchanged, "")]);

        let d = diff("", "A\nB");
        assert_eq!(
            kinds(&d),
            vec![
                (DiffKind::Removed, ""),
                (DiffKind::Added, "A"),
                (DiffKind::Added, "B"),
            ]
        );
        assert_eq!(reconstruct_original(&d), "");
        assert_eq!(reconstruct_proposed(&d), "A\nB");
    }

    #[test]
    fn trailing_lines_drain_in_order() {
        let d = diff("A\nB\nC\nD", "A");
        assert_eq!(d.deletions(), 3);
        assert_eq!(d.additions(), 0);
        assert_eq!(reconstruct_original(&d), "A\nB\nC\nD");
    }

    #[test]
    fn summary_counts() {
        let d = diff("A\nB\nC", "A\nX\nC");
        assert_eq!(d.additions(), 1);
        assert_eq!(d.deletions(), 1);
        assert_eq!(d.unchanged(), 2);
        assert!(!d.is_identical());
        assert!(diff("same", "same").is_identical());
    }

    #[test]
    fn serializes_with_wire_names() {
        let d = diff("A", "B");
        let json = serde_json::to_value(&d[1]).unwrap();
        assert_eq!(json["kind"], "ADDED");
        assert_eq!(json["lineNumber"], 2);
    }

    fn text() -> impl Strategy<Value = String> {
        prop::collection::vec("[abc]{0,2}", 0..8).prop_map(|lines| lines.join("\n"))
    }

    proptest! {
        #[test]
        fn identical_texts_are_all_unchanged(t in text()) {
            let d = diff(&t, &t);
            prop_assert!(d.iter().all(|l| l.kind == DiffKind::Unchanged));
            prop_assert_eq!(reconstruct_proposed(&d), t);
        }

        #[test]
        fn both_sides_reconstruct(a in text(), b in text()) {
            let d = diff(&a, &b);
            prop_assert_eq!(reconstruct_original(&d), a);
            prop_assert_eq!(reconstruct_proposed(&d), b);
        }

        #[test]
        fn line_numbers_are_dense(a in text(), b in text()) {
            let d = diff(&a, &b);
            for (idx, line) in d.iter().enumerate() {
                prop_assert_eq!(line.line_number, idx + 1);
            }
        }
    }
}
