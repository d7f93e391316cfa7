//! Two-column rendering of a diff sequence.
//!
//! Both columns are derived from the same merged sequence: the original
//! column leaves ADDED slots blank and the proposed column leaves REMOVED
//! slots blank, so row indices line up.

use crate::line_diff::{DiffKind, DiffLine};

/// One aligned row of the side-by-side view.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DiffRow<'a> {
    pub line_number: usize,
    pub kind: DiffKind,
    /// `None` when the line was added.
    pub original: Option<&'a str>,
    /// `None` when the line was removed.
    pub proposed: Option<&'a str>,
}

/// Project a diff sequence into aligned original/proposed columns.
pub fn side_by_side(lines: &[DiffLine]) -> Vec<DiffRow<'_>> {
    lines
        .iter()
        .map(|line| DiffRow {
            line_number: line.line_number,
            kind: line.kind,
            original: line.in_original().then_some(line.content.as_str()),
            proposed: line.in_proposed().then_some(line.content.as_str()),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::line_diff::diff;

    #[test]
    fn columns_stay_aligned() {
        let d = diff("A\nB\nC", "A\nX\nC");
        let rows = side_by_side(&d);
        assert_eq!(rows.len(), d.len());

        let original: Vec<Option<&str>> = rows.iter().map(|r| r.original).collect();
        let proposed: Vec<Option<&str>> = rows.iter().map(|r| r.proposed).collect();
        assert_eq!(original, vec![Some("A"), Some("B"), None, Some("C")]);
        assert_eq!(proposed, vec![Some("A"), None, Some("X"), Some("C")]);
    }

    #[test]
    fn unchanged_rows_fill_both_columns() {
        let d = diff("same\nlines", "same\nlines");
        assert!(side_by_side(&d)
            .iter()
            .all(|r| r.original.is_some() && r.proposed.is_some()));
    }
}
