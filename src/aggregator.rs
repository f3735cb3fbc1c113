//! Per-file merge of reconciled matches
//!
//! Batches finish in arbitrary order. Records are keyed by file and line
//! number so the merged view is sorted and free of duplicates no matter how
//! the batches arrived.

use crate::reconciler::{BatchMatches, MatchRecord};
use std::collections::BTreeMap;

/// All matches of a run: file path → line number → line text
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchResult {
    files: BTreeMap<String, BTreeMap<usize, String>>,
}

impl SearchResult {
    /// Create an empty result
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge one batch's matches; a line already present is kept once
    pub fn merge(&mut self, matches: BatchMatches) {
        for (path, records) in matches {
            if records.is_empty() {
                continue;
            }
            let lines = self.files.entry(path).or_default();
            for record in records {
                lines.entry(record.line_number).or_insert(record.text);
            }
        }
    }

    /// True if no file has any match
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Number of files with at least one match
    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    /// Number of matched lines across all files
    pub fn match_count(&self) -> usize {
        self.files.values().map(BTreeMap::len).sum()
    }

    /// Sorted records for one file
    pub fn matches_for(&self, path: &str) -> Option<Vec<MatchRecord>> {
        self.files.get(path).map(to_records)
    }

    /// Files in path order, each with records ascending by line number
    pub fn iter(&self) -> impl Iterator<Item = (&str, Vec<MatchRecord>)> + '_ {
        self.files
            .iter()
            .map(|(path, lines)| (path.as_str(), to_records(lines)))
    }

    /// Consume into the final mapping handed to presentation
    pub fn into_files(self) -> BTreeMap<String, Vec<MatchRecord>> {
        self.files
            .into_iter()
            .map(|(path, lines)| {
                let records = lines
                    .into_iter()
                    .map(|(line_number, text)| MatchRecord { line_number, text })
                    .collect();
                (path, records)
            })
            .collect()
    }
}

fn to_records(lines: &BTreeMap<usize, String>) -> Vec<MatchRecord> {
    lines
        .iter()
        .map(|(&line_number, text)| MatchRecord {
            line_number,
            text: text.clone(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(line_number: usize, text: &str) -> MatchRecord {
        MatchRecord {
            line_number,
            text: text.to_string(),
        }
    }

    fn batch(entries: &[(&str, &[(usize, &str)])]) -> BatchMatches {
        entries
            .iter()
            .map(|(path, lines)| {
                let records = lines.iter().map(|&(n, t)| record(n, t)).collect();
                (path.to_string(), records)
            })
            .collect()
    }

    #[test]
    fn test_sorted_by_line_number() {
        let mut result = SearchResult::new();
        result.merge(batch(&[("a.rs", &[(40, "late"), (3, "early")])]));
        result.merge(batch(&[("a.rs", &[(12, "middle")])]));

        assert_eq!(
            result.matches_for("a.rs").unwrap(),
            vec![record(3, "early"), record(12, "middle"), record(40, "late")]
        );
        assert_eq!(result.match_count(), 3);
    }

    #[test]
    fn test_duplicates_collapse() {
        let mut result = SearchResult::new();
        result.merge(batch(&[("a.rs", &[(5, "x")])]));
        result.merge(batch(&[("a.rs", &[(5, "x"), (6, "y")])]));

        assert_eq!(result.matches_for("a.rs").unwrap().len(), 2);
    }

    #[test]
    fn test_arrival_order_irrelevant() {
        let batches = vec![
            batch(&[("b.rs", &[(9, "nine")]), ("a.rs", &[(2, "two")])]),
            batch(&[("a.rs", &[(1, "one"), (7, "seven")])]),
            batch(&[("c.rs", &[(4, "four")]), ("b.rs", &[(1, "one")])]),
        ];

        let mut forward = SearchResult::new();
        for b in batches.iter().cloned() {
            forward.merge(b);
        }
        let mut backward = SearchResult::new();
        for b in batches.into_iter().rev() {
            backward.merge(b);
        }

        assert_eq!(forward, backward);
        let files: Vec<&str> = forward.iter().map(|(path, _)| path).collect();
        assert_eq!(files, vec!["a.rs", "b.rs", "c.rs"]);
    }

    #[test]
    fn test_empty_batches_add_nothing() {
        let mut result = SearchResult::new();
        result.merge(BatchMatches::new());
        assert!(result.is_empty());
        assert_eq!(result.file_count(), 0);
        assert!(result.into_files().is_empty());
    }
}
