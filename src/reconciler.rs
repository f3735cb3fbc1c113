//! Mapping free-text service output back onto source lines
//!
//! The service is asked to echo matching lines verbatim, but it may reformat
//! whitespace, skip lines, reorder them or repeat them. Each response line is
//! looked up by trimmed equality in every chunk of the batch. Output that
//! matches nothing is dropped; a record is only ever produced for a line that
//! exists in the source.

use crate::batcher::Batch;
use crate::chunker::SourceChunk;
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};

/// One matched source line
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct MatchRecord {
    /// 1-based line number within the file
    pub line_number: usize,
    /// The line exactly as it appears in the file
    pub text: String,
}

/// Matches for one batch, keyed by file path
pub type BatchMatches = BTreeMap<String, Vec<MatchRecord>>;

/// Recover the source lines a batch response refers to
pub fn reconcile(output: &str, batch: &Batch) -> BatchMatches {
    let mut results = BatchMatches::new();

    let response: Vec<&str> = output
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();

    if response.is_empty() {
        return results;
    }

    for chunk in &batch.chunks {
        let matches = find_lines(chunk, &response);
        if !matches.is_empty() {
            results.entry(chunk.path.clone()).or_default().extend(matches);
        }
    }

    results
}

/// Match response lines against one chunk
///
/// Keeps a cursor so in-order output resolves repeated lines (`}`,
/// `} else {`) to successive occurrences. Out-of-order output falls back to a
/// scan from the top. Lines already recorded are passed over, so a repeated
/// reply line lands on the next unrecorded identical line, if any.
pub fn find_lines(chunk: &SourceChunk, response: &[&str]) -> Vec<MatchRecord> {
    let source: Vec<&str> = chunk.text.lines().collect();
    let mut results = Vec::new();
    let mut seen = HashSet::new();
    let mut cursor = 0;

    for wanted in response {
        let wanted = wanted.trim();
        if wanted.is_empty() {
            continue;
        }

        let unrecorded = |i: usize| {
            source[i].trim() == wanted && !seen.contains(&(chunk.line_offset + i + 1))
        };
        let hit = (cursor..source.len())
            .find(|&i| unrecorded(i))
            .or_else(|| (0..source.len()).find(|&i| unrecorded(i)));

        let Some(local) = hit else {
            continue;
        };

        let line_number = chunk.line_offset + local + 1;
        seen.insert(line_number);
        results.push(MatchRecord {
            line_number,
            text: source[local].to_string(),
        });
        cursor = local + 1;
    }

    results
}
