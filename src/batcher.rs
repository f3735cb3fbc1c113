//! Packing chunks into request batches
//!
//! Streaming first-fit: chunks are taken in order and appended to the open
//! batch while they fit. Output composition is fully determined by the input
//! order and the budget.

use crate::chunker::SourceChunk;
use serde::Serialize;

/// Chunks sent together in one request
#[derive(Debug, Clone, Default, Serialize)]
pub struct Batch {
    /// Chunks in file-then-chunk order
    pub chunks: Vec<SourceChunk>,
}

impl Batch {
    /// Combined text length in characters
    pub fn total_chars(&self) -> usize {
        self.chunks.iter().map(SourceChunk::len).sum()
    }

    /// True when the batch is over `max_chars` (only possible for a lone oversized chunk)
    pub fn is_oversized(&self, max_chars: usize) -> bool {
        self.total_chars() > max_chars
    }

    /// Labels of all chunks, for error messages
    pub fn labels(&self) -> Vec<String> {
        self.chunks.iter().map(|c| c.label.clone()).collect()
    }

    /// Number of chunks
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// True if the batch has no chunks
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }
}

/// Pack chunks into batches of at most `max_chars` characters
///
/// A chunk larger than the budget is emitted immediately as its own batch
/// and never merged with its neighbours; the open batch stays open.
pub fn pack_batches<I>(chunks: I, max_chars: usize) -> Vec<Batch>
where
    I: IntoIterator<Item = SourceChunk>,
{
    let mut batches = Vec::new();
    let mut current = Batch::default();
    let mut current_size = 0;

    for chunk in chunks {
        let size = chunk.len();

        if size > max_chars {
            batches.push(Batch {
                chunks: vec![chunk],
            });
            continue;
        }

        if current_size + size > max_chars {
            if !current.is_empty() {
                batches.push(std::mem::take(&mut current));
            }
            current_size = 0;
        }

        current.chunks.push(chunk);
        current_size += size;
    }

    if !current.is_empty() {
        batches.push(current);
    }

    batches
}
