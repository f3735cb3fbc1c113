//! Text chunking for request batching
//!
//! Splits source files into line-aligned chunks under a character budget.
//! Each chunk remembers where it starts so matches can be mapped back to
//! file-global line numbers.

use serde::{Deserialize, Serialize};

/// A line-aligned slice of one file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceChunk {
    /// Name shown to the service; `path[N:]` when the file was split
    pub label: String,
    /// Source file path (relative to search root)
    pub path: String,
    /// The text content, always ending after a full line
    pub text: String,
    /// Zero-based index of the first line of `text` in the file
    pub line_offset: usize,
}

impl SourceChunk {
    /// Length in characters, as counted against the budget
    pub fn len(&self) -> usize {
        char_len(&self.text)
    }

    /// True if the chunk carries no text
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// Splits file text into chunks no larger than a character budget
pub struct Chunker {
    max_chars: usize,
}

impl Chunker {
    /// Create a new chunker
    ///
    /// # Arguments
    /// * `max_chars` - Budget for each chunk in characters
    pub fn new(max_chars: usize) -> Self {
        Self { max_chars }
    }

    /// Split text into chunks
    ///
    /// A file within budget is a single chunk labelled with its plain path.
    /// Larger files are cut only between lines; a single line longer than the
    /// budget becomes an oversized chunk of its own.
    pub fn chunk_file(&self, file_path: &str, text: &str) -> Vec<SourceChunk> {
        if text.is_empty() {
            return vec![];
        }

        if char_len(text) <= self.max_chars {
            return vec![SourceChunk {
                label: file_path.to_string(),
                path: file_path.to_string(),
                text: text.to_string(),
                line_offset: 0,
            }];
        }

        let mut chunks = Vec::new();
        let mut current = String::new();
        let mut current_size = 0;
        let mut chunk_start = 0;

        for (i, line) in text.split_inclusive('\n').enumerate() {
            let line_len = char_len(line);

            // Close the running chunk if this line would push it over budget
            if current_size + line_len > self.max_chars && !current.is_empty() {
                chunks.push(make_chunk(file_path, std::mem::take(&mut current), chunk_start));
                current_size = 0;
                chunk_start = i;
            }

            current.push_str(line);
            current_size += line_len;
        }

        // Don't forget the last chunk
        if !current.is_empty() {
            chunks.push(make_chunk(file_path, current, chunk_start));
        }

        chunks
    }
}

fn make_chunk(file_path: &str, text: String, line_offset: usize) -> SourceChunk {
    let label = if line_offset > 0 {
        format!("{}[{}:]", file_path, line_offset + 1)
    } else {
        file_path.to_string()
    };

    SourceChunk {
        label,
        path: file_path.to_string(),
        text,
        line_offset,
    }
}

/// Length of `s` in characters
pub(crate) fn char_len(s: &str) -> usize {
    s.chars().count()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbered_lines(count: usize) -> String {
        (1..=count).map(|i| format!("line {:03}\n", i)).collect()
    }

    #[test]
    fn test_chunking_small_file() {
        let chunker = Chunker::new(100);
        let text = "line 1\nline 2\nline 3";
        let chunks = chunker.chunk_file("test.py", text);

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].label, "test.py");
        assert_eq!(chunks[0].line_offset, 0);
        assert_eq!(chunks[0].text, text);
    }

    #[test]
    fn test_chunking_large_file() {
        // each line is 9 chars; budget fits 3 lines
        let chunker = Chunker::new(27);
        let text = numbered_lines(7);
        let chunks = chunker.chunk_file("src/lib.rs", &text);

        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].label, "src/lib.rs");
        assert_eq!(chunks[0].line_offset, 0);
        assert_eq!(chunks[1].label, "src/lib.rs[4:]");
        assert_eq!(chunks[1].line_offset, 3);
        assert_eq!(chunks[2].label, "src/lib.rs[7:]");
        assert_eq!(chunks[2].text, "line 007\n");
        assert!(chunks.iter().all(|c| c.path == "src/lib.rs"));
    }

    #[test]
    fn test_chunks_reassemble_file() {
        let chunker = Chunker::new(40);
        let text = "fn main() {\r\n    let x = 1;\r\n\r\n    println!(\"{x}\");\r\n}\nno newline at end";
        let chunks = chunker.chunk_file("main.rs", text);

        assert!(chunks.len() > 1);
        let rebuilt: String = chunks.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(rebuilt, text);
        assert!(chunks.iter().all(|c| !c.is_empty() && c.len() <= 40));
    }

    #[test]
    fn test_offsets_track_lines() {
        let chunker = Chunker::new(30);
        let text = numbered_lines(20);
        let chunks = chunker.chunk_file("a.txt", &text);

        let mut expected_offset = 0;
        for chunk in &chunks {
            assert_eq!(chunk.line_offset, expected_offset);
            expected_offset += chunk.text.lines().count();
        }
        assert_eq!(expected_offset, 20);
    }

    #[test]
    fn test_oversized_line() {
        let chunker = Chunker::new(10);
        let long = "x".repeat(25);
        let text = format!("short\n{}\nend\n", long);
        let chunks = chunker.chunk_file("big.txt", &text);

        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[1].text, format!("{}\n", long));
        assert!(chunks[1].len() > 10);
        assert_eq!(chunks[1].line_offset, 1);
        assert_eq!(chunks[2].label, "big.txt[3:]");
    }

    #[test]
    fn test_single_line_over_budget_keeps_plain_label() {
        let chunker = Chunker::new(5);
        let chunks = chunker.chunk_file("one.txt", "abcdefghij");

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].label, "one.txt");
        assert_eq!(chunks[0].line_offset, 0);
    }

    #[test]
    fn test_budget_counts_characters() {
        // 4 chars, 12 bytes
        let chunker = Chunker::new(4);
        let chunks = chunker.chunk_file("cjk.txt", "日本語\n");
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].len(), 4);
    }

    #[test]
    fn test_empty_file() {
        let chunker = Chunker::new(100);
        let chunks = chunker.chunk_file("empty.rs", "");
        assert!(chunks.is_empty());
    }
}
