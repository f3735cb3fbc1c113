//! Search orchestration and result formatting
//!
//! Turns discovered files into batches, sends them through the dispatcher
//! and formats the aggregated matches for terminal display, plain `grep`
//! style output or JSON.

use crate::aggregator::SearchResult;
use crate::batcher::{pack_batches, Batch};
use crate::chunker::Chunker;
use crate::client::MatchingService;
use crate::config::Config;
use crate::discovery::SourceFile;
use crate::dispatcher::{BatchFailure, Dispatcher};
use crate::error::Result;
use colored::*;
use indicatif::ProgressBar;
use std::sync::Arc;
use tracing::info;

/// Batches prepared for one run
pub struct SearchPlan {
    /// Number of files that went into the batches
    pub files: usize,
    /// Batches in dispatch order
    pub batches: Vec<Batch>,
    max_chars: usize,
}

impl SearchPlan {
    /// Chunk and pack `files` under the configured budget
    pub fn build(files: &[SourceFile], config: &Config) -> Self {
        let chunker = Chunker::new(config.max_chars);
        let chunks = files
            .iter()
            .flat_map(|file| chunker.chunk_file(&file.relative_path, &file.content));
        let batches = pack_batches(chunks, config.max_chars);

        info!("Packed {} files into {} batches", files.len(), batches.len());

        Self {
            files: files.len(),
            batches,
            max_chars: config.max_chars,
        }
    }

    /// Characters across all batches
    pub fn total_chars(&self) -> usize {
        self.batches.iter().map(Batch::total_chars).sum()
    }

    /// Rough token estimate (4 characters per token)
    pub fn estimated_tokens(&self) -> usize {
        self.total_chars() / 4
    }

    /// Batches over budget, with their 1-based position
    pub fn oversized(&self) -> Vec<(usize, &Batch)> {
        self.batches
            .iter()
            .enumerate()
            .filter(|(_, b)| b.is_oversized(self.max_chars))
            .map(|(i, b)| (i + 1, b))
            .collect()
    }
}

/// Result of a search run
#[derive(Debug)]
pub struct SearchOutcome {
    /// Matches per file
    pub result: SearchResult,
    /// Batches that could not be searched
    pub failures: Vec<BatchFailure>,
    /// Number of batches sent
    pub batches: usize,
}

impl SearchOutcome {
    /// A run succeeds when at least one line matched, regardless of failures
    pub fn is_success(&self) -> bool {
        !self.result.is_empty()
    }
}

/// Semantic searcher
pub struct Searcher<S: MatchingService + 'static> {
    service: Arc<S>,
    config: Config,
}

impl<S: MatchingService + 'static> Searcher<S> {
    /// Create a searcher backed by `service`
    pub fn new(service: S, config: Config) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            service: Arc::new(service),
            config,
        })
    }

    /// Plan batches for `files`
    pub fn plan(&self, files: &[SourceFile]) -> SearchPlan {
        SearchPlan::build(files, &self.config)
    }

    /// Search `files` for lines matching `query`
    pub async fn search(&self, query: &str, files: &[SourceFile]) -> SearchOutcome {
        self.search_with_progress(query, files, ProgressBar::hidden())
            .await
    }

    /// Search, reporting finished batches on `progress`
    pub async fn search_with_progress(
        &self,
        query: &str,
        files: &[SourceFile],
        progress: ProgressBar,
    ) -> SearchOutcome {
        let plan = self.plan(files);
        let batches = plan.batches.len();

        let report = Dispatcher::new(Arc::clone(&self.service), self.config.workers)
            .with_progress(progress)
            .dispatch(query, plan.batches)
            .await;

        info!(
            "{} of {} batches answered, {} lines matched",
            report.completed,
            batches,
            report.result.match_count()
        );

        SearchOutcome {
            result: report.result,
            failures: report.failures,
            batches,
        }
    }
}

/// Format results for terminal display
pub fn format_results(result: &SearchResult) -> String {
    let mut output = String::new();

    for (i, (path, matches)) in result.iter().enumerate() {
        if i > 0 {
            output.push('\n');
        }
        output.push_str(&format!("{}\n", path.bold()));

        let width = matches
            .last()
            .map(|m| m.line_number.to_string().len())
            .unwrap_or(1);
        let mut prev: Option<usize> = None;

        for m in &matches {
            // Gap marker between non-contiguous matches
            if prev.is_some_and(|p| m.line_number - p > 1) {
                output.push('\n');
            }
            output.push_str(&format!(
                "{} {}\n",
                format!("{:>width$}│", m.line_number, width = width).dimmed(),
                m.text
            ));
            prev = Some(m.line_number);
        }
    }

    output
}

/// Format results as `path:line:text`, one match per line
pub fn format_results_plain(result: &SearchResult) -> String {
    let mut output = String::new();

    for (path, matches) in result.iter() {
        for m in matches {
            output.push_str(&format!("{}:{}:{}\n", path, m.line_number, m.text));
        }
    }

    output
}

/// Format results as JSON
pub fn format_results_json(result: &SearchResult) -> Result<String> {
    use serde::Serialize;

    #[derive(Serialize)]
    struct JsonLine {
        line: usize,
        text: String,
    }

    #[derive(Serialize)]
    struct JsonResult {
        file: String,
        matches: Vec<JsonLine>,
    }

    let json_results: Vec<JsonResult> = result
        .iter()
        .map(|(path, matches)| JsonResult {
            file: path.to_string(),
            matches: matches
                .into_iter()
                .map(|m| JsonLine {
                    line: m.line_number,
                    text: m.text,
                })
                .collect(),
        })
        .collect();

    Ok(serde_json::to_string_pretty(&json_results)?)
}

/// Format a dry-run summary
pub fn format_plan(plan: &SearchPlan) -> String {
    let mut output = format!(
        "Would search {} files in {} batches (~{} tokens total)\n",
        plan.files,
        plan.batches.len(),
        plan.estimated_tokens()
    );

    let oversized = plan.oversized();
    if !oversized.is_empty() {
        output.push_str(&format!(
            "  {} {} oversized batches (may exceed context window):\n",
            "⚠".yellow(),
            oversized.len()
        ));
        for (n, batch) in oversized {
            output.push_str(&format!(
                "    Batch {}: {} ({} tokens)\n",
                n,
                batch.labels().join(", "),
                batch.total_chars() / 4
            ));
        }
    }

    output
}
