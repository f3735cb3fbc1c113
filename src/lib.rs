//! # vibegrep - grep, but the search engine is an LLM
//!
//! Searches a file tree for lines matching a natural-language query. The
//! judgment is delegated to a chat-completions service; its free-text reply
//! is reconciled back into exact source lines with file paths and line
//! numbers.
//!
//! ## Pipeline
//!
//! - **Discovery**: walks the tree respecting .gitignore, skips binaries
//! - **Chunking**: splits large files on line boundaries under a character budget
//! - **Batching**: packs chunks first-fit into requests under the same budget
//! - **Dispatch**: sends batches through a bounded worker pool with retries
//! - **Reconciliation**: maps reply lines back onto the source, tolerating
//!   reformatting, omissions and reordering
//! - **Aggregation**: merges per file, deduplicated and sorted by line
//!
//! ## Example
//!
//! ```no_run
//! use vibegrep::{discover_files, ChatClient, Config, Searcher, ServiceConfig};
//! use std::path::PathBuf;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::new(PathBuf::from("."));
//!     let files = discover_files(&config)?;
//!
//!     let service = ServiceConfig::new("https://api.openai.com/v1", "sk-...", "gpt-4o-mini");
//!     let client = ChatClient::new(service, config.retry.clone())?;
//!     let searcher = Searcher::new(client, config)?;
//!
//!     let outcome = searcher.search("error handling for network calls", &files).await;
//!     for (path, matches) in outcome.result.iter() {
//!         for m in matches {
//!             println!("{}:{}:{}", path, m.line_number, m.text);
//!         }
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod aggregator;
pub mod batcher;
pub mod chunker;
pub mod client;
pub mod config;
pub mod discovery;
pub mod dispatcher;
pub mod error;
pub mod reconciler;
pub mod retry;
pub mod searcher;

// Re-export commonly used types
pub use aggregator::SearchResult;
pub use batcher::{pack_batches, Batch};
pub use chunker::{Chunker, SourceChunk};
pub use client::{ChatClient, MatchingService};
pub use config::{Config, ServiceConfig};
pub use discovery::{discover_files, SourceFile};
pub use dispatcher::{BatchFailure, DispatchReport, Dispatcher};
pub use error::{Result, VibegrepError};
pub use reconciler::{reconcile, MatchRecord};
pub use retry::RetryPolicy;
pub use searcher::{
    format_plan, format_results, format_results_json, format_results_plain, SearchOutcome,
    SearchPlan, Searcher,
};
