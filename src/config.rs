//! Configuration types and constants for vibegrep
//!
//! Holds the search budget, worker pool size, discovery limits and the
//! connection parameters for the matching service.

use crate::error::{Result, VibegrepError};
use crate::retry::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Character budget per chunk and per batch (~8k tokens)
pub const MAX_CHARS: usize = 20_000;

/// Default number of concurrent requests
pub const DEFAULT_WORKERS: usize = 10;

/// Bytes inspected when deciding whether a file is binary
pub const BINARY_PROBE_BYTES: usize = 8192;

/// Environment variable holding the API key
pub const ENV_API_KEY: &str = "VIBEGREP_API_KEY";
/// Environment variable holding the chat-completions base URL
pub const ENV_BASE_URL: &str = "VIBEGREP_BASE_URL";
/// Environment variable holding the model name
pub const ENV_MODEL: &str = "VIBEGREP_MODEL";

/// Configuration for a search run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Root directory being searched
    pub root_path: PathBuf,
    /// Character budget for a chunk and for a batch
    pub max_chars: usize,
    /// Maximum requests in flight
    pub workers: usize,
    /// Directory depth: 1 = root only, 2 = root plus immediate subdirectories
    pub depth: usize,
    /// Optional glob matched against file names
    pub glob: Option<String>,
    /// Retry behaviour for transient service failures
    pub retry: RetryPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            root_path: PathBuf::from("."),
            max_chars: MAX_CHARS,
            workers: DEFAULT_WORKERS,
            depth: 1,
            glob: None,
            retry: RetryPolicy::default(),
        }
    }
}

impl Config {
    /// Create a new config for the given root path
    pub fn new(root_path: PathBuf) -> Self {
        Self {
            root_path,
            ..Default::default()
        }
    }

    /// Set the character budget
    pub fn with_max_chars(mut self, max_chars: usize) -> Self {
        self.max_chars = max_chars;
        self
    }

    /// Set the worker pool size
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Set the directory depth
    pub fn with_depth(mut self, depth: usize) -> Self {
        self.depth = depth;
        self
    }

    /// Set the file-name glob
    pub fn with_glob(mut self, glob: Option<String>) -> Self {
        self.glob = glob;
        self
    }

    /// Set the retry policy
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Reject values the pipeline cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.max_chars == 0 {
            return Err(VibegrepError::Config("max_chars must be positive".to_string()));
        }
        if self.workers == 0 {
            return Err(VibegrepError::Config("workers must be positive".to_string()));
        }
        if !(1..=2).contains(&self.depth) {
            return Err(VibegrepError::Config(format!(
                "depth must be 1 or 2, got {}",
                self.depth
            )));
        }
        Ok(())
    }
}

/// Connection parameters for an OpenAI-compatible chat-completions endpoint
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Base URL, without trailing slash
    pub base_url: String,
    /// Bearer token
    pub api_key: String,
    /// Model name sent with each request
    pub model: String,
    /// Per-request timeout
    pub timeout: Duration,
    /// Upper bound on generated tokens
    pub max_completion_tokens: u32,
    /// Sampling temperature
    pub temperature: f32,
}

impl ServiceConfig {
    /// Create a service config with default limits
    pub fn new(base_url: &str, api_key: &str, model: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
            timeout: Duration::from_secs(120),
            max_completion_tokens: 8192,
            temperature: 0.0,
        }
    }

    /// Build from optional values, failing on the first one that is missing
    pub fn from_parts(
        base_url: Option<String>,
        api_key: Option<String>,
        model: Option<String>,
    ) -> Result<Self> {
        let base_url = require(base_url, ENV_BASE_URL)?;
        let api_key = require(api_key, ENV_API_KEY)?;
        let model = require(model, ENV_MODEL)?;
        Ok(Self::new(&base_url, &api_key, &model))
    }

    /// Set the request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Full URL of the chat-completions endpoint
    pub fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

fn require(value: Option<String>, var: &str) -> Result<String> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(VibegrepError::Config(format!(
            "missing required environment variable {var}\n  Set it with: export {var}=<value>"
        ))),
    }
}
