use std::time::Duration;

/// Matches kept after scoring.
pub const MAX_MATCHES: usize = 10;
/// Matches handed to the narrator and reported in the score summary.
pub const SUMMARY_MATCHES: usize = 5;
pub const RERANK_DESCRIPTION_CHARS: usize = 200;
pub const DEFAULT_CALL_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_MAX_ITERATIONS: u32 = 3;

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// Upper bound on every collaborator call.
    pub call_timeout: Duration,
    /// Refinement rounds allowed before the run stops with what it has.
    pub max_iterations: u32,
    pub max_matches: usize,
    pub summary_matches: usize,
    pub rerank_description_chars: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            call_timeout: Duration::from_secs(DEFAULT_CALL_TIMEOUT_SECS),
            max_iterations: DEFAULT_MAX_ITERATIONS,
            max_matches: MAX_MATCHES,
            summary_matches: SUMMARY_MATCHES,
            rerank_description_chars: RERANK_DESCRIPTION_CHARS,
        }
    }
}

fn env_positive(name: &str) -> Option<usize> {
    std::env::var(name)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .filter(|n: &usize| *n > 0)
}

impl PipelineConfig {
    /// Defaults with the ranking knobs read from `ECO_MAX_MATCHES`,
    /// `ECO_SUMMARY_MATCHES` and `ECO_RERANK_DESCRIPTION_CHARS`. Unset, zero or
    /// unparsable values keep their defaults. Timeout and refinement limits are
    /// set by the caller through the builders.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_matches: env_positive("ECO_MAX_MATCHES").unwrap_or(defaults.max_matches),
            summary_matches: env_positive("ECO_SUMMARY_MATCHES")
                .unwrap_or(defaults.summary_matches),
            rerank_description_chars: env_positive("ECO_RERANK_DESCRIPTION_CHARS")
                .unwrap_or(defaults.rerank_description_chars),
            ..defaults
        }
    }

    pub fn with_call_timeout(mut self, call_timeout: Duration) -> Self {
        self.call_timeout = call_timeout;
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: u32) -> Self {
        self.max_iterations = max_iterations;
        self
    }
}
