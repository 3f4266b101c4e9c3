use std::time::Duration;

/// Tuning knobs for namespace retrieval.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetrieverConfig {
    /// Overall time budget for one retrieval; `None` waits indefinitely.
    pub deadline: Option<Duration>,
    /// Maximum number of rows descended concurrently.
    pub max_concurrent_rows: usize,
    /// Re-hash every fetched node and compare it with its identifier.
    pub verify_digests: bool,
}

impl Default for RetrieverConfig {
    fn default() -> Self {
        Self {
            deadline: None,
            max_concurrent_rows: 8,
            verify_digests: true,
        }
    }
}

impl RetrieverConfig {
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn validate(&self) -> Result<(), &'static str> {
        if self.max_concurrent_rows == 0 {
            return Err("max_concurrent_rows must be > 0");
        }
        Ok(())
    }
}
