use glaredb_error::{Result, ResultExt};
use serde::{Deserialize, Serialize};

/// Configuration for function application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UdfExecutionConfig {
    /// Invoke functions for different groups concurrently.
    ///
    /// Disable when functions are not safe to call from multiple threads at
    /// once.
    pub parallel_groups: bool,
    /// Number of worker threads for group evaluation. Defaults to the number
    /// of cpus.
    pub num_threads: Option<usize>,
    /// Groups are only evaluated in parallel when there are at least this many
    /// of them.
    pub min_groups_for_parallel: usize,
    /// Dispatch recognized primitives to native kernels.
    pub ufunc_fast_path: bool,
    /// Order groups by key instead of by first occurrence.
    pub sort_groups: bool,
}

impl Default for UdfExecutionConfig {
    fn default() -> Self {
        UdfExecutionConfig {
            parallel_groups: true,
            num_threads: None,
            min_groups_for_parallel: 2,
            ufunc_fast_path: true,
            sort_groups: false,
        }
    }
}

impl UdfExecutionConfig {
    /// Configuration that invokes every group on the calling thread.
    pub fn sequential() -> Self {
        UdfExecutionConfig {
            parallel_groups: false,
            ..Default::default()
        }
    }

    /// Parse a json config document. Missing fields use defaults.
    pub fn from_json(s: &str) -> Result<Self> {
        serde_json::from_str(s).context("Failed to parse udf execution config")
    }

    /// Number of threads to use for the worker pool.
    pub fn worker_threads(&self) -> usize {
        self.num_threads.unwrap_or_else(num_cpus::get).max(1)
    }
}
