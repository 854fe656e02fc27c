//! Parallel processing configuration
//!
//! Climatology normalization and joint masking of retrieved scores run
//! elementwise on Rayon's global pool. This module configures that pool.

use crate::errors::{AlignError, Result};
use rayon::ThreadPoolBuilder;

/// Configuration for parallel processing
#[derive(Debug, Clone, Default)]
pub struct ParallelConfig {
    pub num_threads: Option<usize>,
}

impl ParallelConfig {
    pub fn new(num_threads: Option<usize>) -> Self {
        Self { num_threads }
    }

    /// Use every available CPU core
    pub fn all_cores() -> Self {
        Self {
            num_threads: Some(num_cpus::get()),
        }
    }

    pub fn with_threads(num_threads: usize) -> Self {
        Self {
            num_threads: Some(num_threads),
        }
    }

    /// Set up the global Rayon thread pool; leaves the default pool alone
    /// when no thread count is configured
    pub fn setup_global_pool(&self) -> Result<()> {
        if let Some(num_threads) = self.num_threads {
            ThreadPoolBuilder::new()
                .num_threads(num_threads)
                .build_global()
                .map_err(|e| {
                    AlignError::ThreadPool(format!(
                        "Failed to initialize thread pool with {num_threads} threads: {e}"
                    ))
                })?;
            log::info!("configured parallel processing with {num_threads} threads");
        } else {
            log::debug!("using default thread pool configuration");
        }
        Ok(())
    }

    /// Number of threads in the current pool
    pub fn current_threads(&self) -> usize {
        rayon::current_num_threads()
    }
}
