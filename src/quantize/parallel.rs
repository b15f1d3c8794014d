//! Chunked parallel reduction.
//!
//! Reduction is a pure function of one frame, so a chunk of frames can be
//! reduced on a worker pool. Results come back in input order; diffing
//! stays sequential.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::{FrameReducer, QuantizeError};
use crate::capture::RawFrame;
use crate::config::ConfigError;
use crate::diff::QuantizedFrame;

/// Threading and chunking controls for frame reduction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThreadingConfig {
    /// Reduce frames on a worker pool when `true`.
    pub parallel: bool,
    /// Frames decoded ahead and reduced as one batch.
    pub chunk_size: usize,
    /// Worker thread count; `None` lets rayon decide.
    pub threads: Option<usize>,
}

impl Default for ThreadingConfig {
    fn default() -> Self {
        Self {
            parallel: false,
            chunk_size: 64,
            threads: None,
        }
    }
}

impl ThreadingConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chunk_size == 0 {
            return Err(ConfigError::InvalidChunkSize);
        }
        Ok(())
    }
}

/// Runs a [`FrameReducer`] over batches of frames on a dedicated pool.
pub struct ParallelReducer {
    reducer: FrameReducer,
    pool: rayon::ThreadPool,
    chunk_size: usize,
}

impl ParallelReducer {
    pub fn new(reducer: FrameReducer, config: &ThreadingConfig) -> Result<Self, QuantizeError> {
        let mut builder = rayon::ThreadPoolBuilder::new();
        if let Some(threads) = config.threads {
            builder = builder.num_threads(threads.max(1));
        }
        let pool = builder
            .thread_name(|i| format!("reduce-{i}"))
            .build()
            .map_err(|e| QuantizeError::ThreadPool(e.to_string()))?;

        tracing::debug!(
            threads = pool.current_num_threads(),
            chunk_size = config.chunk_size,
            "Built reduction pool"
        );
        Ok(Self {
            reducer,
            pool,
            chunk_size: config.chunk_size.max(1),
        })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Reduces `frames`, returning results in the same order.
    pub fn reduce_chunk(&self, frames: &[RawFrame]) -> Result<Vec<QuantizedFrame>, QuantizeError> {
        self.pool.install(|| {
            frames
                .par_iter()
                .map(|frame| self.reducer.reduce(frame))
                .collect()
        })
    }
}
