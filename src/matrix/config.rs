//! Configuration and system parameters for spbool

use crate::constants::DEFAULT_DENSE_ACCUM_THRESHOLD;

/// System parameters for host and emulated-device execution
#[derive(Debug, Clone)]
pub struct SystemParameters {
    /// Number of threads used by parallel host operators and the
    /// in-process device
    pub n_threads: usize,
    /// Upper bound on bytes the in-process device may hold at once
    /// (None = unlimited)
    pub device_memory_limit: Option<usize>,
}

impl Default for SystemParameters {
    fn default() -> Self {
        Self {
            n_threads: num_cpus::get(), // Use all available cores
            device_memory_limit: None,
        }
    }
}

/// Which accumulator a host multiplication row uses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccumulatorKind {
    /// Occupancy flags over the full output width
    Dense,
    /// Sorted merge of the contributing rows of B
    Merge,
}

/// Configuration for the spbool engine
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// System parameters for performance tuning
    pub system_params: SystemParameters,

    /// Output widths up to this use the dense accumulator
    pub dense_accum_threshold: usize,

    /// Process multiplication rows with rayon on the host path
    pub parallel_host: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            system_params: SystemParameters::default(),
            dense_accum_threshold: DEFAULT_DENSE_ACCUM_THRESHOLD,
            parallel_host: false,
        }
    }
}

impl EngineConfig {
    /// Sets the number of worker threads
    pub fn with_threads(mut self, n_threads: usize) -> Self {
        self.system_params.n_threads = n_threads.max(1);
        self
    }

    /// Limits memory held by the in-process device
    pub fn with_device_memory_limit(mut self, bytes: usize) -> Self {
        self.system_params.device_memory_limit = Some(bytes);
        self
    }

    /// Sets the dense accumulator threshold
    pub fn with_dense_threshold(mut self, threshold: usize) -> Self {
        self.dense_accum_threshold = threshold;
        self
    }

    /// Enables or disables rayon row processing on the host path
    pub fn with_parallel_host(mut self, enabled: bool) -> Self {
        self.parallel_host = enabled;
        self
    }

    /// Accumulator used for an output of `n_cols` columns
    pub fn accumulator_for(&self, n_cols: usize) -> AccumulatorKind {
        if n_cols <= self.dense_accum_threshold {
            AccumulatorKind::Dense
        } else {
            AccumulatorKind::Merge
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accumulator_selection() {
        let config = EngineConfig::default().with_dense_threshold(64);
        assert_eq!(config.accumulator_for(64), AccumulatorKind::Dense);
        assert_eq!(config.accumulator_for(65), AccumulatorKind::Merge);
    }

    #[test]
    fn test_builder() {
        let config = EngineConfig::default()
            .with_threads(0)
            .with_device_memory_limit(1024)
            .with_parallel_host(true);

        assert_eq!(config.system_params.n_threads, 1);
        assert_eq!(config.system_params.device_memory_limit, Some(1024));
        assert!(config.parallel_host);
    }
}
