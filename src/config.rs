//! Process-wide parallelism configuration
//!
//! Sparse kernels fan out over rayon only when the amount of work passes a
//! threshold (10,000 stored entries by default). The threshold and
//! an optional dedicated thread count are read once from the environment and
//! may be replaced at runtime with [`set_parallel_config`].
//!
//! | Variable                        | Meaning                                  |
//! |---------------------------------|------------------------------------------|
//! | `COOTENSOR_PARALLEL_THRESHOLD`  | Minimum work items before going parallel |
//! | `COOTENSOR_NUM_THREADS`         | Size of a dedicated rayon pool           |

use crate::error::{Error, Result};
use parking_lot::RwLock;
#[cfg(feature = "rayon")]
use std::sync::Arc;
use std::sync::OnceLock;

/// Environment variable overriding [`ParallelConfig::min_parallel_work`]
pub const ENV_PARALLEL_THRESHOLD: &str = "COOTENSOR_PARALLEL_THRESHOLD";

/// Environment variable overriding [`ParallelConfig::num_threads`]
pub const ENV_NUM_THREADS: &str = "COOTENSOR_NUM_THREADS";

/// Default work threshold (number of stored entries) above which kernels parallelize
pub const DEFAULT_PARALLEL_THRESHOLD: usize = 10_000;

/// Default minimum number of items a rayon task processes
pub const DEFAULT_MIN_CHUNK_LEN: usize = 1024;

/// Parallelism knobs shared by every kernel in the crate
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ParallelConfig {
    /// Work strictly above this count runs on rayon; at or below it runs sequentially
    pub min_parallel_work: usize,
    /// Lower bound on items per rayon task (`with_min_len`)
    pub min_chunk_len: usize,
    /// Dedicated pool size; `None` uses the global rayon pool
    pub num_threads: Option<usize>,
}

impl Default for ParallelConfig {
    fn default() -> Self {
        Self {
            min_parallel_work: DEFAULT_PARALLEL_THRESHOLD,
            min_chunk_len: DEFAULT_MIN_CHUNK_LEN,
            num_threads: None,
        }
    }
}

impl ParallelConfig {
    /// Read the configuration from `COOTENSOR_*` environment variables
    ///
    /// Unset variables fall back to the defaults. A variable that is set but
    /// does not parse is an `InvalidArgument` error.
    pub fn from_env() -> Result<Self> {
        let threshold = std::env::var(ENV_PARALLEL_THRESHOLD).ok();
        let threads = std::env::var(ENV_NUM_THREADS).ok();
        Self::from_vars(threshold.as_deref(), threads.as_deref())
    }

    fn from_vars(threshold: Option<&str>, threads: Option<&str>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(raw) = threshold {
            config.min_parallel_work = raw.trim().parse().map_err(|_| {
                Error::invalid_argument(
                    "COOTENSOR_PARALLEL_THRESHOLD",
                    format!("expected a non-negative integer, got {raw:?}"),
                )
            })?;
        }

        if let Some(raw) = threads {
            let n: usize = raw.trim().parse().map_err(|_| {
                Error::invalid_argument(
                    "COOTENSOR_NUM_THREADS",
                    format!("expected a positive integer, got {raw:?}"),
                )
            })?;
            config.num_threads = Some(n);
        }

        config.validate()?;
        Ok(config)
    }

    /// Set the parallel work threshold
    pub fn with_min_parallel_work(mut self, work: usize) -> Self {
        self.min_parallel_work = work;
        self
    }

    /// Set the dedicated pool size
    pub fn with_num_threads(mut self, threads: usize) -> Self {
        self.num_threads = Some(threads);
        self
    }

    fn validate(&self) -> Result<()> {
        if self.num_threads == Some(0) {
            return Err(Error::invalid_argument(
                "num_threads",
                "thread count must be at least 1",
            ));
        }
        if self.min_chunk_len == 0 {
            return Err(Error::invalid_argument(
                "min_chunk_len",
                "chunk length must be at least 1",
            ));
        }
        Ok(())
    }
}

struct ParallelState {
    config: ParallelConfig,
    #[cfg(feature = "rayon")]
    pool: Option<Arc<rayon::ThreadPool>>,
}

impl ParallelState {
    fn build(config: ParallelConfig) -> Result<Self> {
        #[cfg(feature = "rayon")]
        let pool = match config.num_threads {
            Some(n) => Some(Arc::new(
                rayon::ThreadPoolBuilder::new()
                    .num_threads(n)
                    .thread_name(|i| format!("cootensor-{i}"))
                    .build()
                    .map_err(|e| Error::Internal(format!("failed to build thread pool: {e}")))?,
            )),
            None => None,
        };

        Ok(Self {
            config,
            #[cfg(feature = "rayon")]
            pool,
        })
    }
}

static STATE: OnceLock<RwLock<ParallelState>> = OnceLock::new();

fn state() -> &'static RwLock<ParallelState> {
    STATE.get_or_init(|| {
        let config = ParallelConfig::from_env().unwrap_or_else(|err| {
            tracing::warn!(error = %err, "ignoring parallelism environment overrides");
            ParallelConfig::default()
        });
        let state = ParallelState::build(config).unwrap_or_else(|err| {
            tracing::warn!(error = %err, "falling back to the global rayon pool");
            ParallelState {
                config: ParallelConfig {
                    num_threads: None,
                    ..config
                },
                #[cfg(feature = "rayon")]
                pool: None,
            }
        });
        RwLock::new(state)
    })
}

/// Current process-wide parallelism configuration
pub fn parallel_config() -> ParallelConfig {
    state().read().config
}

/// Replace the process-wide parallelism configuration
///
/// A dedicated pool is built when `num_threads` is set. The previous pool is
/// dropped once every in-flight operation using it has finished.
pub fn set_parallel_config(config: ParallelConfig) -> Result<()> {
    config.validate()?;
    let next = ParallelState::build(config)?;
    *state().write() = next;
    tracing::debug!(
        min_parallel_work = config.min_parallel_work,
        num_threads = ?config.num_threads,
        "parallel config updated"
    );
    Ok(())
}

/// Whether `work` items are enough to justify a parallel pass
#[inline]
pub(crate) fn should_parallelize(work: usize) -> bool {
    cfg!(feature = "rayon") && work > parallel_config().min_parallel_work
}

/// Minimum items per rayon task
#[cfg(feature = "rayon")]
#[inline]
pub(crate) fn rayon_min_len() -> usize {
    parallel_config().min_chunk_len
}

/// Run `f` inside the dedicated pool when one is configured
#[cfg(feature = "rayon")]
pub(crate) fn install_parallelism<R, F>(f: F) -> R
where
    F: FnOnce() -> R + Send,
    R: Send,
{
    let pool = state().read().pool.clone();
    match pool {
        Some(pool) => pool.install(f),
        None => f(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ParallelConfig::from_vars(None, None).unwrap();
        assert_eq!(config, ParallelConfig::default());
        assert_eq!(config.min_parallel_work, 10_000);
        assert_eq!(config.num_threads, None);
    }

    #[test]
    fn test_from_vars_overrides() {
        let config = ParallelConfig::from_vars(Some(" 64 "), Some("3")).unwrap();
        assert_eq!(config.min_parallel_work, 64);
        assert_eq!(config.num_threads, Some(3));
    }

    #[test]
    fn test_from_vars_rejects_garbage() {
        let err = ParallelConfig::from_vars(Some("lots"), None).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument { .. }));

        let err = ParallelConfig::from_vars(None, Some("0")).unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidArgument {
                arg: "num_threads",
                ..
            }
        ));
    }

    #[test]
    fn test_builders() {
        let config = ParallelConfig::default()
            .with_min_parallel_work(5)
            .with_num_threads(2);
        assert_eq!(config.min_parallel_work, 5);
        assert_eq!(config.num_threads, Some(2));
    }
}
