//! Engine handle owning the worker pool
//!
//! An [`Engine`] is constructed once by the host and passed by reference to
//! every entry point. The worker pool is built on the first call to
//! [`Engine::init`]; later calls are no-ops and return the first outcome.

use std::sync::OnceLock;

use crate::error::{PalettumError, ResourceError};
use crate::services::Session;

/// Default upper bound on pixels per frame (10k x 10k).
pub const DEFAULT_MAX_PIXELS: u64 = 100_000_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineOptions {
    /// Worker threads; `None` uses the available parallelism
    pub threads: Option<usize>,
    /// Frames above this pixel count fail with `ResourceError::TooLarge`
    pub max_pixels: u64,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            threads: None,
            max_pixels: DEFAULT_MAX_PIXELS,
        }
    }
}

impl EngineOptions {
    pub fn threads(mut self, threads: usize) -> Self {
        self.threads = Some(threads.max(1));
        self
    }

    pub fn max_pixels(mut self, max_pixels: u64) -> Self {
        self.max_pixels = max_pixels;
        self
    }
}

pub struct Engine {
    options: EngineOptions,
    pool: OnceLock<Result<rayon::ThreadPool, String>>,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(EngineOptions::default())
    }
}

impl Engine {
    pub fn new(options: EngineOptions) -> Self {
        Self {
            options,
            pool: OnceLock::new(),
        }
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    /// Build the worker pool once. Safe to call from any thread, any number
    /// of times.
    pub fn init(&self) -> Result<(), ResourceError> {
        self.pool().map(|_| ())
    }

    pub fn is_initialized(&self) -> bool {
        matches!(self.pool.get(), Some(Ok(_)))
    }

    fn pool(&self) -> Result<&rayon::ThreadPool, ResourceError> {
        let pool = self.pool.get_or_init(|| {
            let mut builder =
                rayon::ThreadPoolBuilder::new().thread_name(|i| format!("palettum-worker-{i}"));
            if let Some(threads) = self.options.threads {
                builder = builder.num_threads(threads);
            }
            let result = builder.build().map_err(|e| e.to_string());
            match &result {
                Ok(pool) => tracing::debug!(threads = pool.current_num_threads(), "Worker pool ready"),
                Err(e) => tracing::warn!(error = %e, "Failed to build worker pool"),
            }
            result
        });
        pool.as_ref()
            .map_err(|e| ResourceError::ThreadPool(e.clone()))
    }

    /// Run `op` on the worker pool, initializing it if needed.
    ///
    /// Blocks until `op` returns; rayon work spawned inside `op` runs on
    /// this engine's threads.
    pub fn install<R, F>(&self, op: F) -> Result<R, PalettumError>
    where
        R: Send,
        F: FnOnce() -> R + Send,
    {
        Ok(self.pool()?.install(op))
    }

    /// Reject frames that exceed the configured pixel budget.
    pub fn check_dimensions(&self, width: u32, height: u32) -> Result<(), ResourceError> {
        let pixels = width as u64 * height as u64;
        if pixels > self.options.max_pixels {
            return Err(ResourceError::TooLarge {
                width,
                height,
                max_pixels: self.options.max_pixels,
            });
        }
        Ok(())
    }

    /// Open an empty frame session bound to this engine.
    pub fn session(&self) -> Session<'_> {
        Session::new(self)
    }
}
