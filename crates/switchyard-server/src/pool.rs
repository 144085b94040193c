//! Context pooling.
//!
//! The engine keeps finished [`Context`]s in a mutex-guarded free list and
//! hands them out again after a [`reset`](Context::reset), so the step
//! list, key map and parameter storage keep their allocations across
//! requests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use switchyard_core::{Context, Hooks, Mode};

/// Default number of idle contexts kept for reuse.
pub const DEFAULT_MAX_IDLE: usize = 1024;

/// Free list of reusable contexts.
#[derive(Debug)]
pub struct ContextPool {
    idle: Mutex<Vec<Context>>,
    max_idle: usize,
    mode: Mode,
    hooks: Arc<Hooks>,
    created: AtomicUsize,
}

impl ContextPool {
    /// Creates an empty pool producing contexts bound to `mode` and `hooks`.
    #[must_use]
    pub fn new(mode: Mode, hooks: Arc<Hooks>) -> Self {
        Self::with_max_idle(mode, hooks, DEFAULT_MAX_IDLE)
    }

    /// Creates a pool that keeps at most `max_idle` contexts.
    #[must_use]
    pub fn with_max_idle(mode: Mode, hooks: Arc<Hooks>, max_idle: usize) -> Self {
        Self {
            idle: Mutex::new(Vec::new()),
            max_idle,
            mode,
            hooks,
            created: AtomicUsize::new(0),
        }
    }

    /// Takes an idle context or builds a new one.
    pub fn acquire(&self) -> Context {
        if let Some(ctx) = self.idle.lock().pop() {
            return ctx;
        }
        self.created.fetch_add(1, Ordering::Relaxed);
        Context::new(self.mode, Arc::clone(&self.hooks))
    }

    /// Resets `ctx` and returns it to the free list.
    ///
    /// Contexts beyond the idle limit are dropped.
    pub fn release(&self, mut ctx: Context) {
        ctx.reset();
        let mut idle = self.idle.lock();
        if idle.len() < self.max_idle {
            idle.push(ctx);
        }
    }

    /// Number of contexts currently idle.
    #[must_use]
    pub fn idle(&self) -> usize {
        self.idle.lock().len()
    }

    /// Number of contexts built since the pool was created.
    #[must_use]
    pub fn created(&self) -> usize {
        self.created.load(Ordering::Relaxed)
    }
}
