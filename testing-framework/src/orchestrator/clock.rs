// File: testing-framework/src/orchestrator/clock.rs
//
// Clock Abstraction
//
// Pause steps, per-stanza timeouts and the shutdown deadline all go through
// this trait so that session tests run under paused tokio time.

use std::future::Future;
use std::pin::Pin;
use tokio::time::{self, Duration, Instant};

/// Time source of the run loop
///
/// # Examples
///
/// ```rust
/// use std::sync::Arc;
/// use tokio::time::Duration;
/// use gateway_testing_framework::orchestrator::clock::{Clock, PausedClock};
///
/// #[tokio::main(flavor = "current_thread", start_paused = true)]
/// async fn main() {
///     let clock = Arc::new(PausedClock);
///     let start = clock.now();
///     clock.advance(Duration::from_secs(2)).await;
///     assert_eq!(clock.now() - start, Duration::from_secs(2));
/// }
/// ```
pub trait Clock: Send + Sync {
    /// Current instant
    fn now(&self) -> Instant;

    /// Non-blocking sleep; other I/O keeps progressing meanwhile
    fn sleep(&self, d: Duration) -> Pin<Box<dyn Future<Output = ()> + Send + '_>>;
}

/// Wall-clock time, used by the CLI
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        time::Instant::now()
    }

    fn sleep(&self, d: Duration) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
        Box::pin(time::sleep(d))
    }
}

/// Paused tokio time, used by tests
///
/// Time only moves through `advance()`, or by auto-advance when every task of
/// the runtime is idle. Requires a current-thread runtime, which
/// `#[tokio::test]` provides.
pub struct PausedClock;

impl PausedClock {
    /// Pause tokio time
    ///
    /// Panics when time is already paused; on a runtime started with
    /// `start_paused = true` use the unit value `PausedClock` instead.
    pub fn new() -> Self {
        time::pause();
        Self
    }

    /// Move time forward, waking every sleep that expires meanwhile
    pub async fn advance(&self, d: Duration) {
        time::advance(d).await
    }
}

impl Clock for PausedClock {
    fn now(&self) -> Instant {
        time::Instant::now()
    }

    fn sleep(&self, d: Duration) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
        Box::pin(time::sleep(d))
    }
}

impl Default for PausedClock {
    fn default() -> Self {
        Self::new()
    }
}
