//! Trailing-edge debouncing with supersession.
//!
//! Every call to [`Debouncer::call`] waits until `delay` has passed since
//! that call and only then runs its operation. A newer call supersedes the
//! older one, whether it is still waiting or already running; the older call
//! then resolves to [`Cancelled`] and its operation output is discarded.
//!
//! Calls at 0 s, 0.2 s and 0.6 s with a 0.5 s delay therefore run only the
//! third operation, at 1.1 s.

use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use pager_model::Cancelled;
use tokio::sync::oneshot;
use tracing::{debug, trace};

use crate::clock::{Clock, TokioClock};

#[derive(Default)]
struct Pending {
    generation: u64,
    supersede: Option<oneshot::Sender<()>>,
}

/// Delays operations and lets only the latest one finish.
pub struct Debouncer<C = TokioClock> {
    delay: Duration,
    clock: C,
    pending: Mutex<Pending>,
}

impl Debouncer {
    /// Debouncer on the tokio timer.
    pub fn new(delay: Duration) -> Self {
        Self::with_clock(delay, TokioClock)
    }
}

impl<C: Clock> Debouncer<C> {
    /// Debouncer on a custom clock.
    pub fn with_clock(delay: Duration, clock: C) -> Self {
        Self {
            delay,
            clock,
            pending: Mutex::new(Pending::default()),
        }
    }

    /// The configured delay.
    pub const fn delay(&self) -> Duration {
        self.delay
    }

    /// Check if a call is waiting or running.
    pub fn is_pending(&self) -> bool {
        self.lock().supersede.is_some()
    }

    /// Supersede the pending call, if any, without scheduling a new one.
    pub fn cancel(&self) {
        if let Some(previous) = self.lock().supersede.take() {
            debug!("debounced call cancelled");
            let _ = previous.send(());
        }
    }

    /// Run `operation` once the delay has passed, unless a newer call
    /// supersedes this one first.
    pub async fn call<F, Fut>(&self, operation: F) -> Result<Fut::Output, Cancelled>
    where
        F: FnOnce() -> Fut,
        Fut: Future,
    {
        let (tx, mut superseded) = oneshot::channel();
        let (generation, deadline) = {
            let mut pending = self.lock();
            if let Some(previous) = pending.supersede.replace(tx) {
                debug!("debounced call superseded");
                let _ = previous.send(());
            }
            pending.generation += 1;
            (pending.generation, self.clock.now() + self.delay)
        };

        let elapsed = tokio::select! {
            biased;
            _ = &mut superseded => false,
            () = self.clock.sleep_until(deadline) => true,
        };
        if !elapsed {
            return Err(Cancelled);
        }

        trace!(generation, "debounce delay elapsed");
        let output = tokio::select! {
            biased;
            _ = &mut superseded => None,
            output = operation() => Some(output),
        };
        self.finish(generation);
        output.ok_or(Cancelled)
    }

    fn finish(&self, generation: u64) {
        let mut pending = self.lock();
        if pending.generation == generation {
            pending.supersede = None;
        }
    }

    fn lock(&self) -> MutexGuard<'_, Pending> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tokio::time::Instant;

    fn recorder() -> Arc<Mutex<Vec<(u32, Instant)>>> {
        Arc::new(Mutex::new(Vec::new()))
    }

    #[tokio::test(start_paused = true)]
    async fn test_only_the_last_of_a_burst_runs() {
        let debouncer = Arc::new(Debouncer::new(Duration::from_millis(500)));
        let ran = recorder();
        let start = Instant::now();

        let spawn_call = |param: u32| {
            let (debouncer, ran) = (Arc::clone(&debouncer), Arc::clone(&ran));
            tokio::spawn(async move {
                debouncer
                    .call(move || async move {
                        ran.lock().unwrap().push((param, Instant::now()));
                        param
                    })
                    .await
            })
        };

        let first = spawn_call(1);
        tokio::time::sleep(Duration::from_millis(200)).await;
        let second = spawn_call(2);
        tokio::time::sleep(Duration::from_millis(400)).await;
        let third = spawn_call(3);

        assert_eq!(first.await.unwrap(), Err(Cancelled));
        assert_eq!(second.await.unwrap(), Err(Cancelled));
        assert_eq!(third.await.unwrap(), Ok(3));

        let ran = ran.lock().unwrap();
        assert_eq!(ran.len(), 1);
        assert_eq!(ran[0].0, 3);
        assert_eq!(ran[0].1 - start, Duration::from_millis(1100));
    }

    #[tokio::test(start_paused = true)]
    async fn test_spaced_calls_all_run() {
        let debouncer = Debouncer::new(Duration::from_millis(100));
        assert_eq!(debouncer.call(|| async { 1 }).await, Ok(1));
        assert_eq!(debouncer.call(|| async { 2 }).await, Ok(2));
        assert!(!debouncer.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn test_newer_call_supersedes_running_operation() {
        let debouncer = Arc::new(Debouncer::new(Duration::from_millis(100)));
        let slow = {
            let debouncer = Arc::clone(&debouncer);
            tokio::spawn(async move {
                debouncer
                    .call(|| tokio::time::sleep(Duration::from_secs(10)))
                    .await
            })
        };
        // let the first call pass its delay and start running
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(debouncer.is_pending());

        let fast = debouncer.call(|| async { "fresh" }).await;
        assert_eq!(fast, Ok("fresh"));
        assert_eq!(slow.await.unwrap(), Err(Cancelled));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_drops_pending_call() {
        let debouncer = Arc::new(Debouncer::new(Duration::from_millis(100)));
        let pending = {
            let debouncer = Arc::clone(&debouncer);
            tokio::spawn(async move { debouncer.call(|| async { 1 }).await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        debouncer.cancel();
        assert_eq!(pending.await.unwrap(), Err(Cancelled));
        assert!(!debouncer.is_pending());
    }

    struct RecordingClock {
        deadlines: Arc<Mutex<Vec<Instant>>>,
    }

    impl Clock for RecordingClock {
        fn now(&self) -> Instant {
            Instant::now()
        }

        fn sleep_until(&self, deadline: Instant) -> futures_util::future::BoxFuture<'static, ()> {
            self.deadlines.lock().unwrap().push(deadline);
            TokioClock.sleep_until(deadline)
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_is_measured_from_each_call() {
        let deadlines = Arc::new(Mutex::new(Vec::new()));
        let clock = RecordingClock {
            deadlines: Arc::clone(&deadlines),
        };
        let debouncer = Debouncer::with_clock(Duration::from_millis(250), clock);
        let start = Instant::now();
        debouncer.call(|| async {}).await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        debouncer.call(|| async {}).await.unwrap();

        let deadlines = deadlines.lock().unwrap();
        assert_eq!(
            *deadlines,
            vec![
                start + Duration::from_millis(250),
                start + Duration::from_millis(550),
            ]
        );
    }
}
