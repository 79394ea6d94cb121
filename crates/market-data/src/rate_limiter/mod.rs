//! Serializing rate limiter for upstream requests.
//!
//! A single worker task owns the queue. Callers submit operations through an
//! unbounded channel and get back a [`TaskHandle`]; the worker dispatches them
//! one at a time, in submission order, with at least `min_interval` between
//! consecutive dispatch starts. There is exactly one consumer per limiter, so
//! no "is a drain already running" flag is needed.

mod handle;

pub use handle::{RateLimiterError, TaskHandle};

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt};
use log::{debug, warn};
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;

/// Fallback rate when the configured one is not a positive finite number or
/// its spacing does not fit a `Duration`.
const DEFAULT_REQUESTS_PER_SECOND: f64 = 1.0;

// A queued unit of work. The reply channel is captured inside the closure,
// so the worker does not need to know the operation's output type.
type Job = Box<dyn FnOnce() -> BoxFuture<'static, ()> + Send + 'static>;

/// Minimum spacing between dispatches for a requests-per-second ceiling.
pub fn interval_for_rate(requests_per_second: f64) -> Duration {
    let rate = if requests_per_second.is_finite() && requests_per_second > 0.0 {
        requests_per_second
    } else {
        warn!(
            "Rate limiter: invalid rate {}, using {} req/s",
            requests_per_second, DEFAULT_REQUESTS_PER_SECOND
        );
        DEFAULT_REQUESTS_PER_SECOND
    };
    Duration::try_from_secs_f64(1.0 / rate).unwrap_or_else(|_| {
        warn!(
            "Rate limiter: rate {} is too low, using {} req/s",
            requests_per_second, DEFAULT_REQUESTS_PER_SECOND
        );
        Duration::from_secs_f64(1.0 / DEFAULT_REQUESTS_PER_SECOND)
    })
}

/// FIFO admission queue with a global minimum interval between dispatches.
///
/// The limit is shared by every caller holding this instance; it is not
/// per-symbol. Cloning is not supported, share it behind an `Arc`.
pub struct RateLimiter {
    tx: mpsc::UnboundedSender<Job>,
    pending: Arc<AtomicUsize>,
    min_interval: Duration,
}

impl RateLimiter {
    /// Create a limiter allowing at most `requests_per_second` dispatches.
    ///
    /// Must be called from within a tokio runtime; the worker task is spawned
    /// immediately.
    pub fn new(requests_per_second: f64) -> Self {
        Self::with_min_interval(interval_for_rate(requests_per_second))
    }

    /// Create a limiter with an explicit spacing between dispatch starts.
    pub fn with_min_interval(min_interval: Duration) -> Self {
        let (tx, rx) = mpsc::unbounded_channel::<Job>();
        let pending = Arc::new(AtomicUsize::new(0));

        tokio::spawn(drain(rx, pending.clone(), min_interval));
        debug!("Rate limiter: worker started, min interval {:?}", min_interval);

        Self {
            tx,
            pending,
            min_interval,
        }
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Number of submitted operations that have not been dispatched yet.
    pub fn queue_length(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }

    /// Enqueue `operation` at the tail of the queue.
    ///
    /// Returns immediately. The handle resolves with whatever the operation
    /// produced once it has run; an operation returning `Err` is delivered to
    /// its own handle only and never stalls the queue.
    pub fn submit<F, Fut, T>(&self, operation: F) -> TaskHandle<T>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let (reply_tx, reply_rx) = oneshot::channel();

        let job: Job = Box::new(move || {
            async move {
                // Run in a separate task so a panicking operation only takes
                // itself down; its dropped reply sender surfaces as `Closed`.
                match tokio::spawn(operation()).await {
                    Ok(output) => {
                        // Receiver may have been dropped; nothing to do then.
                        let _ = reply_tx.send(output);
                    }
                    Err(e) => warn!("Rate limiter: queued operation aborted: {}", e),
                }
            }
            .boxed()
        });

        self.pending.fetch_add(1, Ordering::SeqCst);
        if self.tx.send(job).is_err() {
            self.pending.fetch_sub(1, Ordering::SeqCst);
            warn!("Rate limiter: worker is not running, operation dropped");
        }

        TaskHandle::new(reply_rx)
    }

    /// Submit `operation` and wait for its output.
    pub async fn execute<F, Fut, T>(&self, operation: F) -> Result<T, RateLimiterError>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        self.submit(operation).await
    }
}

/// The single drain loop. Exits when every sender has been dropped.
async fn drain(
    mut rx: mpsc::UnboundedReceiver<Job>,
    pending: Arc<AtomicUsize>,
    min_interval: Duration,
) {
    let mut last_dispatch: Option<Instant> = None;

    while let Some(job) = rx.recv().await {
        if let Some(last) = last_dispatch {
            let elapsed = last.elapsed();
            if elapsed < min_interval {
                let delay = min_interval - elapsed;
                debug!("Rate limiter: waiting {:?} before next dispatch", delay);
                tokio::time::sleep(delay).await;
            }
        }

        pending.fetch_sub(1, Ordering::SeqCst);
        last_dispatch = Some(Instant::now());
        job().await;
    }

    debug!("Rate limiter: all handles dropped, worker exiting");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    const INTERVAL: Duration = Duration::from_secs(1);

    #[test]
    fn test_interval_for_rate() {
        assert_eq!(interval_for_rate(1.0), Duration::from_secs(1));
        assert_eq!(interval_for_rate(10.0), Duration::from_millis(100));
        assert_eq!(interval_for_rate(0.5), Duration::from_secs(2));
    }

    #[test]
    fn test_interval_for_invalid_rate_falls_back() {
        assert_eq!(interval_for_rate(0.0), Duration::from_secs(1));
        assert_eq!(interval_for_rate(-3.0), Duration::from_secs(1));
        assert_eq!(interval_for_rate(f64::NAN), Duration::from_secs(1));
    }

    #[test]
    fn test_interval_for_tiny_rate_falls_back() {
        assert_eq!(interval_for_rate(1e-20), Duration::from_secs(1));
        assert_eq!(interval_for_rate(f64::MIN_POSITIVE), Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_dispatches_are_spaced_by_min_interval() {
        let limiter = RateLimiter::with_min_interval(INTERVAL);
        let starts = Arc::new(Mutex::new(Vec::new()));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let starts = starts.clone();
                limiter.submit(move || async move {
                    starts.lock().unwrap().push(Instant::now());
                })
            })
            .collect();

        for handle in handles {
            handle.await.unwrap();
        }

        let starts = starts.lock().unwrap();
        assert_eq!(starts.len(), 4);
        for pair in starts.windows(2) {
            assert!(pair[1] - pair[0] >= INTERVAL);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_dispatch_is_immediate() {
        let limiter = RateLimiter::with_min_interval(INTERVAL);
        let start = Instant::now();

        limiter.execute(|| async {}).await.unwrap();

        assert!(start.elapsed() < INTERVAL);
    }

    #[tokio::test(start_paused = true)]
    async fn test_tasks_complete_in_submission_order() {
        let limiter = RateLimiter::with_min_interval(Duration::from_millis(10));
        let order = Arc::new(Mutex::new(Vec::new()));

        let make = |label: &'static str, work: Duration| {
            let order = order.clone();
            move || async move {
                tokio::time::sleep(work).await;
                order.lock().unwrap().push(label);
                label
            }
        };

        let a = limiter.submit(make("A", Duration::from_millis(500)));
        let b = limiter.submit(make("B", Duration::ZERO));
        let c = limiter.submit(make("C", Duration::ZERO));

        // Await in reverse to show completion order does not depend on polling order.
        assert_eq!(c.await.unwrap(), "C");
        assert_eq!(b.await.unwrap(), "B");
        assert_eq!(a.await.unwrap(), "A");
        assert_eq!(*order.lock().unwrap(), vec!["A", "B", "C"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failing_task_does_not_block_queue() {
        let limiter = RateLimiter::with_min_interval(INTERVAL);
        let start = Instant::now();

        let failing = limiter.submit(|| async { Err::<u32, String>("upstream down".into()) });
        let succeeding = limiter.submit(|| async { Ok::<u32, String>(7) });

        assert_eq!(failing.await.unwrap(), Err("upstream down".to_string()));
        assert_eq!(succeeding.await.unwrap(), Ok(7));

        let elapsed = start.elapsed();
        assert!(elapsed >= INTERVAL);
        assert!(elapsed < INTERVAL * 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_panicking_task_is_isolated() {
        let limiter = RateLimiter::with_min_interval(Duration::from_millis(10));

        let panicking = limiter.submit(|| async {
            panic!("boom");
        });
        let next = limiter.submit(|| async { 42 });

        assert!(matches!(panicking.await, Err(RateLimiterError::Closed)));
        assert_eq!(next.await.unwrap(), 42);
    }

    #[tokio::test(start_paused = true)]
    async fn test_queue_length_counts_undispatched_tasks() {
        let limiter = RateLimiter::with_min_interval(INTERVAL);
        assert_eq!(limiter.queue_length(), 0);

        let handles: Vec<_> = (0..3).map(|i| limiter.submit(move || async move { i })).collect();
        assert_eq!(limiter.queue_length(), 3);

        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(limiter.queue_length(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_submitters_never_overlap() {
        let limiter = Arc::new(RateLimiter::with_min_interval(Duration::from_millis(50)));
        let in_flight = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));

        let mut callers = Vec::new();
        for _ in 0..8 {
            let limiter = limiter.clone();
            let in_flight = in_flight.clone();
            let max_seen = max_seen.clone();
            callers.push(tokio::spawn(async move {
                limiter
                    .execute(move || async move {
                        let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                        max_seen.fetch_max(now, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(20)).await;
                        in_flight.fetch_sub(1, Ordering::SeqCst);
                    })
                    .await
                    .unwrap();
            }));
        }

        for caller in callers {
            caller.await.unwrap();
        }
        assert_eq!(max_seen.load(Ordering::SeqCst), 1);
        assert_eq!(limiter.queue_length(), 0);
    }
}
