use std::sync::Arc;
use std::time::Duration;

use log::debug;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

use super::ExpiringCache;

/// Spawns a background task that sweeps expired entries every `period`.
///
/// The task holds only a weak reference, so it exits on its own once the
/// last strong handle to the cache is dropped. The returned handle can also
/// be aborted explicitly.
pub fn spawn_sweeper<V>(cache: &Arc<ExpiringCache<V>>, period: Duration) -> JoinHandle<()>
where
    V: Clone + Send + 'static,
{
    let cache = Arc::downgrade(cache);

    tokio::spawn(async move {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately.
        ticker.tick().await;

        loop {
            ticker.tick().await;
            let Some(cache) = cache.upgrade() else {
                debug!("Cache sweeper: cache dropped, stopping");
                break;
            };
            let removed = cache.sweep();
            if removed > 0 {
                debug!("Cache sweeper: removed {} expired entries", removed);
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_sweeper_evicts_without_reads() {
        let cache = Arc::new(ExpiringCache::new(Duration::from_secs(10)));
        cache.set("a", 1);
        cache.set_with_ttl("b", 2, Duration::from_secs(600));

        let handle = spawn_sweeper(&cache, Duration::from_secs(300));

        tokio::time::sleep(Duration::from_secs(301)).await;
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.stats().expired, 0);

        handle.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweeper_stops_when_cache_dropped() {
        let cache: Arc<ExpiringCache<u32>> = Arc::new(ExpiringCache::new(Duration::from_secs(1)));
        let handle = spawn_sweeper(&cache, Duration::from_secs(5));
        drop(cache);

        tokio::time::sleep(Duration::from_secs(6)).await;
        assert!(handle.await.is_ok());
    }
}
