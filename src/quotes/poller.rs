//! Fixed-interval price refresh

use super::{QuoteSource, SharedPriceCache};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Default refresh interval
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PollReport {
    pub generation: u64,
    pub requested: usize,
    pub updated: usize,
    pub failed: usize,
    pub discarded: bool,
}

/// Fetch every watched symbol once and merge the results into the cache.
/// Fetch errors are logged and skipped.
pub async fn poll_once<S: QuoteSource>(source: &S, cache: &SharedPriceCache) -> PollReport {
    let (generation, symbols) = match cache.read() {
        Ok(guard) => guard.begin_cycle(),
        Err(e) => {
            log::error!("Price cache lock poisoned: {}", e);
            return PollReport::default();
        }
    };

    let mut report = PollReport {
        generation,
        requested: symbols.len(),
        ..PollReport::default()
    };
    if symbols.is_empty() {
        return report;
    }

    let mut results = Vec::with_capacity(symbols.len());
    for symbol in symbols {
        match source.fetch_quote(&symbol, None).await {
            Ok(response) => results.push((symbol, response.current_price)),
            Err(e) => {
                log::warn!("Quote refresh failed for {}: {}", symbol, e);
                report.failed += 1;
            }
        }
    }

    match cache.write() {
        Ok(mut guard) => match guard.merge(generation, results) {
            Some(updated) => report.updated = updated,
            None => report.discarded = true,
        },
        Err(e) => log::error!("Price cache lock poisoned: {}", e),
    }

    report
}

/// Handle of a running poller; stops the task when dropped
pub struct PricePoller {
    handle: JoinHandle<()>,
}

impl PricePoller {
    pub fn stop(self) {
        self.handle.abort();
    }

    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }
}

impl Drop for PricePoller {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Refresh the cache every `every` until the returned handle is stopped
pub fn spawn_price_poller<S>(source: Arc<S>, cache: SharedPriceCache, every: Duration) -> PricePoller
where
    S: QuoteSource + 'static,
{
    let handle = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;
            let report = poll_once(source.as_ref(), &cache).await;
            log::debug!(
                "Price poll (generation {}): {}/{} updated, {} failed{}",
                report.generation,
                report.updated,
                report.requested,
                report.failed,
                if report.discarded { ", discarded as stale" } else { "" }
            );
        }
    });

    PricePoller { handle }
}

/// Watch exactly `symbols`, returning the new generation
pub fn watch_symbols(cache: &SharedPriceCache, symbols: Vec<String>) -> u64 {
    match cache.write() {
        Ok(mut guard) => guard.watch(symbols),
        Err(e) => {
            log::error!("Price cache lock poisoned: {}", e);
            0
        }
    }
}
