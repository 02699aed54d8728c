use crate::error::{IndexerError, Result};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

pub(crate) const MAX_INDEX_CONCURRENCY: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct IndexConcurrencySnapshot {
    pub limit: usize,
    pub in_flight: usize,
    pub waiters: usize,
}

/// Parsing is CPU bound; leave one core for the runtime on larger machines
pub(crate) fn default_index_concurrency() -> usize {
    let cpus = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    let value = if cpus <= 2 { cpus } else { cpus - 1 };
    value.clamp(1, MAX_INDEX_CONCURRENCY)
}

pub(crate) fn parse_index_concurrency(raw: Option<&str>, default_value: usize) -> usize {
    raw.map(str::trim)
        .filter(|v| !v.is_empty())
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(default_value)
        .clamp(1, MAX_INDEX_CONCURRENCY)
}

/// Bounds how many directory tasks run at once
#[derive(Clone)]
pub(crate) struct IndexLimiter {
    limit: usize,
    semaphore: Arc<Semaphore>,
    in_flight: Arc<AtomicUsize>,
    waiters: Arc<AtomicUsize>,
}

impl IndexLimiter {
    pub(crate) fn new(limit: usize) -> Self {
        let limit = limit.clamp(1, MAX_INDEX_CONCURRENCY);
        Self {
            limit,
            semaphore: Arc::new(Semaphore::new(limit)),
            in_flight: Arc::new(AtomicUsize::new(0)),
            waiters: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub(crate) async fn acquire(&self) -> Result<IndexingPermit> {
        self.waiters.fetch_add(1, Ordering::Relaxed);
        let permit = self.semaphore.clone().acquire_owned().await;
        self.waiters.fetch_sub(1, Ordering::Relaxed);
        let permit =
            permit.map_err(|e| IndexerError::TaskFailed(format!("index limiter: {e}")))?;
        self.in_flight.fetch_add(1, Ordering::Relaxed);
        Ok(IndexingPermit {
            _permit: permit,
            in_flight: self.in_flight.clone(),
        })
    }

    pub(crate) fn snapshot(&self) -> IndexConcurrencySnapshot {
        IndexConcurrencySnapshot {
            limit: self.limit,
            in_flight: self.in_flight.load(Ordering::Relaxed),
            waiters: self.waiters.load(Ordering::Relaxed),
        }
    }
}

pub(crate) struct IndexingPermit {
    _permit: OwnedSemaphorePermit,
    in_flight: Arc<AtomicUsize>,
}

impl Drop for IndexingPermit {
    fn drop(&mut self) {
        self.in_flight.fetch_sub(1, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parse_index_concurrency_defaults_and_clamps() {
        let default_value = default_index_concurrency();
        assert_eq!(parse_index_concurrency(None, default_value), default_value);
        assert_eq!(
            parse_index_concurrency(Some("   "), default_value),
            default_value
        );
        assert_eq!(parse_index_concurrency(Some("2"), default_value), 2);
        assert_eq!(parse_index_concurrency(Some("0"), default_value), 1);
        assert_eq!(
            parse_index_concurrency(Some("999"), default_value),
            MAX_INDEX_CONCURRENCY
        );
        assert_eq!(
            parse_index_concurrency(Some("abc"), default_value),
            default_value
        );
        assert_eq!(parse_index_concurrency(Some(" 5 "), default_value), 5);
    }

    #[tokio::test]
    async fn permits_track_in_flight_work() {
        let limiter = IndexLimiter::new(2);
        let first = limiter.acquire().await.unwrap();
        let second = limiter.acquire().await.unwrap();
        assert_eq!(
            limiter.snapshot(),
            IndexConcurrencySnapshot {
                limit: 2,
                in_flight: 2,
                waiters: 0
            }
        );
        drop(first);
        drop(second);
        assert_eq!(limiter.snapshot().in_flight, 0);
    }

    #[tokio::test]
    async fn closed_limiter_is_an_error() {
        let limiter = IndexLimiter::new(1);
        limiter.semaphore.close();
        assert!(matches!(
            limiter.acquire().await,
            Err(IndexerError::TaskFailed(_))
        ));
        assert_eq!(limiter.snapshot().waiters, 0);
        assert_eq!(limiter.snapshot().in_flight, 0);
    }
}
