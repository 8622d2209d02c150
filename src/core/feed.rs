// src/core/feed.rs
use crate::types::{IndicatorSnapshot, MarketSnapshot};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;

/// The latest copy of one polled series, stamped with the ticket of the
/// request that produced it.
#[derive(Debug)]
pub struct Series<T> {
    pub ticket: u64,
    pub items: Arc<Vec<T>>,
}

impl<T> Clone for Series<T> {
    fn clone(&self) -> Self {
        Self {
            ticket: self.ticket,
            items: Arc::clone(&self.items),
        }
    }
}

impl<T> Default for Series<T> {
    fn default() -> Self {
        Self {
            ticket: 0,
            items: Arc::new(Vec::new()),
        }
    }
}

/// A series that is replaced wholesale on every successful poll.
///
/// Requests take a ticket before they are sent. A response is published only
/// if its ticket is newer than the one already held, so a slow response can
/// never overwrite a fresher one.
pub struct SeriesCell<T> {
    next_ticket: AtomicU64,
    tx: watch::Sender<Series<T>>,
}

impl<T> Default for SeriesCell<T> {
    fn default() -> Self {
        Self {
            next_ticket: AtomicU64::new(1),
            tx: watch::Sender::new(Series::default()),
        }
    }
}

impl<T: Clone> SeriesCell<T> {
    pub fn ticket(&self) -> u64 {
        self.next_ticket.fetch_add(1, Ordering::SeqCst)
    }

    /// Returns `None` when the response was older than what is held.
    pub fn publish(&self, ticket: u64, items: Vec<T>) -> Option<Arc<Vec<T>>> {
        let items = Arc::new(items);
        let accepted = self.tx.send_if_modified(|current| {
            if ticket <= current.ticket {
                return false;
            }
            *current = Series {
                ticket,
                items: Arc::clone(&items),
            };
            true
        });
        accepted.then_some(items)
    }

    #[cfg(test)]
    pub fn snapshot(&self) -> Series<T> {
        self.tx.borrow().clone()
    }

    pub fn latest(&self) -> Option<T> {
        self.tx.borrow().items.last().cloned()
    }

    pub fn len(&self) -> usize {
        self.tx.borrow().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Shared market state written by the poller and read by the decision engine.
#[derive(Default)]
pub struct MarketFeed {
    pub market: SeriesCell<MarketSnapshot>,
    pub indicators: SeriesCell<IndicatorSnapshot>,
}

impl MarketFeed {
    pub fn new() -> Self {
        Self::default()
    }

    /// The newest bar and indicator row, if both series have data.
    pub fn latest_pair(&self) -> Option<(MarketSnapshot, IndicatorSnapshot)> {
        Some((self.market.latest()?, self.indicators.latest()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{bar, indicator};

    #[test]
    fn newer_ticket_replaces_series() {
        let feed = MarketFeed::new();
        let first = feed.market.ticket();
        let second = feed.market.ticket();

        assert!(feed.market.publish(first, vec![bar(100, 1990.0)]).is_some());
        assert!(feed
            .market
            .publish(second, vec![bar(100, 1990.0), bar(105, 1992.0)])
            .is_some());

        assert_eq!(feed.market.len(), 2);
        assert_eq!(feed.market.latest().unwrap().close, 1992.0);
        assert_eq!(feed.market.snapshot().ticket, second);
    }

    #[test]
    fn late_response_is_discarded() {
        let feed = MarketFeed::new();
        let slow = feed.indicators.ticket();
        let fast = feed.indicators.ticket();

        assert!(feed.indicators.publish(fast, vec![indicator(105, 1996.0)]).is_some());
        assert!(feed.indicators.publish(slow, vec![indicator(100, 1995.0)]).is_none());

        assert_eq!(feed.indicators.latest().unwrap().time, 105);
    }

    #[test]
    fn latest_pair_needs_both_series() {
        let feed = MarketFeed::new();
        assert!(feed.latest_pair().is_none());

        let t = feed.market.ticket();
        feed.market.publish(t, vec![bar(100, 1990.0)]);
        assert!(feed.latest_pair().is_none());

        let t = feed.indicators.ticket();
        feed.indicators.publish(t, vec![indicator(100, 1995.0)]);
        let (market, ind) = feed.latest_pair().unwrap();
        assert_eq!(market.close, 1990.0);
        assert_eq!(ind.sma_20, Some(1995.0));
    }

    #[test]
    fn empty_response_still_supersedes() {
        let feed = MarketFeed::new();
        let t = feed.market.ticket();
        feed.market.publish(t, vec![bar(100, 1990.0)]);
        let t = feed.market.ticket();
        assert!(feed.market.publish(t, Vec::new()).is_some());
        assert!(feed.market.is_empty());
    }
}
