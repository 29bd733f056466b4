use core_types::{PriceLookup, PriceQuote};
use events::{PriceEvent, PriceUpdate};
use parking_lot::RwLock;
use rust_decimal::Decimal;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::Instant;

const EVENT_CHANNEL_CAPACITY: usize = 1024;

#[derive(Debug, Clone)]
struct StoredQuote {
    quote: PriceQuote,
    accepted_at: Instant,
}

/// The shared `trade id -> current price` map.
///
/// Cloning the store clones a handle; every clone sees the same map. Anyone may read
/// or subscribe, but only the reconciler in this crate writes. A write is accepted
/// when the trade has no quote yet, when the new quote comes from a source of equal
/// or higher priority, or when the existing quote has outlived the priority window.
#[derive(Clone)]
pub struct PriceStore {
    quotes: Arc<RwLock<HashMap<String, StoredQuote>>>,
    events: broadcast::Sender<PriceEvent>,
    priority_window: Duration,
}

impl PriceStore {
    pub fn new(priority_window: Duration) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            quotes: Arc::new(RwLock::new(HashMap::new())),
            events,
            priority_window,
        }
    }

    pub fn get(&self, trade_id: &str) -> Option<Decimal> {
        self.quotes.read().get(trade_id).map(|s| s.quote.price)
    }

    pub fn quote(&self, trade_id: &str) -> Option<PriceQuote> {
        self.quotes.read().get(trade_id).map(|s| s.quote.clone())
    }

    pub fn snapshot(&self) -> HashMap<String, Decimal> {
        self.quotes
            .read()
            .iter()
            .map(|(id, s)| (id.clone(), s.quote.price))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.quotes.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.quotes.read().is_empty()
    }

    /// Receives every accepted update and every removal from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<PriceEvent> {
        self.events.subscribe()
    }

    /// True when a source ranked strictly above `rank` priced the trade within the
    /// priority window.
    pub(crate) fn has_fresh_quote_above(&self, trade_id: &str, rank: u8) -> bool {
        self.quotes.read().get(trade_id).is_some_and(|s| {
            s.quote.source_rank < rank && s.accepted_at.elapsed() < self.priority_window
        })
    }

    /// Stores `quote` unless a fresher quote from a higher-priority source exists.
    /// Returns whether the quote was accepted.
    pub(crate) fn set_if_higher_priority(&self, quote: PriceQuote) -> bool {
        let accepted = {
            let mut quotes = self.quotes.write();
            let admissible = match quotes.get(&quote.trade_id) {
                None => true,
                Some(existing) => {
                    quote.source_rank <= existing.quote.source_rank
                        || existing.accepted_at.elapsed() >= self.priority_window
                }
            };
            if admissible {
                quotes.insert(
                    quote.trade_id.clone(),
                    StoredQuote {
                        quote: quote.clone(),
                        accepted_at: Instant::now(),
                    },
                );
            }
            admissible
        };

        if accepted {
            // No subscribers is fine.
            let _ = self.events.send(PriceEvent::Updated(PriceUpdate::from(&quote)));
        }
        accepted
    }

    /// Drops quotes for trades outside `open_ids` and returns their ids.
    pub(crate) fn retain(&self, open_ids: &HashSet<String>) -> Vec<String> {
        let removed: Vec<String> = {
            let mut quotes = self.quotes.write();
            let stale: Vec<String> = quotes
                .keys()
                .filter(|id| !open_ids.contains(*id))
                .cloned()
                .collect();
            for id in &stale {
                quotes.remove(id);
            }
            stale
        };

        if !removed.is_empty() {
            let _ = self.events.send(PriceEvent::Removed(removed.clone()));
        }
        removed
    }
}

impl PriceLookup for PriceStore {
    fn current_price(&self, trade_id: &str) -> Option<Decimal> {
        self.get(trade_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn quote(id: &str, price: Decimal, rank: u8) -> PriceQuote {
        PriceQuote {
            trade_id: id.to_string(),
            price,
            source_rank: rank,
            fetched_at: Utc::now(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn lower_priority_cannot_overwrite_within_window() {
        let store = PriceStore::new(Duration::from_secs(60));

        assert!(store.set_if_higher_priority(quote("t", dec!(1.0), 0)));
        assert!(!store.set_if_higher_priority(quote("t", dec!(9.9), 2)));
        assert_eq!(store.get("t"), Some(dec!(1.0)));

        // Same rank always refreshes.
        assert!(store.set_if_higher_priority(quote("t", dec!(1.1), 0)));
        assert_eq!(store.get("t"), Some(dec!(1.1)));
    }

    #[tokio::test(start_paused = true)]
    async fn stale_higher_priority_quote_yields_to_fallback() {
        let store = PriceStore::new(Duration::from_secs(60));
        store.set_if_higher_priority(quote("t", dec!(1.0), 0));

        tokio::time::advance(Duration::from_secs(61)).await;

        assert!(!store.has_fresh_quote_above("t", 2));
        assert!(store.set_if_higher_priority(quote("t", dec!(2.0), 2)));
        assert_eq!(store.quote("t").unwrap().source_rank, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn higher_priority_always_wins() {
        let store = PriceStore::new(Duration::from_secs(60));
        store.set_if_higher_priority(quote("t", dec!(2.0), 2));

        assert!(store.has_fresh_quote_above("t", 3));
        assert!(!store.has_fresh_quote_above("t", 2));
        assert!(store.set_if_higher_priority(quote("t", dec!(1.0), 0)));
        assert_eq!(store.get("t"), Some(dec!(1.0)));
    }

    #[tokio::test]
    async fn retain_removes_and_publishes() {
        let store = PriceStore::new(Duration::from_secs(60));
        let mut rx = store.subscribe();
        store.set_if_higher_priority(quote("keep", dec!(1), 1));
        store.set_if_higher_priority(quote("drop", dec!(1), 1));

        let open = HashSet::from(["keep".to_string()]);
        assert_eq!(store.retain(&open), vec!["drop".to_string()]);
        assert_eq!(store.len(), 1);
        assert_eq!(store.current_price("drop"), None);

        let mut saw_removal = false;
        while let Ok(event) = rx.try_recv() {
            if let PriceEvent::Removed(ids) = event {
                saw_removal = ids == vec!["drop".to_string()];
            }
        }
        assert!(saw_removal);
    }
}
