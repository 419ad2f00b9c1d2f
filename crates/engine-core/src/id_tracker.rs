use model::{
    core::identifiers::OffsetToken,
    records::{order::Order, order_item::OrderItem, projection::Projection},
};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{info, warn};

/// Hands out sequential order and order-item ids, continuing from what the
/// channels last committed.
///
/// Parallel instances get a namespace so their ids never collide: instance
/// 2 produces `2-1`, `2-2`, ... and resumes only from tokens in its own
/// namespace.
#[derive(Debug)]
pub struct IdTracker {
    namespace: Option<usize>,
    orders: AtomicU64,
    items: AtomicU64,
}

impl IdTracker {
    pub fn resume(
        last_order: Option<&OffsetToken>,
        last_item: Option<&OffsetToken>,
        namespace: Option<usize>,
    ) -> Self {
        let orders = parse_counter(last_order, Order::OFFSET_PREFIX, namespace);
        let items = parse_counter(last_item, OrderItem::OFFSET_PREFIX, namespace);
        info!(orders, items, ?namespace, "Id tracker initialized");

        Self {
            namespace,
            orders: AtomicU64::new(orders),
            items: AtomicU64::new(items),
        }
    }

    pub fn next_order_id(&self) -> String {
        let id = self.orders.fetch_add(1, Ordering::Relaxed) + 1;
        self.format(id)
    }

    /// Reserves `count` consecutive item ids.
    pub fn next_order_item_ids(&self, count: usize) -> Vec<String> {
        let count = count as u64;
        let start = self.items.fetch_add(count, Ordering::Relaxed) + 1;
        (start..start + count).map(|id| self.format(id)).collect()
    }

    pub fn current_order_counter(&self) -> u64 {
        self.orders.load(Ordering::Relaxed)
    }

    pub fn current_item_counter(&self) -> u64 {
        self.items.load(Ordering::Relaxed)
    }

    fn format(&self, id: u64) -> String {
        match self.namespace {
            Some(ns) => format!("{ns}-{id}"),
            None => id.to_string(),
        }
    }
}

/// Counter encoded in `token`, or 0 when there is no usable token.
fn parse_counter(token: Option<&OffsetToken>, prefix: &str, namespace: Option<usize>) -> u64 {
    let Some(token) = token else {
        return 0;
    };
    if token.as_str().is_empty() || token.as_str() == "NULL" {
        return 0;
    }

    let id = token.strip_prefix(prefix).and_then(|id| match namespace {
        Some(ns) => id.strip_prefix(&format!("{ns}-")),
        None => Some(id),
    });

    match id.and_then(|id| id.parse::<u64>().ok()) {
        Some(counter) => counter,
        None => {
            warn!(%token, "Failed to parse offset token, starting from 0");
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_from_zero_for_new_channels() {
        let tracker = IdTracker::resume(None, None, None);
        assert_eq!(tracker.next_order_id(), "1");
        assert_eq!(tracker.next_order_item_ids(3), ["1", "2", "3"]);
        assert_eq!(tracker.next_order_item_ids(1), ["4"]);
    }

    #[test]
    fn resumes_after_committed_tokens() {
        let tracker = IdTracker::resume(
            Some(&OffsetToken::from("order_41")),
            Some(&OffsetToken::from("item_120")),
            None,
        );
        assert_eq!(tracker.next_order_id(), "42");
        assert_eq!(tracker.next_order_item_ids(2), ["121", "122"]);
    }

    #[test]
    fn ignores_unparsable_tokens() {
        let tracker = IdTracker::resume(
            Some(&OffsetToken::from("order_abc")),
            Some(&OffsetToken::from("NULL")),
            None,
        );
        assert_eq!(tracker.current_order_counter(), 0);
        assert_eq!(tracker.current_item_counter(), 0);

        let wrong_prefix = IdTracker::resume(Some(&OffsetToken::from("item_5")), None, None);
        assert_eq!(wrong_prefix.current_order_counter(), 0);
    }

    #[test]
    fn namespaced_ids_resume_within_their_namespace() {
        let tracker = IdTracker::resume(
            Some(&OffsetToken::from("order_3-17")),
            Some(&OffsetToken::from("item_3-40")),
            Some(3),
        );
        assert_eq!(tracker.next_order_id(), "3-18");
        assert_eq!(tracker.next_order_item_ids(1), ["3-41"]);

        let other = IdTracker::resume(Some(&OffsetToken::from("order_3-17")), None, Some(4));
        assert_eq!(other.current_order_counter(), 0);
    }

    #[test]
    fn zero_items_reserves_nothing() {
        let tracker = IdTracker::resume(None, None, None);
        assert!(tracker.next_order_item_ids(0).is_empty());
        assert_eq!(tracker.next_order_item_ids(1), ["1"]);
    }
}
