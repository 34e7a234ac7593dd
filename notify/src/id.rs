use std::sync::atomic::{AtomicU64, Ordering};

/// Handle returned by every subscribe call. Pass it back to unsubscribe.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    pub(crate) fn next() -> SubscriptionId {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        SubscriptionId(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}
