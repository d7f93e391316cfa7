use std::sync::RwLock;

use tokio::sync::broadcast;
use tracing::trace;

use reaf_types::OperationId;

use crate::message::ProgressMessage;

/// Selects which progress messages a subscriber receives.
#[derive(Clone, Debug, Default)]
pub struct ProgressFilter {
    /// If set, only messages for these operations are delivered.
    pub operation_ids: Option<Vec<OperationId>>,
    /// Deliver only `COMPLETION` and `ERROR`.
    pub terminal_only: bool,
}

impl ProgressFilter {
    /// Everything.
    pub fn all() -> Self {
        Self::default()
    }

    /// Only messages for `operation_id`.
    pub fn operation(operation_id: OperationId) -> Self {
        Self {
            operation_ids: Some(vec![operation_id]),
            terminal_only: false,
        }
    }

    pub fn terminal_only(mut self) -> Self {
        self.terminal_only = true;
        self
    }

    pub fn matches(&self, message: &ProgressMessage) -> bool {
        if self.terminal_only && !message.is_terminal() {
            return false;
        }
        match self.operation_ids {
            Some(ref ids) => ids.contains(message.operation_id()),
            None => true,
        }
    }
}

/// Receiver for hub messages.
pub type ProgressSubscription = broadcast::Receiver<ProgressMessage>;

struct Subscriber {
    filter: ProgressFilter,
    sender: broadcast::Sender<ProgressMessage>,
}

/// Fans progress messages out to filtered subscribers.
///
/// Subscribers whose receivers have all been dropped are pruned on the
/// next routed message.
pub struct ProgressHub {
    subscribers: RwLock<Vec<Subscriber>>,
    capacity: usize,
}

impl ProgressHub {
    pub fn new(capacity: usize) -> Self {
        Self {
            subscribers: RwLock::new(Vec::new()),
            capacity: capacity.max(1),
        }
    }

    /// Register a subscriber for messages matching `filter`.
    ///
    /// Each subscriber has its own buffer of the hub's capacity. A subscriber
    /// that falls behind loses its oldest messages and its next `recv`
    /// returns `RecvError::Lagged(n)`; receiving again resumes with the
    /// oldest retained message. A run's terminal message is the last one it
    /// sends, so it is only lost if more than `capacity` later messages
    /// arrive before the subscriber catches up. Use
    /// [`ProgressFilter::terminal_only`] when only outcomes matter.
    pub fn subscribe(&self, filter: ProgressFilter) -> ProgressSubscription {
        let (sender, rx) = broadcast::channel(self.capacity);
        self.subscribers
            .write()
            .expect("hub lock poisoned")
            .push(Subscriber { filter, sender });
        rx
    }

    /// Deliver `message` to every matching subscriber.
    pub fn route(&self, message: &ProgressMessage) {
        let mut subs = self.subscribers.write().expect("hub lock poisoned");
        subs.retain(|sub| {
            if sub.filter.matches(message) {
                sub.sender.send(message.clone()).is_ok()
            } else {
                sub.sender.receiver_count() > 0
            }
        });
        trace!(
            kind = message.type_name(),
            subscribers = subs.len(),
            "progress routed"
        );
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().expect("hub lock poisoned").len()
    }
}

impl std::fmt::Debug for ProgressHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressHub")
            .field("subscribers", &self.subscriber_count())
            .field("capacity", &self.capacity)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::BulkOperationProgress;

    fn update(op: &str) -> ProgressMessage {
        ProgressMessage::ProgressUpdate {
            data: BulkOperationProgress::start(op.into(), 1),
        }
    }

    fn completion(op: &str) -> ProgressMessage {
        let mut data = BulkOperationProgress::start(op.into(), 0);
        data.complete();
        ProgressMessage::Completion { data }
    }

    #[test]
    fn filter_by_operation() {
        let hub = ProgressHub::new(8);
        let mut mine = hub.subscribe(ProgressFilter::operation("a".into()));
        let mut all = hub.subscribe(ProgressFilter::all());

        hub.route(&update("a"));
        hub.route(&update("b"));

        assert_eq!(mine.try_recv().unwrap().operation_id().as_str(), "a");
        assert!(mine.try_recv().is_err());
        assert_eq!(all.try_recv().unwrap().operation_id().as_str(), "a");
        assert_eq!(all.try_recv().unwrap().operation_id().as_str(), "b");
    }

    #[test]
    fn terminal_only_skips_updates() {
        let hub = ProgressHub::new(8);
        let mut rx = hub.subscribe(ProgressFilter::all().terminal_only());
        hub.route(&update("a"));
        hub.route(&completion("a"));
        assert_eq!(rx.try_recv().unwrap().type_name(), "COMPLETION");
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn lagging_subscriber_keeps_terminal_message() {
        let hub = ProgressHub::new(2);
        let mut rx = hub.subscribe(ProgressFilter::all());
        for _ in 0..5 {
            hub.route(&update("a"));
        }
        hub.route(&completion("a"));

        assert!(matches!(
            rx.try_recv(),
            Err(broadcast::error::TryRecvError::Lagged(4))
        ));
        assert_eq!(rx.try_recv().unwrap().type_name(), "PROGRESS_UPDATE");
        assert_eq!(rx.try_recv().unwrap().type_name(), "COMPLETION");
    }

    #[test]
    fn dropped_subscribers_are_pruned() {
        let hub = ProgressHub::new(8);
        let rx = hub.subscribe(ProgressFilter::all());
        let _kept = hub.subscribe(ProgressFilter::operation("z".into()));
        assert_eq!(hub.subscriber_count(), 2);
        drop(rx);
        hub.route(&update("a"));
        assert_eq!(hub.subscriber_count(), 1);
    }
}
