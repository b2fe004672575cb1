//! Broadcast fan-out
//!
//! Pushes every committed mutation to all currently subscribed observers in
//! commit order. Delivery is fire-and-forget: publishing never blocks the
//! commit path, and a slow observer lags (and eventually misses mutations)
//! rather than stalling the grid. Late joiners get nothing retroactively;
//! they reconcile through the snapshot protocol instead.

use mural_core::CommittedMutation;
use tokio::sync::broadcast;

/// Fan-out hub for one grid instance
#[derive(Debug)]
pub struct Fanout {
    sender: broadcast::Sender<CommittedMutation>,
}

impl Fanout {
    /// Create a hub with the given per-observer buffer capacity
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribe to mutations committed after this call
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<CommittedMutation> {
        self.sender.subscribe()
    }

    /// Deliver a committed mutation to every live observer
    ///
    /// Never fails and never blocks; with zero observers the mutation is
    /// simply dropped.
    pub fn publish(&self, mutation: &CommittedMutation) {
        // send only errors when there are no receivers.
        let _ = self.sender.send(mutation.clone());
    }

    /// Number of live observers
    #[inline]
    #[must_use]
    pub fn observer_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mural_core::Color;
    use pretty_assertions::assert_eq;

    fn mutation(x: u32, committed_at: i64) -> CommittedMutation {
        CommittedMutation {
            x,
            y: 0,
            color: Color::rgb(255, 0, 0),
            painted_by: "p1".into(),
            committed_at,
        }
    }

    #[tokio::test]
    async fn observers_receive_in_commit_order() {
        let fanout = Fanout::new(16);
        let mut rx = fanout.subscribe();

        fanout.publish(&mutation(1, 100));
        fanout.publish(&mutation(2, 200));
        fanout.publish(&mutation(3, 300));

        assert_eq!(rx.recv().await.unwrap().x, 1);
        assert_eq!(rx.recv().await.unwrap().x, 2);
        assert_eq!(rx.recv().await.unwrap().x, 3);
    }

    #[tokio::test]
    async fn publish_without_observers_is_a_no_op() {
        let fanout = Fanout::new(16);
        fanout.publish(&mutation(1, 100));
        assert_eq!(fanout.observer_count(), 0);
    }

    #[tokio::test]
    async fn late_joiner_sees_nothing_retroactively() {
        let fanout = Fanout::new(16);
        fanout.publish(&mutation(1, 100));

        let mut rx = fanout.subscribe();
        fanout.publish(&mutation(2, 200));

        // Only the post-subscription mutation arrives.
        assert_eq!(rx.recv().await.unwrap().x, 2);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn every_observer_gets_every_mutation() {
        let fanout = Fanout::new(16);
        let mut a = fanout.subscribe();
        let mut b = fanout.subscribe();

        fanout.publish(&mutation(7, 100));

        assert_eq!(a.recv().await.unwrap().x, 7);
        assert_eq!(b.recv().await.unwrap().x, 7);
    }
}
