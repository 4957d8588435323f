// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Subscription fan-out with bounded per-subscriber queues and non-blocking
//! broadcast (spec §4.2). Generic over the entry type and its filter so the
//! proxy's request store (spec §4.8) can reuse the same mechanics.

use parking_lot::RwLock;
use px_core::SubscriptionId;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::warn;

/// Default bounded queue depth for a subscriber (spec §4.2).
pub const DEFAULT_QUEUE_SIZE: usize = 100;

struct Subscriber<T, F> {
    sender: mpsc::Sender<T>,
    filter: F,
    closed: Arc<AtomicBool>,
    /// Set on a dropped entry, cleared by `Subscription::take_dropped`;
    /// shared with the `Subscription` handle so consumers can observe it.
    dropped: Arc<AtomicBool>,
    /// Guards the "log at most once per drop event" diagnostic (spec §4.2),
    /// independent of whether a consumer has observed `dropped` yet.
    warned: AtomicBool,
}

/// A live subscription handle returned from `Fanout::subscribe`. Dropping it
/// does not unsubscribe — callers must call `Fanout::unsubscribe` (mirrors
/// the log manager owning the registry exclusively).
pub struct Subscription<T> {
    pub id: SubscriptionId,
    pub receiver: mpsc::Receiver<T>,
    closed: Arc<AtomicBool>,
    dropped: Arc<AtomicBool>,
}

impl<T> Subscription<T> {
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Consume the "at least one entry was dropped since the last check"
    /// flag, resetting it. Used by consumers (e.g. the admin API's
    /// websocket log stream) that want to emit a single diagnostic per drop
    /// event without polling the broadcaster directly (spec §4.2).
    pub fn take_dropped(&self) -> bool {
        self.dropped.swap(false, Ordering::Relaxed)
    }
}

/// Registry of live subscriptions plus non-blocking broadcast.
pub struct Fanout<T, F> {
    subscribers: RwLock<HashMap<SubscriptionId, Subscriber<T, F>>>,
    queue_size: usize,
}

impl<T, F> Default for Fanout<T, F> {
    fn default() -> Self {
        Self::new(DEFAULT_QUEUE_SIZE)
    }
}

impl<T, F> Fanout<T, F> {
    pub fn new(queue_size: usize) -> Self {
        Self { subscribers: RwLock::new(HashMap::new()), queue_size }
    }

    pub fn subscribe(&self, filter: F) -> Subscription<T> {
        let (sender, receiver) = mpsc::channel(self.queue_size.max(1));
        let id = SubscriptionId::next();
        let closed = Arc::new(AtomicBool::new(false));
        let dropped = Arc::new(AtomicBool::new(false));
        self.subscribers.write().insert(
            id,
            Subscriber {
                sender,
                filter,
                closed: Arc::clone(&closed),
                dropped: Arc::clone(&dropped),
                warned: AtomicBool::new(false),
            },
        );
        Subscription { id, receiver, closed, dropped }
    }

    /// Idempotent: unsubscribing an id twice (or an id that never existed)
    /// never faults.
    pub fn unsubscribe(&self, id: SubscriptionId) {
        if let Some(sub) = self.subscribers.write().remove(&id) {
            sub.closed.store(true, Ordering::Release);
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().len()
    }

    /// Close every subscription, marking each closed so a subsequent receive
    /// observes the channel as closed rather than blocking forever.
    pub fn close(&self) {
        let mut subscribers = self.subscribers.write();
        for (_, sub) in subscribers.drain() {
            sub.closed.store(true, Ordering::Release);
        }
    }
}

impl<T: Clone, F: Fn(&T) -> bool> Fanout<T, F> {
    /// Deliver `entry` to every subscriber whose filter matches, under a
    /// shared read lock. Delivery is non-blocking: a full queue drops the
    /// entry for that subscriber (logged once per drop event) rather than
    /// stalling the broadcaster.
    pub fn broadcast(&self, entry: &T) {
        let subscribers = self.subscribers.read();
        for sub in subscribers.values() {
            if !(sub.filter)(entry) {
                continue;
            }
            match sub.sender.try_send(entry.clone()) {
                Ok(()) => {
                    sub.warned.store(false, Ordering::Relaxed);
                }
                Err(mpsc::error::TrySendError::Full(_)) => {
                    sub.dropped.store(true, Ordering::Relaxed);
                    if !sub.warned.swap(true, Ordering::Relaxed) {
                        warn!("subscriber queue full, dropping entry");
                    }
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn always_true(_: &i32) -> bool {
        true
    }

    #[tokio::test]
    async fn subscriber_receives_broadcast_entries_in_order() {
        let fanout: Fanout<i32, fn(&i32) -> bool> = Fanout::new(10);
        let mut sub = fanout.subscribe(always_true as fn(&i32) -> bool);
        fanout.broadcast(&1);
        fanout.broadcast(&2);
        assert_eq!(sub.receiver.recv().await, Some(1));
        assert_eq!(sub.receiver.recv().await, Some(2));
    }

    #[tokio::test]
    async fn full_queue_drops_entries_without_blocking() {
        let fanout: Fanout<i32, fn(&i32) -> bool> = Fanout::new(2);
        let sub = fanout.subscribe(always_true as fn(&i32) -> bool);
        fanout.broadcast(&1);
        fanout.broadcast(&2);
        fanout.broadcast(&3); // dropped: queue full, no consumer yet
        drop(sub); // keep the receiver alive until after the drop above
    }

    #[tokio::test]
    async fn unsubscribe_is_idempotent_and_closes_queue() {
        let fanout: Fanout<i32, fn(&i32) -> bool> = Fanout::new(10);
        let sub = fanout.subscribe(always_true as fn(&i32) -> bool);
        let id = sub.id;
        fanout.unsubscribe(id);
        fanout.unsubscribe(id); // must not panic
        assert!(sub.is_closed());
        assert_eq!(fanout.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn close_marks_all_subscriptions_closed() {
        let fanout: Fanout<i32, fn(&i32) -> bool> = Fanout::new(10);
        let sub_a = fanout.subscribe(always_true as fn(&i32) -> bool);
        let sub_b = fanout.subscribe(always_true as fn(&i32) -> bool);
        fanout.close();
        assert!(sub_a.is_closed());
        assert!(sub_b.is_closed());
        assert_eq!(fanout.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn take_dropped_reports_and_resets_once() {
        let fanout: Fanout<i32, fn(&i32) -> bool> = Fanout::new(1);
        let sub = fanout.subscribe(always_true as fn(&i32) -> bool);
        fanout.broadcast(&1);
        fanout.broadcast(&2); // dropped: queue depth 1, no consumer yet
        assert!(sub.take_dropped());
        assert!(!sub.take_dropped());
    }

    #[tokio::test]
    async fn filter_excludes_non_matching_entries() {
        let fanout: Fanout<i32, fn(&i32) -> bool> = Fanout::new(10);
        let mut sub = fanout.subscribe((|v: &i32| *v % 2 == 0) as fn(&i32) -> bool);
        fanout.broadcast(&1);
        fanout.broadcast(&2);
        assert_eq!(sub.receiver.recv().await, Some(2));
    }
}
