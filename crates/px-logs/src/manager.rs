// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Log manager: composes the ring buffer and subscription fan-out
//! (spec §4.3).

use crate::fanout::{Fanout, Subscription, DEFAULT_QUEUE_SIZE};
use crate::ring::Ring;
use px_core::{Clock, LogEntry, LogFilter, Stream, SystemClock};
use std::sync::Arc;

/// Default ring capacity (spec §4.1).
pub const DEFAULT_CAPACITY: usize = 1000;

type LogFanout = Fanout<LogEntry, Box<dyn Fn(&LogEntry) -> bool + Send + Sync>>;

pub struct LogStats {
    pub count: usize,
    pub capacity: usize,
    pub subscriber_count: usize,
}

/// Owns the ring and the subscription registry exclusively; nothing else
/// mutates either.
pub struct LogManager<C: Clock = SystemClock> {
    ring: Ring<LogEntry>,
    fanout: LogFanout,
    clock: C,
}

impl LogManager<SystemClock> {
    pub fn new(capacity: usize) -> Self {
        Self::with_clock(capacity, SystemClock)
    }
}

impl<C: Clock> LogManager<C> {
    pub fn with_clock(capacity: usize, clock: C) -> Self {
        Self { ring: Ring::new(capacity), fanout: Fanout::new(DEFAULT_QUEUE_SIZE), clock }
    }

    /// Append `entry` to the ring, then broadcast it. Append and broadcast
    /// happen within this single call, so broadcast never reorders relative
    /// to appends (spec §4.2 ordering).
    pub fn write(&self, entry: LogEntry) {
        self.ring.append(entry.clone());
        self.fanout.broadcast(&entry);
    }

    /// Convenience for supervisor-originated lifecycle lines, tagged on the
    /// stderr stream of the owning process (spec §4.3 `write_system`).
    pub fn write_system(&self, process_name: &str, line: impl Into<String>) {
        self.write(LogEntry::new(self.clock.epoch_ms(), process_name, Stream::Stderr, line));
    }

    /// Filtered snapshot, returning at most `limit` entries (0 = unlimited)
    /// plus the total count before truncation.
    pub fn query(&self, filter: &LogFilter, limit: usize) -> (Vec<LogEntry>, usize) {
        let matched: Vec<LogEntry> = self.ring.snapshot().into_iter().filter(|e| filter.matches(e)).collect();
        let total = matched.len();
        if limit > 0 && matched.len() > limit {
            let start = matched.len() - limit;
            (matched[start..].to_vec(), total)
        } else {
            (matched, total)
        }
    }

    /// Filtered tail: snapshot, filter, then take the last `n`.
    pub fn query_tail(&self, filter: &LogFilter, n: usize) -> Vec<LogEntry> {
        let matched: Vec<LogEntry> = self.ring.snapshot().into_iter().filter(|e| filter.matches(e)).collect();
        let start = matched.len().saturating_sub(n);
        matched[start..].to_vec()
    }

    pub fn subscribe(&self, filter: LogFilter) -> Subscription<LogEntry> {
        self.fanout.subscribe(Box::new(move |entry: &LogEntry| filter.matches(entry)))
    }

    pub fn unsubscribe(&self, id: px_core::SubscriptionId) {
        self.fanout.unsubscribe(id);
    }

    pub fn stats(&self) -> LogStats {
        LogStats { count: self.ring.len(), capacity: self.ring.capacity(), subscriber_count: self.fanout.subscriber_count() }
    }

    /// Close all subscriptions. Called on supervisor shutdown.
    pub fn shutdown(&self) {
        self.fanout.close();
    }
}

pub type SharedLogManager<C = SystemClock> = Arc<LogManager<C>>;
