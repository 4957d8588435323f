// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Proxy request store (spec §4.8): a bounded ring of `RequestRecord`s,
//! reusing `px-logs`'s generic ring/fan-out mechanics, plus an eviction hook
//! used to purge a captured request's temp-file directory.

use parking_lot::Mutex;
use px_core::{RequestDetails, RequestRecord};
use px_logs::{Fanout, Ring, Subscription, DEFAULT_QUEUE_SIZE};

/// Default ring size for proxy request records (spec §4.8 "implementation
/// defined, e.g. 1000").
pub const DEFAULT_CAPACITY: usize = 1000;

type RequestFanout = Fanout<RequestRecord, Box<dyn Fn(&RequestRecord) -> bool + Send + Sync>>;

/// Invoked with the evicted record's id when the ring drops the oldest
/// entry to make room (spec §4.8 "used to purge captured-body temp
/// files").
pub type EvictionHook = Box<dyn Fn(&str) + Send + Sync>;

pub struct RequestStore {
    ring: Ring<RequestRecord>,
    fanout: RequestFanout,
    eviction_hook: Mutex<Option<EvictionHook>>,
}

impl RequestStore {
    pub fn new(capacity: usize) -> Self {
        Self { ring: Ring::new(capacity), fanout: Fanout::new(DEFAULT_QUEUE_SIZE), eviction_hook: Mutex::new(None) }
    }

    pub fn set_eviction_hook(&self, hook: impl Fn(&str) + Send + Sync + 'static) {
        *self.eviction_hook.lock() = Some(Box::new(hook));
    }

    /// Append `record`, broadcast it, and invoke the eviction hook
    /// synchronously when an older record falls out of the ring (spec §9's
    /// open question on hook synchrony is resolved in favor of synchronous
    /// invocation — see DESIGN.md).
    pub fn record(&self, record: RequestRecord) {
        let evicted = self.ring.append(record.clone());
        self.fanout.broadcast(&record);
        if let Some(evicted) = evicted {
            if let Some(hook) = self.eviction_hook.lock().as_ref() {
                hook(&evicted.id);
            }
        }
    }

    /// Attach late-arriving details (captured bodies) to an already
    /// recorded entry. Response bodies may still be streaming (e.g. SSE)
    /// when `record` is called, so details are filled in once the tee
    /// finishes draining, rather than delaying `record` until the full
    /// response has flowed to the client.
    pub fn attach_details(&self, id: &str, details: RequestDetails) {
        self.ring.update(|entry| {
            if entry.id == id {
                entry.details = Some(details);
                true
            } else {
                false
            }
        });
    }

    /// Merge a partial update into an entry's details, creating them with
    /// the rest defaulted if this is the first piece to arrive. Request and
    /// response body captures finish independently (the response may still
    /// be streaming after the request body tee has already completed), so
    /// neither can assume it is filling in the first or the last field.
    pub fn update_details(&self, id: &str, f: impl FnOnce(&mut RequestDetails)) {
        self.ring.update(|entry| {
            if entry.id == id {
                let mut details = entry.details.take().unwrap_or_default();
                f(&mut details);
                entry.details = Some(details);
                true
            } else {
                false
            }
        });
    }

    pub fn get(&self, id: &str) -> Option<RequestRecord> {
        self.ring.snapshot().into_iter().find(|r| r.id == id)
    }

    /// Most recent `limit` records (0 = everything), oldest first.
    pub fn recent(&self, limit: usize) -> Vec<RequestRecord> {
        if limit == 0 {
            self.ring.snapshot()
        } else {
            self.ring.tail(limit)
        }
    }

    pub fn subscribe(&self) -> Subscription<RequestRecord> {
        self.fanout.subscribe(Box::new(|_: &RequestRecord| true))
    }

    pub fn shutdown(&self) {
        self.fanout.close();
    }
}
