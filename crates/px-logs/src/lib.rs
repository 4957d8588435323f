// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! px-logs: the ring log buffer, subscription fan-out, and the log manager
//! that composes them (spec §4.1–§4.3). The ring and fan-out primitives are
//! generic so `px-proxy`'s request store can reuse the same mechanics
//! (spec §4.8).

pub mod fanout;
pub mod manager;
pub mod ring;

pub use fanout::{Fanout, Subscription, DEFAULT_QUEUE_SIZE};
pub use manager::{LogManager, LogStats, SharedLogManager, DEFAULT_CAPACITY};
pub use ring::Ring;
