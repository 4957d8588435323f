// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! px-api: the admin HTTP API (SPEC_FULL §4.12) — JSON wire shapes (spec
//! §6) served over `axum`, distinct from the proxy's subdomain-routed
//! reverse-proxy listener. Grounded on `oj-wire`'s role as the protocol
//! crate, generalized from a length-prefixed JSON IPC frame to HTTP/JSON.

mod error;
mod routes;
mod router;
mod state;

pub use error::{ApiError, ErrorBody};
pub use router::{build_default_router, build_router};
pub use state::{AppState, DEFAULT_CONTROL_DEADLINE};
