// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Builds the admin `axum::Router` (SPEC_FULL §4.12), separate from the
//! proxy's subdomain-routed listener.

use crate::routes::{logs, processes, proxy};
use crate::state::AppState;
use axum::routing::{get, post};
use axum::Router;
use px_core::{Clock, SystemClock};

pub fn build_router<C: Clock + 'static>(state: AppState<C>) -> Router {
    Router::new()
        .route("/api/processes", get(processes::list_processes::<C>))
        .route("/api/processes/:name", get(processes::get_process::<C>))
        .route("/api/processes/:name/start", post(processes::start_process::<C>))
        .route("/api/processes/:name/stop", post(processes::stop_process::<C>))
        .route("/api/processes/:name/restart", post(processes::restart_process::<C>))
        .route("/api/logs", get(logs::query_logs::<C>))
        .route("/api/logs/stream", get(logs::stream_logs::<C>))
        .route("/api/proxy/requests", get(proxy::proxy_requests::<C>))
        .with_state(state)
}

/// Convenience for the common case of the production `SystemClock`.
pub fn build_default_router(state: AppState<SystemClock>) -> Router {
    build_router(state)
}
