// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `/api/proxy/requests` handler (SPEC_FULL §4.12): recent `RequestRecord`s
//! from the proxy's request store, 404 `PROXY_NOT_ENABLED` when the proxy
//! is not configured.

use crate::error::ApiError;
use crate::state::AppState;
use axum::extract::{Query, State};
use axum::Json;
use px_core::{Clock, ErrorCode, RequestRecord};
use serde::Deserialize;

#[derive(Debug, Deserialize, Default)]
pub struct RequestsQuery {
    pub limit: Option<usize>,
}

pub async fn proxy_requests<C: Clock>(
    State(state): State<AppState<C>>,
    Query(query): Query<RequestsQuery>,
) -> Result<Json<Vec<RequestRecord>>, ApiError> {
    let proxy = state.proxy.as_ref().ok_or_else(|| ApiError::new(ErrorCode::ProxyNotEnabled, "proxy is not enabled"))?;
    Ok(Json(proxy.request_store().recent(query.limit.unwrap_or(0))))
}
