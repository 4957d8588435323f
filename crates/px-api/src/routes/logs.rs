// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `/api/logs` and `/api/logs/stream` handlers (SPEC_FULL §4.12): the
//! former backed by `LogManager::query`, the latter a websocket forwarding
//! of a log `Subscription`.

use crate::error::ApiError;
use crate::state::AppState;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use px_core::{Clock, LogEntry, LogFilter};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Deserialize, Default)]
pub struct LogQuery {
    pub process: Option<String>,
    pub pattern: Option<String>,
    #[serde(default)]
    pub regex: bool,
    pub limit: Option<usize>,
}

impl LogQuery {
    fn to_filter(&self) -> Result<LogFilter, ApiError> {
        let process_names: HashSet<String> =
            self.process.as_deref().map(|p| p.split(',').map(str::trim).filter(|s| !s.is_empty()).map(str::to_string).collect()).unwrap_or_default();
        let pattern = self.pattern.clone().unwrap_or_default();
        LogFilter::new(process_names, pattern, self.regex).map_err(ApiError::from)
    }
}

#[derive(Debug, Serialize)]
pub struct LogsResponse {
    pub entries: Vec<LogEntry>,
    pub total: usize,
}

pub async fn query_logs<C: Clock>(State(state): State<AppState<C>>, Query(query): Query<LogQuery>) -> Result<Json<LogsResponse>, ApiError> {
    let filter = query.to_filter()?;
    let (entries, total) = state.log_manager.query(&filter, query.limit.unwrap_or(0));
    Ok(Json(LogsResponse { entries, total }))
}

pub async fn stream_logs<C: Clock>(
    ws: WebSocketUpgrade,
    State(state): State<AppState<C>>,
    Query(query): Query<LogQuery>,
) -> Result<Response, ApiError> {
    let filter = query.to_filter()?;
    Ok(ws.on_upgrade(move |socket| forward_logs(socket, state, filter)))
}

/// Forward every delivered entry as a JSON text frame until the client
/// disconnects or a drop is observed, in which case a single `{"dropped":
/// true}` control frame is sent (spec §4.2 one-diagnostic-per-drop-event
/// rule) before resuming delivery.
async fn forward_logs<C: Clock>(mut socket: WebSocket, state: AppState<C>, filter: LogFilter) {
    let mut sub = state.log_manager.subscribe(filter);
    loop {
        tokio::select! {
            entry = sub.receiver.recv() => {
                match entry {
                    Some(entry) => {
                        if sub.take_dropped() {
                            if socket.send(Message::Text(r#"{"dropped":true}"#.into())).await.is_err() {
                                break;
                            }
                        }
                        let Ok(json) = serde_json::to_string(&entry) else { continue };
                        if socket.send(Message::Text(json.into())).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                }
            }
            incoming = socket.recv() => {
                if incoming.is_none() {
                    break;
                }
            }
        }
    }
    state.log_manager.unsubscribe(sub.id);
}
