// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `/api/processes` handlers (SPEC_FULL §4.12).

use crate::error::ApiError;
use crate::state::AppState;
use axum::extract::{Path, State};
use axum::Json;
use px_core::{Clock, ProcessInfo};

pub async fn list_processes<C: Clock>(State(state): State<AppState<C>>) -> Json<Vec<ProcessInfo>> {
    Json(state.supervisor.processes())
}

pub async fn get_process<C: Clock>(State(state): State<AppState<C>>, Path(name): Path<String>) -> Result<Json<ProcessInfo>, ApiError> {
    Ok(Json(state.supervisor.info(&name)?))
}

pub async fn start_process<C: Clock>(State(state): State<AppState<C>>, Path(name): Path<String>) -> Result<Json<ProcessInfo>, ApiError> {
    state.supervisor.start_process(&name).await?;
    Ok(Json(state.supervisor.info(&name)?))
}

pub async fn stop_process<C: Clock>(State(state): State<AppState<C>>, Path(name): Path<String>) -> Result<Json<ProcessInfo>, ApiError> {
    state.supervisor.stop_process(&name, state.control_deadline).await?;
    Ok(Json(state.supervisor.info(&name)?))
}

pub async fn restart_process<C: Clock>(State(state): State<AppState<C>>, Path(name): Path<String>) -> Result<Json<ProcessInfo>, ApiError> {
    state.supervisor.restart_process(&name, state.control_deadline).await?;
    Ok(Json(state.supervisor.info(&name)?))
}
