// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Proxy request/response records (spec §3 RequestRecord, CapturedBody).

use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::path::PathBuf;

/// A captured request body (or response body), possibly truncated or
/// spooled to a temp file once it exceeds the capture cap.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapturedBody {
    pub size: u64,
    pub truncated: bool,
    pub content_type: Option<String>,
    pub is_binary: bool,
    pub data: BodyLocation,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BodyLocation {
    Inline(Vec<u8>),
    File(PathBuf),
}

/// Header and body detail captured for a request, when capture is enabled.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RequestDetails {
    pub request_headers: Vec<(String, String)>,
    pub response_headers: Vec<(String, String)>,
    pub request_body: Option<CapturedBody>,
    pub response_body: Option<CapturedBody>,
}

/// One proxied request (spec §3 RequestRecord). `id` uniqueness is not
/// required — it is derived from start time, method, and URL, and collisions
/// within the retention window are vanishingly unlikely.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestRecord {
    pub id: String,
    pub timestamp: u64,
    pub method: String,
    pub url: String,
    pub subdomain: String,
    pub status_code: u16,
    pub duration_ms: u64,
    pub remote_addr: String,
    pub details: Option<RequestDetails>,
}

impl RequestRecord {
    /// Derive a request id from its start time, method, and URL.
    pub fn derive_id(start_time_nanos: u64, method: &str, url: &str) -> String {
        let mut hasher = DefaultHasher::new();
        start_time_nanos.hash(&mut hasher);
        method.hash(&mut hasher);
        url.hash(&mut hasher);
        format!("{:016x}", hasher.finish())
    }
}
