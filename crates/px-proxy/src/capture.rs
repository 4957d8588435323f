// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Proxy body capture (spec §4.9): retains up to `max_body_size` bytes of a
//! request or response body, flagging truncation and binary content,
//! spooling to a per-request temp file when configured instead of keeping
//! the capture inline.

use px_core::{BodyLocation, CapturedBody};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

/// Textual content-type prefixes that are never treated as binary by
/// content-type alone (NUL-byte sniffing still applies on top of this).
const TEXTUAL_PREFIXES: &[&str] = &["text/", "application/json", "application/xml", "application/x-www-form-urlencoded"];

/// NUL-byte probe over the retained prefix (spec §4.9 "is_binary").
pub fn looks_binary(sample: &[u8], content_type: Option<&str>) -> bool {
    if let Some(ct) = content_type {
        if TEXTUAL_PREFIXES.iter().any(|p| ct.starts_with(p)) {
            return sample.contains(&0);
        }
    }
    sample.contains(&0) || content_type.is_some_and(|ct| !ct.starts_with("text/") && !ct.contains("json") && !ct.contains("xml"))
}

/// Spools captured bodies to a working directory, one subdirectory per
/// request id (spec §4.9 "stored under a per-request directory").
pub struct CaptureStore {
    dir: PathBuf,
    max_body_size: usize,
    overflow_to_file: bool,
}

impl CaptureStore {
    pub fn new(dir: impl Into<PathBuf>, max_body_size: usize, overflow_to_file: bool) -> Self {
        Self { dir: dir.into(), max_body_size, overflow_to_file }
    }

    /// Capture `bytes` for `request_id`/`label` (e.g. "request" or
    /// "response"). Only the first `max_body_size` bytes are ever retained;
    /// `truncated` reflects whether the original body was longer.
    pub async fn capture(&self, request_id: &str, label: &str, bytes: &[u8], content_type: Option<String>) -> std::io::Result<CapturedBody> {
        let truncated = bytes.len() > self.max_body_size;
        let retained = if truncated { &bytes[..self.max_body_size] } else { bytes };
        let is_binary = looks_binary(retained, content_type.as_deref());

        let data = if self.overflow_to_file {
            let dir = self.dir.join(request_id);
            tokio::fs::create_dir_all(&dir).await?;
            let path = dir.join(label);
            let mut file = tokio::fs::File::create(&path).await?;
            file.write_all(retained).await?;
            BodyLocation::File(path)
        } else {
            BodyLocation::Inline(retained.to_vec())
        };

        Ok(CapturedBody { size: bytes.len() as u64, truncated, content_type, is_binary, data })
    }

    /// Remove `request_id`'s capture directory, best-effort (spec §4.9 "on
    /// request eviction ... the directory is removed").
    pub async fn cleanup(&self, request_id: &str) {
        let dir = self.dir.join(request_id);
        if let Err(e) = tokio::fs::remove_dir_all(&dir).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(request_id, error = %e, "failed to clean up captured body directory");
            }
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn max_body_size(&self) -> usize {
        self.max_body_size
    }

    /// Persist a [`crate::tee_body::CaptureSink`] snapshot: `retained` is
    /// already capped at `max_body_size` by the tee, so unlike [`capture`]
    /// this never truncates further — it only classifies and spools it.
    pub async fn persist_retained(
        &self,
        request_id: &str,
        label: &str,
        retained: &[u8],
        truncated: bool,
        total_len: u64,
        content_type: Option<String>,
    ) -> std::io::Result<CapturedBody> {
        let is_binary = looks_binary(retained, content_type.as_deref());
        let data = if self.overflow_to_file {
            let dir = self.dir.join(request_id);
            tokio::fs::create_dir_all(&dir).await?;
            let path = dir.join(label);
            let mut file = tokio::fs::File::create(&path).await?;
            file.write_all(retained).await?;
            BodyLocation::File(path)
        } else {
            BodyLocation::Inline(retained.to_vec())
        };
        Ok(CapturedBody { size: total_len, truncated, content_type, is_binary, data })
    }
}
