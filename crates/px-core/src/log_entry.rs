// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Log entry and stream types.

use serde::{Deserialize, Serialize};

/// Which output stream a log line came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stream {
    Stdout,
    Stderr,
}

impl Stream {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Stdout => "stdout",
            Self::Stderr => "stderr",
        }
    }
}

/// A single captured line of process output. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: u64,
    #[serde(rename = "process")]
    pub process_name: String,
    pub stream: Stream,
    pub line: String,
}

impl LogEntry {
    pub fn new(
        timestamp: u64,
        process_name: impl Into<String>,
        stream: Stream,
        line: impl Into<String>,
    ) -> Self {
        Self { timestamp, process_name: process_name.into(), stream, line: line.into() }
    }
}
