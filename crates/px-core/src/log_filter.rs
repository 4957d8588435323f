// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Log query/subscription filters.

use crate::error::{Error, Result};
use crate::log_entry::LogEntry;
use regex::Regex;
use std::collections::HashSet;

/// Maximum byte length for a filter pattern (spec §3).
pub const MAX_PATTERN_LEN: usize = 256;

/// A filter over the log stream: matches entries whose process is in
/// `process_names` (or any process, if empty) AND whose line matches
/// `pattern` (or any line, if empty).
#[derive(Debug, Clone, Default)]
pub struct LogFilter {
    process_names: HashSet<String>,
    pattern: String,
    is_regex: bool,
    compiled: Option<Regex>,
}

impl LogFilter {
    /// Build a filter, compiling the regex (if any) up front so that an
    /// invalid pattern is rejected before it is ever used to match.
    pub fn new(process_names: HashSet<String>, pattern: String, is_regex: bool) -> Result<Self> {
        if pattern.len() > MAX_PATTERN_LEN {
            return Err(Error::InvalidPattern(format!(
                "pattern exceeds {MAX_PATTERN_LEN} bytes"
            )));
        }
        let compiled = if is_regex && !pattern.is_empty() {
            Some(Regex::new(&pattern).map_err(|e| Error::InvalidPattern(e.to_string()))?)
        } else {
            None
        };
        Ok(Self { process_names, pattern, is_regex, compiled })
    }

    /// The filter that matches everything.
    pub fn any() -> Self {
        Self { process_names: HashSet::new(), pattern: String::new(), is_regex: false, compiled: None }
    }

    pub fn matches(&self, entry: &LogEntry) -> bool {
        if !self.process_names.is_empty() && !self.process_names.contains(&entry.process_name) {
            return false;
        }
        if self.pattern.is_empty() {
            return true;
        }
        match &self.compiled {
            Some(re) => re.is_match(&entry.line),
            None => entry.line.contains(&self.pattern),
        }
    }
}
