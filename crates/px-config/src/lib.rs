// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! px-config: hierarchical YAML configuration loading, env-file composition,
//! and validation (SPEC_FULL §4.11). Grounded on `oj-runbook`'s role as the
//! crate that parses a declarative document into typed definitions,
//! generalized from HCL to YAML per SPEC_FULL §6's wire contract. Never
//! depends on `px-supervisor` or `px-proxy` (SPEC_FULL §9 "config as a pure
//! data boundary") — it only produces [`Config`].

mod document;
mod env_file;
mod error;
mod load;

pub use document::{ApiConfig, Config};
pub use env_file::{interpolate, parse_env_file};
pub use error::{ConfigError, Result};
pub use load::load;
