// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Command-line surface for `proxd` (SPEC_FULL §4.13), in the teacher's
//! `clap` derive style (`oj`'s `DaemonArgs`/`DaemonCommand`).

use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "proxd", version, about = "Foreground multi-process supervisor and reverse proxy")]
pub struct Cli {
    /// Path to the YAML config document (spec §6).
    #[arg(short, long, default_value = "prox.yaml")]
    pub config: PathBuf,

    /// Override the `tracing` filter directive (falls back to `RUST_LOG`,
    /// then `info`).
    #[arg(long)]
    pub log_level: Option<String>,
}
