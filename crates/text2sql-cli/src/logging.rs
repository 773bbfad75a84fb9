// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow};
use std::fs::OpenOptions;
use std::io;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "TEXT2SQL_LOG";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogTarget {
    Off,
    Stderr,
    File(PathBuf),
}

/// The terminal UI owns stdout/stderr, so it only ever logs to a file.
pub fn target_for(log_file: Option<PathBuf>, interactive: bool) -> LogTarget {
    match log_file {
        Some(path) => LogTarget::File(path),
        None if interactive => LogTarget::Off,
        None => LogTarget::Stderr,
    }
}

pub fn default_level(target: &LogTarget) -> &'static str {
    match target {
        LogTarget::File(_) => "info",
        LogTarget::Stderr | LogTarget::Off => "warn",
    }
}

fn filter(level: &str) -> Result<EnvFilter> {
    match EnvFilter::try_from_env(LOG_ENV) {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(level).with_context(|| format!("invalid log filter {level:?}")),
    }
}

pub fn init(target: &LogTarget, level: &str) -> Result<()> {
    match target {
        LogTarget::Off => Ok(()),
        LogTarget::Stderr => tracing_subscriber::fmt()
            .with_env_filter(filter(level)?)
            .with_writer(io::stderr)
            .try_init()
            .map_err(|error| anyhow!("install logger: {error}")),
        LogTarget::File(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("open log file {}", path.display()))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter(level)?)
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .try_init()
                .map_err(|error| anyhow!("install logger: {error}"))
        }
    }
}
