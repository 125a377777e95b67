// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Leveled, append-only event log with on-disk JSON-Lines persistence and
//! single-backup rotation (§3 EventEntry, §6).
//!
//! This is a separate, operator-facing channel from `tracing` (§10.2):
//! it is read back by external UIs and therefore keeps its own bounded
//! ring plus an on-disk sink, independent of whatever `tracing` subscriber
//! is installed.

use std::collections::{HashSet, VecDeque};
use std::fs::OpenOptions;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// Severity of an [`EventEntry`] (§3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Level {
    Info,
    Warning,
    Error,
    Critical,
    Debug,
}

impl Level {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "INFO",
            Self::Warning => "WARNING",
            Self::Error => "ERROR",
            Self::Critical => "CRITICAL",
            Self::Debug => "DEBUG",
        }
    }
}

/// One entry in the bounded in-memory ring and, if a sink is configured,
/// one line on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEntry {
    pub timestamp: f64,
    pub level: Level,
    pub message: String,
}

/// On-disk line shape (§6): adds a human-readable `formatted_time`.
#[derive(Debug, Serialize, Deserialize)]
struct DiskLine {
    timestamp: f64,
    level: Level,
    message: String,
    formatted_time: String,
}

fn formatted_time(epoch_seconds: f64) -> String {
    let millis = (epoch_seconds * 1000.0).round() as i64;
    match chrono::DateTime::from_timestamp_millis(millis) {
        Some(dt) => dt.format("%H:%M:%S%.3f").to_string(),
        None => String::from("00:00:00.000"),
    }
}

struct Inner {
    ring: VecDeque<EventEntry>,
    logged_once: HashSet<String>,
    lines_since_rotate: usize,
}

/// Leveled event log: bounded ring plus an optional rotating JSONL sink.
pub struct EventLog {
    max_entries: usize,
    path: Option<PathBuf>,
    inner: Mutex<Inner>,
}

impl EventLog {
    /// `path` is `None` for tests/attach-only modes: the ring still
    /// works, nothing is written to disk.
    pub fn new(path: Option<PathBuf>, max_entries: usize) -> Self {
        let log = Self {
            max_entries: max_entries.max(1),
            path,
            inner: Mutex::new(Inner {
                ring: VecDeque::with_capacity(max_entries.min(4096)),
                logged_once: HashSet::new(),
                lines_since_rotate: 0,
            }),
        };
        log.load_existing();
        log
    }

    fn old_path(&self) -> Option<PathBuf> {
        self.path.as_ref().map(|p| {
            let mut s = p.as_os_str().to_owned();
            s.push(".old");
            PathBuf::from(s)
        })
    }

    /// At startup, `.old` is loaded before the current file so the ring
    /// reflects chronological order (§6).
    fn load_existing(&self) {
        let Some(path) = self.path.clone() else {
            return;
        };
        let old = self.old_path();
        let mut inner = self.inner.lock();
        if let Some(old) = old {
            Self::load_file_into(&old, &mut inner.ring, self.max_entries);
        }
        Self::load_file_into(&path, &mut inner.ring, self.max_entries);
    }

    fn load_file_into(path: &Path, ring: &mut VecDeque<EventEntry>, max_entries: usize) {
        let Ok(file) = std::fs::File::open(path) else {
            return;
        };
        for line in std::io::BufReader::new(file).lines().map_while(Result::ok) {
            let Ok(parsed) = serde_json::from_str::<DiskLine>(&line) else {
                continue;
            };
            if ring.len() >= max_entries {
                ring.pop_front();
            }
            ring.push_back(EventEntry {
                timestamp: parsed.timestamp,
                level: parsed.level,
                message: parsed.message,
            });
        }
    }

    fn push(&self, level: Level, message: String, now: f64) {
        let entry = EventEntry { timestamp: now, level, message: message.clone() };
        let mut inner = self.inner.lock();
        if inner.ring.len() >= self.max_entries {
            inner.ring.pop_front();
        }
        inner.ring.push_back(entry);
        inner.lines_since_rotate += 1;
        drop(inner);

        if let Some(path) = &self.path {
            let line = DiskLine {
                timestamp: now,
                level,
                message,
                formatted_time: formatted_time(now),
            };
            if let Ok(mut text) = serde_json::to_string(&line) {
                text.push('\n');
                if let Ok(mut file) = OpenOptions::new().create(true).append(true).open(path) {
                    let _ = file.write_all(text.as_bytes());
                }
            }
        }
    }

    pub fn info(&self, message: impl Into<String>, now: f64) {
        self.push(Level::Info, message.into(), now);
    }

    pub fn warn(&self, message: impl Into<String>, now: f64) {
        self.push(Level::Warning, message.into(), now);
    }

    pub fn error(&self, message: impl Into<String>, now: f64) {
        self.push(Level::Error, message.into(), now);
    }

    pub fn critical(&self, message: impl Into<String>, now: f64) {
        self.push(Level::Critical, message.into(), now);
    }

    pub fn debug(&self, message: impl Into<String>, now: f64) {
        self.push(Level::Debug, message.into(), now);
    }

    fn once(&self, key: &str, level: Level, message: String, now: f64) {
        let mut inner = self.inner.lock();
        if !inner.logged_once.insert(key.to_owned()) {
            return;
        }
        drop(inner);
        self.push(level, message, now);
    }

    /// Log at WARNING only the first time `key` is seen, preventing a
    /// steady-state condition (e.g. "comms unhealthy") from spamming the
    /// log every scan (§10.6, grounded on `logging_system.py`'s
    /// `_logged_once`).
    pub fn warn_once(&self, key: &str, message: impl Into<String>, now: f64) {
        self.once(key, Level::Warning, message.into(), now);
    }

    pub fn error_once(&self, key: &str, message: impl Into<String>, now: f64) {
        self.once(key, Level::Error, message.into(), now);
    }

    pub fn info_once(&self, key: &str, message: impl Into<String>, now: f64) {
        self.once(key, Level::Info, message.into(), now);
    }

    /// Clear the log-once dedup set, e.g. on a mode transition so the
    /// next occurrence of a condition logs again.
    pub fn reset_once(&self, key: &str) {
        self.inner.lock().logged_once.remove(key);
    }

    pub fn recent(&self, n: usize) -> Vec<EventEntry> {
        let inner = self.inner.lock();
        let skip = inner.ring.len().saturating_sub(n);
        inner.ring.iter().skip(skip).cloned().collect()
    }

    /// Rotate the on-disk file once it has grown past `max_entries`
    /// lines, keeping exactly one `.old` backup (§6). Called periodically
    /// by the polling thread (§4.6 step 5).
    pub fn rotate_if_needed(&self) {
        let Some(path) = &self.path else {
            return;
        };
        let mut inner = self.inner.lock();
        if inner.lines_since_rotate < self.max_entries {
            return;
        }
        inner.lines_since_rotate = 0;
        drop(inner);
        if let Some(old) = self.old_path() {
            let _ = std::fs::rename(path, &old);
        }
    }
}

#[cfg(test)]
#[path = "event_log_tests.rs"]
mod tests;
