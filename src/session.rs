//! Session Tracker (`spec.md` §4.8): a bounded FIFO of recent workspace
//! events feeding the search boost. Explicit value passed into the search
//! entry point — no process-wide singleton (`spec.md` §9 design note).

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::time::{Instant, SystemTime, UNIX_EPOCH};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionEventKind {
    OpenedFile,
    EditedFile,
    Searched,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionEvent {
    pub sequence: u64,
    pub kind: SessionEventKind,
    /// File path for `opened_file`/`edited_file`; the raw query text for
    /// `searched` (boost lookups never consult this field).
    pub subject: String,
    pub timestamp_unix: i64,
}

/// On-disk form of the ring buffer, persisted at `.flyto-index/session.json`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub events: Vec<SessionEvent>,
    pub next_sequence: u64,
}

struct Inner {
    buffer: VecDeque<SessionEvent>,
    capacity: usize,
    next_sequence: u64,
    last_flush: Option<Instant>,
}

/// Thread-safe, append-only ring buffer of the last `capacity` events.
/// Append-only means a cancelled query can never corrupt it
/// (`spec.md` §4.8).
pub struct SessionTracker {
    inner: Mutex<Inner>,
}

impl SessionTracker {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(Inner {
                buffer: VecDeque::with_capacity(capacity),
                capacity,
                next_sequence: 0,
                last_flush: None,
            }),
        }
    }

    pub fn from_snapshot(capacity: usize, snapshot: SessionSnapshot) -> Self {
        let mut buffer: VecDeque<SessionEvent> = snapshot.events.into();
        while buffer.len() > capacity {
            buffer.pop_front();
        }
        Self {
            inner: Mutex::new(Inner {
                buffer,
                capacity,
                next_sequence: snapshot.next_sequence,
                last_flush: None,
            }),
        }
    }

    pub fn record(&self, kind: SessionEventKind, subject: impl Into<String>) {
        let mut inner = self.inner.lock();
        let sequence = inner.next_sequence;
        inner.next_sequence += 1;
        let capacity = inner.capacity;
        inner.buffer.push_back(SessionEvent {
            sequence,
            kind,
            subject: subject.into(),
            timestamp_unix: unix_now(),
        });
        while inner.buffer.len() > capacity {
            inner.buffer.pop_front();
        }
    }

    pub fn record_opened(&self, path: impl Into<String>) {
        self.record(SessionEventKind::OpenedFile, path);
    }

    pub fn record_edited(&self, path: impl Into<String>) {
        self.record(SessionEventKind::EditedFile, path);
    }

    pub fn record_searched(&self, query: impl Into<String>) {
        self.record(SessionEventKind::Searched, query);
    }

    /// Linear recency weight for `path`: `0.0` if absent from the buffer,
    /// otherwise highest for the most recent event and decaying linearly
    /// toward the oldest (`spec.md` §4.6).
    pub fn recency_weight(&self, path: &str) -> f32 {
        let inner = self.inner.lock();
        let len = inner.buffer.len();
        if len == 0 {
            return 0.0;
        }
        inner
            .buffer
            .iter()
            .enumerate()
            .filter(|(_, e)| e.kind != SessionEventKind::Searched && e.subject == path)
            .map(|(position, _)| (position + 1) as f32 / len as f32)
            .fold(0.0_f32, f32::max)
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let inner = self.inner.lock();
        SessionSnapshot { events: inner.buffer.iter().cloned().collect(), next_sequence: inner.next_sequence }
    }

    /// `true` if at least a second has elapsed since the last flush (or it
    /// has never flushed), per the at-most-once-per-second policy.
    pub fn should_flush(&self) -> bool {
        let inner = self.inner.lock();
        inner.last_flush.is_none_or(|t| t.elapsed().as_secs() >= 1)
    }

    pub fn flush(&self, path: &Path) -> std::io::Result<()> {
        let snapshot = self.snapshot();
        let json = serde_json::to_vec_pretty(&snapshot).map_err(std::io::Error::other)?;
        write_atomic(path, &json)?;
        self.inner.lock().last_flush = Some(Instant::now());
        Ok(())
    }

    pub fn load(path: &Path, capacity: usize) -> Self {
        match std::fs::read(path) {
            Ok(bytes) => match serde_json::from_slice::<SessionSnapshot>(&bytes) {
                Ok(snapshot) => Self::from_snapshot(capacity, snapshot),
                Err(_) => Self::new(capacity),
            },
            Err(_) => Self::new(capacity),
        }
    }
}

fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let tmp: PathBuf = path.with_extension("tmp");
    std::fs::write(&tmp, bytes)?;
    std::fs::rename(&tmp, path)
}

fn unix_now() -> i64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs() as i64).unwrap_or(0)
}
