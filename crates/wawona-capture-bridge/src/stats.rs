use std::sync::atomic::{AtomicU64, Ordering};

use crate::buffer::BufferTracker;

/// Counters shared between the bridge and whoever drives it.
#[derive(Debug, Default)]
pub struct BridgeStats {
    polls:      AtomicU64,
    completed:  AtomicU64,
    failed:     AtomicU64,
    duplicates: AtomicU64,
    buffers:    BufferTracker,
}

/// Point-in-time copy of [`BridgeStats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatsSnapshot {
    pub polls:             u64,
    pub completed:         u64,
    pub failed:            u64,
    pub duplicates:        u64,
    pub live_buffers:      usize,
    pub buffers_allocated: u64,
}

impl BridgeStats {
    pub fn buffers(&self) -> &BufferTracker {
        &self.buffers
    }

    pub fn live_buffers(&self) -> usize {
        self.buffers.live()
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            polls:             self.polls.load(Ordering::Relaxed),
            completed:         self.completed.load(Ordering::Relaxed),
            failed:            self.failed.load(Ordering::Relaxed),
            duplicates:        self.duplicates.load(Ordering::Relaxed),
            live_buffers:      self.buffers.live(),
            buffers_allocated: self.buffers.allocated(),
        }
    }

    pub(crate) fn record_poll(&self) {
        self.polls.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_completed(&self) {
        self.completed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_duplicate(&self) {
        self.duplicates.fetch_add(1, Ordering::Relaxed);
    }
}

impl std::fmt::Display for StatsSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "polls={} completed={} failed={} duplicates={} live_buffers={}",
            self.polls, self.completed, self.failed, self.duplicates, self.live_buffers
        )
    }
}
