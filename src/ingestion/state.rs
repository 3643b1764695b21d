//! Observable pipeline state and counters

use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Pipeline stage. Cycles `Fetching -> ... -> Acknowledging -> Fetching` until
/// the loop ends in `Stopped`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    Idle,
    Fetching,
    Decoding,
    Validating,
    Persisting,
    Acknowledging,
    Stopped,
}

impl PipelineState {
    pub fn is_stopped(&self) -> bool {
        matches!(self, Self::Stopped)
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Fetching => "fetching",
            Self::Decoding => "decoding",
            Self::Validating => "validating",
            Self::Persisting => "persisting",
            Self::Acknowledging => "acknowledging",
            Self::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// Running totals, updated by the pipeline task and readable from anywhere
#[derive(Debug, Default)]
pub struct PipelineStats {
    messages_fetched: AtomicU64,
    messages_committed: AtomicU64,
    messages_dead_lettered: AtomicU64,
    decode_failures: AtomicU64,
    persist_failures: AtomicU64,
    orders_persisted: AtomicU64,
    orders_rejected: AtomicU64,
}

/// Point-in-time copy of [`PipelineStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PipelineStatsSnapshot {
    pub messages_fetched: u64,
    pub messages_committed: u64,
    pub messages_dead_lettered: u64,
    pub decode_failures: u64,
    pub persist_failures: u64,
    pub orders_persisted: u64,
    pub orders_rejected: u64,
}

impl PipelineStats {
    pub(crate) fn record_fetched(&self) {
        self.messages_fetched.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_committed(&self, orders: usize) {
        self.messages_committed.fetch_add(1, Ordering::Relaxed);
        self.orders_persisted
            .fetch_add(orders as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_dead_lettered(&self) {
        self.messages_dead_lettered.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_decode_failure(&self) {
        self.decode_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_persist_failure(&self) {
        self.persist_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_rejected(&self, orders: usize) {
        self.orders_rejected
            .fetch_add(orders as u64, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> PipelineStatsSnapshot {
        PipelineStatsSnapshot {
            messages_fetched: self.messages_fetched.load(Ordering::Relaxed),
            messages_committed: self.messages_committed.load(Ordering::Relaxed),
            messages_dead_lettered: self.messages_dead_lettered.load(Ordering::Relaxed),
            decode_failures: self.decode_failures.load(Ordering::Relaxed),
            persist_failures: self.persist_failures.load(Ordering::Relaxed),
            orders_persisted: self.orders_persisted.load(Ordering::Relaxed),
            orders_rejected: self.orders_rejected.load(Ordering::Relaxed),
        }
    }
}
