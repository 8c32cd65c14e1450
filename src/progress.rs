//! Per-task progress slots shared between the download workers and the
//! render loop.
//!
//! Every slot has exactly one writer (the worker that owns its index), so all
//! updates are plain atomic stores and increments. The render loop only ever
//! reads.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};
use std::sync::OnceLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotStatus {
    Running,
    Completed,
    Failed,
}

impl SlotStatus {
    fn to_u8(self) -> u8 {
        match self {
            SlotStatus::Running => 0,
            SlotStatus::Completed => 1,
            SlotStatus::Failed => 2,
        }
    }

    fn from_u8(v: u8) -> Self {
        match v {
            1 => SlotStatus::Completed,
            2 => SlotStatus::Failed,
            _ => SlotStatus::Running,
        }
    }

    pub fn is_terminal(self) -> bool {
        !matches!(self, SlotStatus::Running)
    }

    pub fn label(self) -> &'static str {
        match self {
            SlotStatus::Running => "Downloading",
            SlotStatus::Completed => "Completed",
            SlotStatus::Failed => "Failed",
        }
    }
}

#[derive(Debug, Default)]
struct Slot {
    bytes_read: AtomicU64,
    total: AtomicU64,
    total_known: AtomicBool,
    display_unit: AtomicU64,
    status: AtomicU8,
    label: OnceLock<String>,
}

/// Point-in-time copy of one slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressState {
    pub index: usize,
    pub bytes_read: u64,
    /// `None` until the worker learns the length, and also when the server
    /// did not send one.
    pub total_bytes: Option<u64>,
    pub display_unit: u64,
    pub status: SlotStatus,
    pub label: Option<String>,
}

impl ProgressState {
    /// Scaled progress value: `bytes_read / display_unit`, never above
    /// `total / display_unit` when the total is known.
    pub fn display(&self) -> u64 {
        let value = self.bytes_read / self.display_unit;
        match self.display_max() {
            Some(max) => value.min(max),
            None => value,
        }
    }

    pub fn display_max(&self) -> Option<u64> {
        self.total_bytes.map(|t| t / self.display_unit)
    }

    /// Exact completion ratio in `0.0..=1.0`, if the total is known and non-zero.
    pub fn fraction(&self) -> Option<f64> {
        match self.total_bytes {
            Some(t) if t > 0 => Some((self.bytes_read as f64 / t as f64).min(1.0)),
            _ => None,
        }
    }
}

/// Fixed-size arena of progress slots addressed by task index.
#[derive(Debug)]
pub struct ProgressTracker {
    slots: Box<[Slot]>,
}

impl ProgressTracker {
    /// Allocates `count` slots, each `Running` with nothing read yet.
    pub fn new(count: usize) -> Self {
        let slots = (0..count)
            .map(|_| Slot {
                display_unit: AtomicU64::new(1),
                ..Slot::default()
            })
            .collect();
        Self { slots }
    }

    /// Fixes the slot's capacity. Must be called before the transfer starts.
    /// A zero `display_unit` is treated as 1.
    pub fn set_total(&self, index: usize, total: Option<u64>, display_unit: u64) {
        let Some(slot) = self.slots.get(index) else {
            return;
        };
        slot.display_unit.store(display_unit.max(1), Ordering::Relaxed);
        if let Some(total) = total {
            slot.total.store(total, Ordering::Relaxed);
            slot.total_known.store(true, Ordering::Release);
        }
    }

    /// Adds `delta` freshly read bytes to the slot.
    pub fn advance(&self, index: usize, delta: u64) {
        if let Some(slot) = self.slots.get(index) {
            slot.bytes_read.fetch_add(delta, Ordering::Relaxed);
        }
    }

    /// Moves the slot into a terminal state. Only the first call has any
    /// effect; terminal states are final.
    pub fn mark_status(&self, index: usize, status: SlotStatus, label: impl Into<String>) {
        let Some(slot) = self.slots.get(index) else {
            return;
        };
        if slot.label.set(label.into()).is_ok() {
            slot.status.store(status.to_u8(), Ordering::Release);
        }
    }

    pub fn bytes_read(&self, index: usize) -> Option<u64> {
        self.slots
            .get(index)
            .map(|s| s.bytes_read.load(Ordering::Relaxed))
    }

    pub fn snapshot(&self, index: usize) -> Option<ProgressState> {
        let slot = self.slots.get(index)?;
        let status = SlotStatus::from_u8(slot.status.load(Ordering::Acquire));
        let total_bytes = slot
            .total_known
            .load(Ordering::Acquire)
            .then(|| slot.total.load(Ordering::Relaxed));
        Some(ProgressState {
            index,
            bytes_read: slot.bytes_read.load(Ordering::Relaxed),
            total_bytes,
            display_unit: slot.display_unit.load(Ordering::Relaxed).max(1),
            status,
            label: slot.label.get().cloned(),
        })
    }

    pub fn snapshot_all(&self) -> Vec<ProgressState> {
        (0..self.slots.len())
            .filter_map(|i| self.snapshot(i))
            .collect()
    }
}
