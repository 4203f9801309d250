//! Durable named alarms.
//!
//! An alarm has a fixed name, an initial delay, and a repeat period; it
//! persists across process restarts and fires at least once per due time.
//! Nothing here cancels alarms; the only duplicate guard is the existence
//! check callers perform before creating one.

mod file_alarms;
mod memory_alarms;

pub use file_alarms::FileAlarms;
pub use memory_alarms::MemoryAlarms;

use async_trait::async_trait;
use thiserror::Error;

/// When an alarm first fires and how often it repeats, in minutes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlarmSchedule {
    pub delay_minutes: u64,
    pub period_minutes: u64,
}

/// A registered alarm as reported by the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alarm {
    pub name: String,
    /// Unix milliseconds of the next (or just-delivered) fire time.
    pub scheduled_at_ms: i64,
    pub period_minutes: u64,
}

/// Errors raised by alarm services.
#[derive(Debug, Error)]
pub enum AlarmError {
    #[error("failed to read alarm registry: {0}")]
    Read(#[source] std::io::Error),

    #[error("failed to write alarm registry: {0}")]
    Write(#[source] std::io::Error),

    #[error("alarm registry holds invalid JSON: {0}")]
    Parse(#[source] serde_json::Error),

    #[error("failed to encode alarm registry: {0}")]
    Encode(#[source] serde_json::Error),
}

/// Named durable alarms: query, register, and await firings.
#[async_trait]
pub trait AlarmService: Send + Sync {
    /// Returns the alarm registered under `name`, if any.
    async fn get(&self, name: &str) -> Result<Option<Alarm>, AlarmError>;

    /// Registers (or replaces) the alarm `name` with `schedule`.
    async fn create(&self, name: &str, schedule: AlarmSchedule) -> Result<(), AlarmError>;

    /// Waits for the next due alarm, delivers it, and advances its
    /// schedule.
    ///
    /// Delivery is at-least-once: a fire time missed while the process was
    /// down comes through immediately on the next call, and the backlog of
    /// further missed periods collapses into that single firing.
    async fn next_fired(&mut self) -> Result<Alarm, AlarmError>;
}
