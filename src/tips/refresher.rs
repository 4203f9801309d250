use std::sync::Arc;

use rand::Rng;

use crate::alarms::{Alarm, AlarmSchedule, AlarmService};
use crate::store::KvStore;

use super::source::{TipError, TipSource};

/// Store key holding the current tip.
pub const TIP_KEY: &str = "tip";

/// Name of the recurring refresh alarm.
pub const TIP_ALARM: &str = "tip";

/// What startup decided to do about the refresh alarm.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bootstrap {
    /// No alarm exists yet: register the schedule and refresh immediately,
    /// so a tip is available before the first firing comes due.
    ScheduleAndRefresh(AlarmSchedule),
    /// The alarm survived from an earlier run: leave it alone and wait for
    /// the next firing.
    Keep,
}

/// Decides the startup action from the queried alarm state.
pub fn bootstrap(existing: Option<&Alarm>, schedule: AlarmSchedule) -> Bootstrap {
    match existing {
        Some(_) => Bootstrap::Keep,
        None => Bootstrap::ScheduleAndRefresh(schedule),
    }
}

/// Keeps one current tip available in the store.
pub struct TipRefresher<S, T> {
    store: Arc<S>,
    source: T,
    schedule: AlarmSchedule,
}

impl<S: KvStore, T: TipSource> TipRefresher<S, T> {
    pub fn new(store: Arc<S>, source: T, schedule: AlarmSchedule) -> Self {
        Self {
            store,
            source,
            schedule,
        }
    }

    /// Runs the startup state machine against `alarms`.
    ///
    /// Returns whether the alarm had to be registered. A failure of the
    /// immediate refresh is logged, not propagated: the worker still has to
    /// reach its steady state and retry on the next firing.
    pub async fn ensure_scheduled<A: AlarmService>(&self, alarms: &A) -> Result<bool, TipError> {
        match bootstrap(alarms.get(TIP_ALARM).await?.as_ref(), self.schedule) {
            Bootstrap::ScheduleAndRefresh(schedule) => {
                alarms.create(TIP_ALARM, schedule).await?;
                log::info!(
                    "registered refresh alarm: first fire in {}m, repeating every {}m",
                    schedule.delay_minutes,
                    schedule.period_minutes
                );
                if let Err(e) = self.refresh().await {
                    log::error!("initial tip refresh failed: {e}");
                }
                Ok(true)
            }
            Bootstrap::Keep => {
                log::debug!("refresh alarm already registered");
                Ok(false)
            }
        }
    }

    /// Fetches the candidate list, picks one uniformly at random, and
    /// replaces the stored tip.
    ///
    /// Any failure leaves the previous tip in place; the caller decides
    /// whether to log or propagate.
    pub async fn refresh(&self) -> Result<(), TipError> {
        let tips = self.source.fetch_tips().await?;
        if tips.is_empty() {
            return Err(TipError::EmptyFeed);
        }
        let index = rand::rng().random_range(0..tips.len());
        let tip = tips[index].clone();
        self.store.set(TIP_KEY, tip).await?;
        log::info!("stored tip {} of {}", index + 1, tips.len());
        Ok(())
    }
}
