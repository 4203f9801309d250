use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::{Alarm, AlarmError, AlarmSchedule, AlarmService};

const ALARMS_FILE: &str = "alarms.json";

/// How long to park when the registry has no alarms at all.
const IDLE_POLL: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Serialize, Deserialize)]
struct AlarmRecord {
    next_fire_ms: i64,
    period_minutes: u64,
}

/// File-backed alarm registry.
///
/// Records live in `alarms.json` under the data directory so schedules
/// survive restarts.
#[derive(Debug)]
pub struct FileAlarms {
    path: PathBuf,
}

impl FileAlarms {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            path: data_dir.join(ALARMS_FILE),
        }
    }

    fn load(&self) -> Result<HashMap<String, AlarmRecord>, AlarmError> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(HashMap::new()),
            Err(e) => return Err(AlarmError::Read(e)),
        };
        serde_json::from_str(&contents).map_err(AlarmError::Parse)
    }

    fn persist(&self, registry: &HashMap<String, AlarmRecord>) -> Result<(), AlarmError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(AlarmError::Write)?;
        }
        let contents = serde_json::to_string_pretty(registry).map_err(AlarmError::Encode)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, contents).map_err(AlarmError::Write)?;
        fs::rename(&tmp, &self.path).map_err(AlarmError::Write)
    }
}

fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

fn minutes_to_ms(minutes: u64) -> i64 {
    minutes.saturating_mul(60_000).min(i64::MAX as u64) as i64
}

/// Advances `next_fire_ms` past `now_ms` by whole periods, so a backlog of
/// missed fire times collapses into the one firing just delivered.
fn advance_past(next_fire_ms: i64, period_ms: i64, now_ms: i64) -> i64 {
    if next_fire_ms > now_ms {
        return next_fire_ms;
    }
    let step = period_ms.max(1);
    let missed = (now_ms - next_fire_ms) / step + 1;
    next_fire_ms + missed * step
}

#[async_trait]
impl AlarmService for FileAlarms {
    async fn get(&self, name: &str) -> Result<Option<Alarm>, AlarmError> {
        Ok(self.load()?.get(name).map(|record| Alarm {
            name: name.to_string(),
            scheduled_at_ms: record.next_fire_ms,
            period_minutes: record.period_minutes,
        }))
    }

    async fn create(&self, name: &str, schedule: AlarmSchedule) -> Result<(), AlarmError> {
        let mut registry = self.load()?;
        registry.insert(
            name.to_string(),
            AlarmRecord {
                next_fire_ms: now_ms() + minutes_to_ms(schedule.delay_minutes),
                period_minutes: schedule.period_minutes,
            },
        );
        self.persist(&registry)?;
        log::debug!(
            "alarm {name:?} registered: first fire in {}m, repeating every {}m",
            schedule.delay_minutes,
            schedule.period_minutes
        );
        Ok(())
    }

    async fn next_fired(&mut self) -> Result<Alarm, AlarmError> {
        loop {
            let mut registry = self.load()?;
            let Some((name, record)) = registry
                .iter()
                .min_by_key(|(_, record)| record.next_fire_ms)
                .map(|(name, record)| (name.clone(), record.clone()))
            else {
                tokio::time::sleep(IDLE_POLL).await;
                continue;
            };

            let now = now_ms();
            if record.next_fire_ms > now {
                // Sleep until due, then reload in case the registry changed.
                let wait = Duration::from_millis((record.next_fire_ms - now) as u64);
                tokio::time::sleep(wait).await;
                continue;
            }

            let fired = Alarm {
                name: name.clone(),
                scheduled_at_ms: record.next_fire_ms,
                period_minutes: record.period_minutes,
            };
            registry.insert(
                name,
                AlarmRecord {
                    next_fire_ms: advance_past(
                        record.next_fire_ms,
                        minutes_to_ms(record.period_minutes),
                        now,
                    ),
                    period_minutes: record.period_minutes,
                },
            );
            self.persist(&registry)?;
            return Ok(fired);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const WAIT: Duration = Duration::from_secs(5);

    #[test]
    fn test_advance_past_steps_one_period_beyond_now() {
        assert_eq!(advance_past(1_000, 500, 1_000), 1_500);
        assert_eq!(advance_past(1_000, 500, 1_200), 1_500);
    }

    #[test]
    fn test_advance_past_collapses_a_backlog_of_missed_periods() {
        // Three whole periods missed: lands on the first future fire time.
        let next = advance_past(0, 1_000, 3_400);
        assert_eq!(next, 4_000);
    }

    #[test]
    fn test_advance_past_leaves_future_times_alone() {
        assert_eq!(advance_past(9_000, 1_000, 5_000), 9_000);
    }

    #[test]
    fn test_advance_past_tolerates_a_zero_period() {
        assert!(advance_past(1_000, 0, 1_000) > 1_000);
    }

    #[tokio::test]
    async fn test_create_then_get_reports_the_schedule() {
        let dir = TempDir::new().unwrap();
        let alarms = FileAlarms::new(dir.path());

        alarms
            .create(
                "tip",
                AlarmSchedule {
                    delay_minutes: 2,
                    period_minutes: 1440,
                },
            )
            .await
            .unwrap();

        let alarm = alarms.get("tip").await.unwrap().unwrap();
        assert_eq!(alarm.name, "tip");
        assert_eq!(alarm.period_minutes, 1440);
        assert!(alarm.scheduled_at_ms > now_ms());
    }

    #[tokio::test]
    async fn test_get_unknown_name_returns_none() {
        let dir = TempDir::new().unwrap();
        let alarms = FileAlarms::new(dir.path());

        assert_eq!(alarms.get("tip").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_alarms_survive_a_new_registry_instance() {
        let dir = TempDir::new().unwrap();
        FileAlarms::new(dir.path())
            .create(
                "tip",
                AlarmSchedule {
                    delay_minutes: 1,
                    period_minutes: 1440,
                },
            )
            .await
            .unwrap();

        let reopened = FileAlarms::new(dir.path());
        assert!(reopened.get("tip").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_due_alarm_fires_immediately_and_advances() {
        let dir = TempDir::new().unwrap();
        let mut alarms = FileAlarms::new(dir.path());
        alarms
            .create(
                "tip",
                AlarmSchedule {
                    delay_minutes: 0,
                    period_minutes: 1,
                },
            )
            .await
            .unwrap();

        let fired = tokio::time::timeout(WAIT, alarms.next_fired())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(fired.name, "tip");
        assert!(fired.scheduled_at_ms <= now_ms());

        let rescheduled = alarms.get("tip").await.unwrap().unwrap();
        assert!(rescheduled.scheduled_at_ms > now_ms());
        assert_eq!(
            (rescheduled.scheduled_at_ms - fired.scheduled_at_ms) % 60_000,
            0
        );
    }

    #[tokio::test]
    async fn test_fire_time_missed_while_down_is_delivered_once() {
        let dir = TempDir::new().unwrap();
        // A registry written by an earlier run whose fire time passed three
        // periods ago.
        let now = now_ms();
        let period_minutes = 1u64;
        let stale = now - 3 * 60_000;
        std::fs::write(
            dir.path().join(ALARMS_FILE),
            format!(
                r#"{{"tip": {{"next_fire_ms": {stale}, "period_minutes": {period_minutes}}}}}"#
            ),
        )
        .unwrap();

        let mut alarms = FileAlarms::new(dir.path());
        let fired = tokio::time::timeout(WAIT, alarms.next_fired())
            .await
            .unwrap()
            .unwrap();

        // Delivered with the fire time it was owed, not a fresh one.
        assert_eq!(fired.scheduled_at_ms, stale);

        // The backlog collapses: the next fire time is in the future, a
        // whole number of periods after the missed one.
        let rescheduled = alarms.get("tip").await.unwrap().unwrap();
        assert!(rescheduled.scheduled_at_ms > now_ms());
        assert_eq!((rescheduled.scheduled_at_ms - stale) % 60_000, 0);
    }

    #[tokio::test]
    async fn test_earliest_due_alarm_wins() {
        let dir = TempDir::new().unwrap();
        let mut alarms = FileAlarms::new(dir.path());
        alarms
            .create(
                "later",
                AlarmSchedule {
                    delay_minutes: 10_000,
                    period_minutes: 1,
                },
            )
            .await
            .unwrap();
        alarms
            .create(
                "due",
                AlarmSchedule {
                    delay_minutes: 0,
                    period_minutes: 1,
                },
            )
            .await
            .unwrap();

        let fired = tokio::time::timeout(WAIT, alarms.next_fired())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(fired.name, "due");
    }
}
