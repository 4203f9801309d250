use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{Mutex, mpsc};

use super::{Alarm, AlarmError, AlarmSchedule, AlarmService};

/// In-memory alarm service, made public for integration tests.
///
/// Schedules are recorded but never slept on; a firing happens only when a
/// test calls [`MemoryAlarms::fire`]. Clones share state, so a test can
/// keep one handle while the worker under test owns another.
#[derive(Debug, Clone)]
pub struct MemoryAlarms {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    registered: Mutex<HashMap<String, Registered>>,
    creates: AtomicUsize,
    fire_tx: mpsc::UnboundedSender<Alarm>,
    fire_rx: Mutex<mpsc::UnboundedReceiver<Alarm>>,
}

#[derive(Debug, Clone)]
struct Registered {
    alarm: Alarm,
    schedule: AlarmSchedule,
}

impl MemoryAlarms {
    pub fn new() -> Self {
        let (fire_tx, fire_rx) = mpsc::unbounded_channel();
        Self {
            inner: Arc::new(Inner {
                registered: Mutex::new(HashMap::new()),
                creates: AtomicUsize::new(0),
                fire_tx,
                fire_rx: Mutex::new(fire_rx),
            }),
        }
    }

    /// Registers an alarm as if a previous run had created it. Does not
    /// count toward [`MemoryAlarms::create_count`].
    pub async fn preload(&self, name: &str, schedule: AlarmSchedule) {
        self.inner
            .registered
            .lock()
            .await
            .insert(name.to_string(), register(name, schedule));
    }

    /// Number of `create` calls observed so far.
    pub fn create_count(&self) -> usize {
        self.inner.creates.load(Ordering::SeqCst)
    }

    /// The schedule `name` was registered with, if any.
    pub async fn schedule_of(&self, name: &str) -> Option<AlarmSchedule> {
        self.inner
            .registered
            .lock()
            .await
            .get(name)
            .map(|registered| registered.schedule)
    }

    /// Delivers a firing of `name` to whoever awaits `next_fired`. The name
    /// does not have to be registered; stray firings are part of what the
    /// worker has to cope with.
    pub async fn fire(&self, name: &str) {
        let alarm = match self.inner.registered.lock().await.get(name) {
            Some(registered) => registered.alarm.clone(),
            None => {
                register(
                    name,
                    AlarmSchedule {
                        delay_minutes: 0,
                        period_minutes: 0,
                    },
                )
                .alarm
            }
        };
        let _ = self.inner.fire_tx.send(alarm);
    }
}

impl Default for MemoryAlarms {
    fn default() -> Self {
        Self::new()
    }
}

fn register(name: &str, schedule: AlarmSchedule) -> Registered {
    Registered {
        alarm: Alarm {
            name: name.to_string(),
            scheduled_at_ms: Utc::now().timestamp_millis()
                + schedule.delay_minutes.saturating_mul(60_000) as i64,
            period_minutes: schedule.period_minutes,
        },
        schedule,
    }
}

#[async_trait]
impl AlarmService for MemoryAlarms {
    async fn get(&self, name: &str) -> Result<Option<Alarm>, AlarmError> {
        Ok(self
            .inner
            .registered
            .lock()
            .await
            .get(name)
            .map(|registered| registered.alarm.clone()))
    }

    async fn create(&self, name: &str, schedule: AlarmSchedule) -> Result<(), AlarmError> {
        self.inner
            .registered
            .lock()
            .await
            .insert(name.to_string(), register(name, schedule));
        self.inner.creates.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn next_fired(&mut self) -> Result<Alarm, AlarmError> {
        let mut rx = self.inner.fire_rx.lock().await;
        let alarm = rx
            .recv()
            .await
            .expect("a sender lives inside self, so the channel cannot close");
        Ok(alarm)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fire_delivers_the_registered_schedule() {
        let mut alarms = MemoryAlarms::new();
        alarms
            .create(
                "tip",
                AlarmSchedule {
                    delay_minutes: 1,
                    period_minutes: 1440,
                },
            )
            .await
            .unwrap();
        assert_eq!(alarms.create_count(), 1);

        alarms.fire("tip").await;

        let fired = alarms.next_fired().await.unwrap();
        assert_eq!(fired.name, "tip");
        assert_eq!(fired.period_minutes, 1440);
    }

    #[tokio::test]
    async fn test_preload_registers_without_counting_a_create() {
        let alarms = MemoryAlarms::new();
        let schedule = AlarmSchedule {
            delay_minutes: 1,
            period_minutes: 1440,
        };
        alarms.preload("tip", schedule).await;

        assert!(alarms.get("tip").await.unwrap().is_some());
        assert_eq!(alarms.schedule_of("tip").await, Some(schedule));
        assert_eq!(alarms.create_count(), 0);
    }
}
