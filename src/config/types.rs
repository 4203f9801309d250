// Configuration type definitions

use serde::Deserialize;

use crate::alarms::AlarmSchedule;

/// Reference docs section
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DocsConfig {
    /// Base URL the chosen API name is appended to.
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

fn default_base_url() -> String {
    "https://developer.chrome.com/docs/extensions/reference/".to_string()
}

impl Default for DocsConfig {
    fn default() -> Self {
        DocsConfig {
            base_url: default_base_url(),
        }
    }
}

/// Tip feed section
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TipsConfig {
    /// Feed returning a JSON array of candidate tips.
    #[serde(default = "default_feed_url")]
    pub feed_url: String,

    /// Minutes until the first refresh after the alarm is registered.
    #[serde(default = "default_initial_delay_minutes")]
    pub initial_delay_minutes: u64,

    /// Minutes between refreshes; the default is one day.
    #[serde(default = "default_period_minutes")]
    pub period_minutes: u64,
}

impl TipsConfig {
    pub fn schedule(&self) -> AlarmSchedule {
        AlarmSchedule {
            delay_minutes: self.initial_delay_minutes,
            period_minutes: self.period_minutes,
        }
    }
}

fn default_feed_url() -> String {
    "https://extension-tips.glitch.me/tips.json".to_string()
}

fn default_initial_delay_minutes() -> u64 {
    1
}

fn default_period_minutes() -> u64 {
    1440
}

impl Default for TipsConfig {
    fn default() -> Self {
        TipsConfig {
            feed_url: default_feed_url(),
            initial_delay_minutes: default_initial_delay_minutes(),
            period_minutes: default_period_minutes(),
        }
    }
}

/// Root configuration structure
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub docs: DocsConfig,
    #[serde(default)]
    pub tips: TipsConfig,
}
