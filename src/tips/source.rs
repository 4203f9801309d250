use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::alarms::AlarmError;
use crate::store::StoreError;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors raised while refreshing the stored tip.
#[derive(Debug, Error)]
pub enum TipError {
    #[error("tip feed request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("tip feed returned HTTP {0}")]
    Status(u16),

    #[error("tip feed was not a JSON array: {0}")]
    Parse(#[source] serde_json::Error),

    #[error("tip feed is empty")]
    EmptyFeed,

    #[error("could not store the fetched tip: {0}")]
    Store(#[from] StoreError),

    #[error("refresh alarm bookkeeping failed: {0}")]
    Alarm(#[from] AlarmError),
}

/// Source of candidate tips. The caller picks one.
#[async_trait]
pub trait TipSource: Send + Sync {
    async fn fetch_tips(&self) -> Result<Vec<Value>, TipError>;
}

/// Fetches the candidate list from an HTTP JSON feed.
#[derive(Debug, Clone)]
pub struct HttpTipSource {
    client: reqwest::Client,
    url: String,
}

impl HttpTipSource {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
        }
    }
}

#[async_trait]
impl TipSource for HttpTipSource {
    async fn fetch_tips(&self) -> Result<Vec<Value>, TipError> {
        log::debug!("fetching tips from {}", self.url);
        let response = self
            .client
            .get(&self.url)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(TipError::Status(status.as_u16()));
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(TipError::Parse)
    }
}

/// Fixed in-memory source, made public for integration tests.
#[derive(Debug, Clone, Default)]
pub struct StaticTips {
    tips: Vec<Value>,
}

impl StaticTips {
    pub fn new(tips: Vec<Value>) -> Self {
        Self { tips }
    }
}

#[async_trait]
impl TipSource for StaticTips {
    async fn fetch_tips(&self) -> Result<Vec<Value>, TipError> {
        Ok(self.tips.clone())
    }
}
