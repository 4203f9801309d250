use thiserror::Error;

use crate::alarms::AlarmError;
use crate::store::StoreError;
use crate::tips::TipError;

#[derive(Debug, Error)]
pub enum QuickrefError {
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    #[error("alarm error: {0}")]
    Alarm(#[from] AlarmError),

    #[error("tip refresh error: {0}")]
    Tip(#[from] TipError),
}
