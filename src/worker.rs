//! The long-running refresh worker.
//!
//! One task owns the alarm service: it makes sure the refresh alarm is
//! registered (refreshing immediately when it had to create it), then
//! services firings until cancelled. Firings for other alarm names are
//! ignored; a failed refresh is logged and retried at the next firing.

use tokio_util::sync::CancellationToken;

use crate::alarms::AlarmService;
use crate::error::QuickrefError;
use crate::store::KvStore;
use crate::tips::{TipRefresher, TipSource, TIP_ALARM};

pub async fn run<S, T, A>(
    refresher: TipRefresher<S, T>,
    mut alarms: A,
    cancel: CancellationToken,
) -> Result<(), QuickrefError>
where
    S: KvStore,
    T: TipSource,
    A: AlarmService,
{
    refresher.ensure_scheduled(&alarms).await?;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                log::info!("worker stopping");
                return Ok(());
            }
            fired = alarms.next_fired() => {
                let fired = fired?;
                if fired.name != TIP_ALARM {
                    log::debug!("ignoring alarm {:?}", fired.name);
                    continue;
                }
                if let Err(e) = refresher.refresh().await {
                    log::error!("tip refresh failed: {e}");
                }
            }
        }
    }
}
