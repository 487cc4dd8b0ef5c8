//! nowtify-core/src/tasks/poller.rs
//!
//! The periodic alarm: runs a full sweep at startup, then on the
//! configured cadence. The cadence is a watch channel so `updateAlarm`
//! retunes a running loop without restarting it.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::sleep;
use tracing::{error, info};

use crate::eventbus::EventBus;
use crate::services::scheduler::AdaptiveScheduler;

pub fn spawn_polling_task(
    scheduler: Arc<AdaptiveScheduler>,
    event_bus: Arc<EventBus>,
    mut interval_rx: watch::Receiver<Duration>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        // Check immediately at startup.
        if let Err(e) = scheduler.run_sweep_and_reschedule().await {
            error!("Initial sweep failed: {e:?}");
        }

        let mut shutdown_rx = event_bus.shutdown_rx.clone();
        loop {
            let period = *interval_rx.borrow();
            tokio::select! {
                _ = sleep(period) => {
                    if let Err(e) = scheduler.run_sweep_and_reschedule().await {
                        error!("Periodic sweep failed: {e:?}");
                    }
                }
                changed = interval_rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    info!("Sweep interval updated to {:?}", *interval_rx.borrow());
                }
                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        break;
                    }
                }
            }
        }

        scheduler.cancel_all();
        info!("Polling task stopped");
    })
}
