use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{info, warn};

use intervox_application::infrastructure_config::Config;
use intervox_application::ports::incoming::sessions::ReclaimStaleReservationsUseCase;

/// Background loop that releases reservations of abandoned sessions: blocked
/// credits whose session never reached an end-of-call trigger would otherwise
/// be held forever. The interval is jittered so replicas do not scan in
/// lockstep.
pub fn spawn_reservation_sweeper(
    config: Arc<Config>,
    reclaim_service: Arc<dyn ReclaimStaleReservationsUseCase + Send + Sync>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let delay = Duration::from_secs(config.sweep_interval_with_jitter());
            tokio::time::sleep(delay).await;

            match reclaim_service.reclaim_stale_reservations().await {
                Ok(report) if report.sessions_released > 0 => {
                    info!(
                        "Reservation sweep released {} credits from {} of {} stale sessions",
                        report.credits_released, report.sessions_released, report.sessions_scanned
                    );
                }
                Ok(_) => {}
                Err(e) => {
                    warn!("Reservation sweep failed: {}", e);
                }
            }
        }
    })
}
