/// Settings the credit/session services need at runtime, assembled from the
/// infrastructure [`Config`](crate::infrastructure_config::Config) at wiring
/// time.
#[derive(Debug, Clone)]
pub struct BillingSettings {
    pub history_default_limit: u32,
    pub history_max_limit: u32,
    pub stale_reservation_ttl_secs: u64,
    pub stale_sweep_batch_size: u32,
}
