use intervox_application::infrastructure_config::{
    BillingConfig, Config, StorageBackend, SweeperConfig,
};
use tracing::info;

pub fn print_api_info(config: &Config) {
    print_api_documentation_info(config);
    print_configuration_info(config);
}

fn print_api_documentation_info(config: &Config) {
    let base_url = format!("http://{}", config.server_address());
    info!("📋 API Documentation:");
    info!("  📖 Swagger UI: {}/docs", base_url);
    info!("  📄 OpenAPI JSON: {}/api-docs/openapi.json", base_url);
}

fn print_configuration_info(config: &Config) {
    info!("⚙️  Configuration:");
    print_storage_configuration(config);
    print_billing_configuration(&config.billing);
    print_sweeper_configuration(&config.sweeper);
}

fn print_storage_configuration(config: &Config) {
    match config.storage.backend {
        StorageBackend::Postgres => {
            info!("  🗄️  Storage: PostgreSQL with connection pooling");
        }
        StorageBackend::Memory => {
            info!("  🗄️  Storage: in-memory (non-durable, development only)");
        }
    }
}

fn print_billing_configuration(billing: &BillingConfig) {
    info!(
        "  📒 History paging: default {}, max {} entries",
        billing.history_default_limit, billing.history_max_limit
    );
}

fn print_sweeper_configuration(sweeper: &SweeperConfig) {
    if sweeper.enabled {
        info!(
            "  🧹 Reservation sweeper: ENABLED (stale after {}s, every ~{}s, batch {})",
            sweeper.stale_after_secs, sweeper.interval_secs, sweeper.batch_size
        );
    } else {
        info!("  🧹 Reservation sweeper: DISABLED");
    }
}
