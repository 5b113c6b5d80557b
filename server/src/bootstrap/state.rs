use sqlx::{PgPool, postgres::PgPoolOptions};
use std::sync::Arc;

use intervox_adapters::outgoing::{
    memory::{
        ledger_store_memory::MemoryLedgerStoreAdapter,
        payment_store_memory::MemoryPaymentStoreAdapter,
        session_store_memory::MemorySessionStoreAdapter,
    },
    postgres_sqlx::{
        ledger_store_postgres::PostgresLedgerStoreAdapter,
        payment_store_postgres::PostgresPaymentStoreAdapter,
        session_store_postgres::PostgresSessionStoreAdapter,
    },
};
use intervox_adapters::shared::app_state::AppState as AdaptersAppState;
use intervox_application::error::AppError;
use intervox_application::infrastructure_config::{Config, StorageBackend};
use intervox_application::ports::incoming::{
    credits::{
        BalanceQueryUseCase, DurationOptionsUseCase, PurchaseCreditsUseCase,
        TransactionHistoryUseCase,
    },
    sessions::{EndInterviewUseCase, ReclaimStaleReservationsUseCase, StartInterviewUseCase},
};
use intervox_application::ports::outgoing::{
    ledger_store::DynLedgerStorePort, payment_store::DynPaymentStorePort,
    session_store::DynSessionStorePort,
};
use intervox_application::{credits::service::CreditService, sessions::service::SessionService};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    db_pool: Option<PgPool>,
    credit_service: Arc<CreditService>,
    session_service: Arc<SessionService>,
}

impl AppState {
    pub async fn new(config: Config) -> Result<Self, AppError> {
        let config = Arc::new(config);

        let (db_pool, ledger_store, session_store, payment_store) =
            Self::create_stores(&config).await?;

        let settings = config.billing_settings();
        let credit_service = CreditService::new(
            settings.clone(),
            Arc::clone(&ledger_store),
            Arc::clone(&session_store),
            payment_store,
        );
        let session_service = SessionService::new(settings, ledger_store, session_store);

        Ok(Self {
            config,
            db_pool,
            credit_service,
            session_service,
        })
    }

    async fn create_stores(
        config: &Config,
    ) -> Result<
        (
            Option<PgPool>,
            DynLedgerStorePort,
            DynSessionStorePort,
            DynPaymentStorePort,
        ),
        AppError,
    > {
        match config.storage.backend {
            StorageBackend::Postgres => {
                let db_pool = PgPoolOptions::new()
                    .max_connections(config.db.pool_size)
                    .connect(config.db.database_url())
                    .await
                    .map_err(|e| AppError::DatabaseError {
                        message: format!("Failed to connect to database: {}", e),
                    })?;

                let timeout = config.db.query_timeout_secs;
                let ledger_store: DynLedgerStorePort =
                    Arc::new(PostgresLedgerStoreAdapter::new(db_pool.clone(), timeout));
                let session_store: DynSessionStorePort =
                    Arc::new(PostgresSessionStoreAdapter::new(db_pool.clone(), timeout));
                let payment_store: DynPaymentStorePort =
                    Arc::new(PostgresPaymentStoreAdapter::new(db_pool.clone(), timeout));

                Ok((Some(db_pool), ledger_store, session_store, payment_store))
            }
            StorageBackend::Memory => {
                let ledger_store: DynLedgerStorePort = Arc::new(MemoryLedgerStoreAdapter::new());
                let session_store: DynSessionStorePort =
                    Arc::new(MemorySessionStoreAdapter::new());
                let payment_store: DynPaymentStorePort =
                    Arc::new(MemoryPaymentStoreAdapter::new());

                Ok((None, ledger_store, session_store, payment_store))
            }
        }
    }

    pub fn db_pool(&self) -> Option<&PgPool> {
        self.db_pool.as_ref()
    }

    pub fn reclaim_service(&self) -> Arc<dyn ReclaimStaleReservationsUseCase + Send + Sync> {
        Arc::clone(&self.session_service) as Arc<dyn ReclaimStaleReservationsUseCase + Send + Sync>
    }

    pub fn to_adapters_state(self) -> AdaptersAppState {
        AdaptersAppState::new(
            self.config,
            Arc::clone(&self.credit_service) as Arc<dyn BalanceQueryUseCase + Send + Sync>,
            Arc::clone(&self.credit_service) as Arc<dyn TransactionHistoryUseCase + Send + Sync>,
            Arc::clone(&self.credit_service) as Arc<dyn DurationOptionsUseCase + Send + Sync>,
            Arc::clone(&self.credit_service) as Arc<dyn PurchaseCreditsUseCase + Send + Sync>,
            Arc::clone(&self.session_service) as Arc<dyn StartInterviewUseCase + Send + Sync>,
            Arc::clone(&self.session_service) as Arc<dyn EndInterviewUseCase + Send + Sync>,
        )
    }
}
