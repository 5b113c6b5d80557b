use std::sync::Arc;

use intervox_application::infrastructure_config::Config;
use intervox_application::ports::incoming::{
    credits::{
        BalanceQueryUseCase, DurationOptionsUseCase, PurchaseCreditsUseCase,
        TransactionHistoryUseCase,
    },
    sessions::{EndInterviewUseCase, StartInterviewUseCase},
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub balance_query_service: Arc<dyn BalanceQueryUseCase + Send + Sync>,
    pub transaction_history_service: Arc<dyn TransactionHistoryUseCase + Send + Sync>,
    pub duration_options_service: Arc<dyn DurationOptionsUseCase + Send + Sync>,
    pub purchase_credits_service: Arc<dyn PurchaseCreditsUseCase + Send + Sync>,
    pub start_interview_service: Arc<dyn StartInterviewUseCase + Send + Sync>,
    pub end_interview_service: Arc<dyn EndInterviewUseCase + Send + Sync>,
}

impl AppState {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: Arc<Config>,
        balance_query_service: Arc<dyn BalanceQueryUseCase + Send + Sync>,
        transaction_history_service: Arc<dyn TransactionHistoryUseCase + Send + Sync>,
        duration_options_service: Arc<dyn DurationOptionsUseCase + Send + Sync>,
        purchase_credits_service: Arc<dyn PurchaseCreditsUseCase + Send + Sync>,
        start_interview_service: Arc<dyn StartInterviewUseCase + Send + Sync>,
        end_interview_service: Arc<dyn EndInterviewUseCase + Send + Sync>,
    ) -> Self {
        Self {
            config,
            balance_query_service,
            transaction_history_service,
            duration_options_service,
            purchase_credits_service,
            start_interview_service,
            end_interview_service,
        }
    }
}
