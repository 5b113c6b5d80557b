use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use time::OffsetDateTime;
use tracing::{debug, instrument};

use domain::account::UserId;
use domain::payment::{PaymentId, PaymentRecord, PaymentStatus};
use intervox_application::{
    error::{AppError, AppResult},
    ports::outgoing::payment_store::PaymentStorePort,
};

use super::utils::PostgresExecutor;

pub struct PostgresPaymentStoreAdapter {
    pool: PgPool,
    executor: PostgresExecutor,
}

impl PostgresPaymentStoreAdapter {
    pub fn new(pool: PgPool, query_timeout_secs: u64) -> Self {
        Self {
            pool,
            executor: PostgresExecutor::new(query_timeout_secs),
        }
    }
}

fn db_error(context: &str, err: &sqlx::Error) -> AppError {
    AppError::DatabaseError {
        message: format!("{}: {}", context, err),
    }
}

fn payment_from_row(row: &PgRow) -> AppResult<PaymentRecord> {
    let status_label: String = row
        .try_get("status")
        .map_err(|e| db_error("Failed to read status", &e))?;
    let status = PaymentStatus::parse(&status_label).ok_or_else(|| AppError::DatabaseError {
        message: format!("Unrecognized payment status: {}", status_label),
    })?;

    Ok(PaymentRecord {
        id: PaymentId::from_uuid(
            row.try_get("id")
                .map_err(|e| db_error("Failed to read id", &e))?,
        ),
        user_id: UserId::from_uuid(
            row.try_get("user_id")
                .map_err(|e| db_error("Failed to read user_id", &e))?,
        ),
        credits: row
            .try_get("credits")
            .map_err(|e| db_error("Failed to read credits", &e))?,
        receipt_number: row
            .try_get("receipt_number")
            .map_err(|e| db_error("Failed to read receipt_number", &e))?,
        status,
        credited_at: row
            .try_get("credited_at")
            .map_err(|e| db_error("Failed to read credited_at", &e))?,
        created_at: row
            .try_get("created_at")
            .map_err(|e| db_error("Failed to read created_at", &e))?,
    })
}

#[async_trait::async_trait]
impl PaymentStorePort for PostgresPaymentStoreAdapter {
    #[instrument(skip(self))]
    async fn get_payment(&self, payment_id: &PaymentId) -> AppResult<Option<PaymentRecord>> {
        let row = self
            .executor
            .execute_with_timeout(
                || {
                    sqlx::query(
                        r"
                        SELECT id, user_id, credits, receipt_number, status,
                               credited_at, created_at
                        FROM payments
                        WHERE id = $1
                        ",
                    )
                    .bind(payment_id.as_uuid())
                    .fetch_optional(&self.pool)
                },
                &format!("Failed to get payment {}", payment_id),
            )
            .await?;

        row.map(|row| payment_from_row(&row)).transpose()
    }

    #[instrument(skip(self))]
    async fn claim_for_crediting(&self, payment_id: &PaymentId) -> AppResult<bool> {
        // Single conditional update: only one caller can flip the latch.
        let result = self
            .executor
            .execute_with_timeout(
                || {
                    sqlx::query(
                        r"
                        UPDATE payments
                        SET credited_at = $1
                        WHERE id = $2 AND credited_at IS NULL
                        ",
                    )
                    .bind(OffsetDateTime::now_utc())
                    .bind(payment_id.as_uuid())
                    .execute(&self.pool)
                },
                &format!("Failed to claim payment {}", payment_id),
            )
            .await?;

        let claimed = result.rows_affected() == 1;
        debug!("Payment {} claim: {}", payment_id, claimed);
        Ok(claimed)
    }

    #[instrument(skip(self))]
    async fn release_credit_claim(&self, payment_id: &PaymentId) -> AppResult<()> {
        self.executor
            .execute_with_timeout(
                || {
                    sqlx::query("UPDATE payments SET credited_at = NULL WHERE id = $1")
                        .bind(payment_id.as_uuid())
                        .execute(&self.pool)
                },
                &format!("Failed to release credit claim for payment {}", payment_id),
            )
            .await?;

        Ok(())
    }
}
