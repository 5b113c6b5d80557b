use rust_decimal::Decimal;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, QueryBuilder, Row, Transaction};
use time::OffsetDateTime;
use tracing::{debug, instrument};
use uuid::Uuid;

use domain::account::{AccountBalance, UserId};
use domain::ledger::{
    LedgerReference, ReferenceType, TransactionEntry, TransactionMetadata, TransactionType,
};
use intervox_application::{
    error::{AppError, AppResult},
    ports::outgoing::ledger_store::{
        LedgerStorePort, SettledBalance, TransactionPage, TransactionQuery,
    },
};

use super::utils::{PostgresExecutor, begin_transaction, commit_transaction};

/// Ledger store on Postgres. Every mutating operation is one transaction
/// that takes a row lock on the user's balance (`SELECT ... FOR UPDATE`) and
/// re-checks preconditions under that lock, so concurrent operations for the
/// same user serialize at the database.
pub struct PostgresLedgerStoreAdapter {
    pool: PgPool,
    executor: PostgresExecutor,
}

impl PostgresLedgerStoreAdapter {
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

fn balance_from_row(row: &PgRow) -> AppResult<AccountBalance> {
    let credits: Decimal = row
        .try_get("credits")
        .map_err(|e| db_error("Failed to read credits", &e))?;
    let blocked_credits: Decimal = row
        .try_get("blocked_credits")
        .map_err(|e| db_error("Failed to read blocked_credits", &e))?;
    Ok(AccountBalance::new(credits, blocked_credits))
}

async fn lock_balance(
    tx: &mut Transaction<'_, Postgres>,
    user_id: &UserId,
) -> AppResult<AccountBalance> {
    let row = sqlx::query(
        r"
        SELECT credits, blocked_credits
        FROM credit_accounts
        WHERE user_id = $1
        FOR UPDATE
        ",
    )
    .bind(user_id.as_uuid())
    .fetch_optional(&mut **tx)
    .await
    .map_err(|e| db_error("Failed to lock balance row", &e))?;

    match row {
        Some(row) => balance_from_row(&row),
        None => Err(AppError::NotFound {
            message: format!("No credit account for user {}", user_id),
        }),
    }
}

async fn store_balance(
    tx: &mut Transaction<'_, Postgres>,
    user_id: &UserId,
    balance: &AccountBalance,
) -> AppResult<()> {
    sqlx::query(
        r"
        UPDATE credit_accounts
        SET credits = $1, blocked_credits = $2, updated_at = $3
        WHERE user_id = $4
        ",
    )
    .bind(balance.credits)
    .bind(balance.blocked_credits)
    .bind(OffsetDateTime::now_utc())
    .bind(user_id.as_uuid())
    .execute(&mut **tx)
    .await
    .map_err(|e| db_error("Failed to update balance", &e))?;

    Ok(())
}

async fn append_entry(
    tx: &mut Transaction<'_, Postgres>,
    user_id: &UserId,
    transaction_type: TransactionType,
    amount: Decimal,
    balance_after: Decimal,
    reference: &LedgerReference,
    metadata: Option<&TransactionMetadata>,
) -> AppResult<()> {
    sqlx::query(
        r"
        INSERT INTO credit_transactions
            (id, user_id, transaction_type, amount, balance_after,
             reference_id, reference_type, metadata, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        ",
    )
    .bind(Uuid::new_v4())
    .bind(user_id.as_uuid())
    .bind(transaction_type.as_str())
    .bind(amount)
    .bind(balance_after)
    .bind(reference.reference_id)
    .bind(reference.reference_type.as_str())
    .bind(metadata.map(|m| sqlx::types::Json(m.clone())))
    .bind(OffsetDateTime::now_utc())
    .execute(&mut **tx)
    .await
    .map_err(|e| db_error("Failed to append transaction entry", &e))?;

    Ok(())
}

fn entry_from_row(row: &PgRow) -> AppResult<TransactionEntry> {
    let type_label: String = row
        .try_get("transaction_type")
        .map_err(|e| db_error("Failed to read transaction_type", &e))?;
    let transaction_type =
        TransactionType::parse(&type_label).ok_or_else(|| AppError::DatabaseError {
            message: format!("Unrecognized transaction_type: {}", type_label),
        })?;

    let reference_label: Option<String> = row
        .try_get("reference_type")
        .map_err(|e| db_error("Failed to read reference_type", &e))?;
    let reference_type = match reference_label {
        Some(label) => Some(ReferenceType::parse(&label).ok_or_else(|| {
            AppError::DatabaseError {
                message: format!("Unrecognized reference_type: {}", label),
            }
        })?),
        None => None,
    };

    let metadata: Option<sqlx::types::Json<TransactionMetadata>> = row
        .try_get("metadata")
        .map_err(|e| db_error("Failed to read metadata", &e))?;

    Ok(TransactionEntry {
        id: row
            .try_get("id")
            .map_err(|e| db_error("Failed to read id", &e))?,
        user_id: UserId::from_uuid(
            row.try_get("user_id")
                .map_err(|e| db_error("Failed to read user_id", &e))?,
        ),
        transaction_type,
        amount: row
            .try_get("amount")
            .map_err(|e| db_error("Failed to read amount", &e))?,
        balance_after: row
            .try_get("balance_after")
            .map_err(|e| db_error("Failed to read balance_after", &e))?,
        reference_id: row
            .try_get("reference_id")
            .map_err(|e| db_error("Failed to read reference_id", &e))?,
        reference_type,
        metadata: metadata.map(|json| json.0),
        created_at: row
            .try_get("created_at")
            .map_err(|e| db_error("Failed to read created_at", &e))?,
    })
}

fn push_filters(builder: &mut QueryBuilder<'_, Postgres>, query: &TransactionQuery) {
    if let Some(transaction_type) = query.transaction_type {
        builder
            .push(" AND transaction_type = ")
            .push_bind(transaction_type.as_str());
    }
    if let Some(start_date) = query.start_date {
        builder.push(" AND created_at >= ").push_bind(start_date);
    }
    if let Some(end_date) = query.end_date {
        builder.push(" AND created_at <= ").push_bind(end_date);
    }
}

#[async_trait::async_trait]
impl LedgerStorePort for PostgresLedgerStoreAdapter {
    #[instrument(skip(self))]
    async fn get_balance(&self, user_id: &UserId) -> AppResult<AccountBalance> {
        let row = self
            .executor
            .execute_with_timeout(
                || {
                    sqlx::query(
                        r"
                        SELECT credits, blocked_credits
                        FROM credit_accounts
                        WHERE user_id = $1
                        ",
                    )
                    .bind(user_id.as_uuid())
                    .fetch_optional(&self.pool)
                },
                &format!("Failed to get balance for user {}", user_id),
            )
            .await?;

        match row {
            Some(row) => balance_from_row(&row),
            None => Err(AppError::NotFound {
                message: format!("No credit account for user {}", user_id),
            }),
        }
    }

    #[instrument(skip(self))]
    async fn block_credits(
        &self,
        user_id: &UserId,
        amount: Decimal,
        reference: &LedgerReference,
    ) -> AppResult<AccountBalance> {
        self.executor
            .run_with_timeout(async {
                let mut tx = begin_transaction(&self.pool).await?;

                let mut balance = lock_balance(&mut tx, user_id).await?;
                balance
                    .block(amount)
                    .map_err(|err| AppError::InsufficientCredits {
                        available: err.available,
                        needed: err.needed,
                    })?;

                store_balance(&mut tx, user_id, &balance).await?;
                append_entry(
                    &mut tx,
                    user_id,
                    TransactionType::Block,
                    -amount,
                    balance.available(),
                    reference,
                    None,
                )
                .await?;

                commit_transaction(tx).await?;

                debug!(
                    "Blocked {} credits for user {}, {} available",
                    amount,
                    user_id,
                    balance.available()
                );
                Ok(balance)
            })
            .await
    }

    #[instrument(skip(self, metadata))]
    async fn deduct_and_settle(
        &self,
        user_id: &UserId,
        blocked_amount: Decimal,
        actual_amount: Decimal,
        reference: &LedgerReference,
        metadata: Option<TransactionMetadata>,
    ) -> AppResult<SettledBalance> {
        self.executor
            .run_with_timeout(async {
                let mut tx = begin_transaction(&self.pool).await?;

                let mut balance = lock_balance(&mut tx, user_id).await?;
                let settlement = balance
                    .settle(blocked_amount, actual_amount)
                    .map_err(|err| AppError::InconsistentSettlement {
                        message: err.to_string(),
                    })?;

                store_balance(&mut tx, user_id, &balance).await?;

                // The deduct step consumes reserved credits, so availability
                // is unchanged by it; only the refund step raises it.
                append_entry(
                    &mut tx,
                    user_id,
                    TransactionType::Deduct,
                    -settlement.deducted,
                    balance.available() - settlement.refunded,
                    reference,
                    metadata.as_ref(),
                )
                .await?;

                if settlement.refunded > Decimal::ZERO {
                    append_entry(
                        &mut tx,
                        user_id,
                        TransactionType::Refund,
                        settlement.refunded,
                        balance.available(),
                        reference,
                        metadata.as_ref(),
                    )
                    .await?;
                }

                commit_transaction(tx).await?;

                debug!(
                    "Settled {} blocked credits for user {}: deducted {}, refunded {}",
                    blocked_amount, user_id, settlement.deducted, settlement.refunded
                );
                Ok(SettledBalance {
                    settlement,
                    balance,
                })
            })
            .await
    }

    #[instrument(skip(self, metadata))]
    async fn refund_blocked(
        &self,
        user_id: &UserId,
        amount: Decimal,
        reference: &LedgerReference,
        metadata: Option<TransactionMetadata>,
    ) -> AppResult<AccountBalance> {
        self.executor
            .run_with_timeout(async {
                let mut tx = begin_transaction(&self.pool).await?;

                let mut balance = lock_balance(&mut tx, user_id).await?;
                balance
                    .release(amount)
                    .map_err(|err| AppError::InconsistentSettlement {
                        message: err.to_string(),
                    })?;

                store_balance(&mut tx, user_id, &balance).await?;
                append_entry(
                    &mut tx,
                    user_id,
                    TransactionType::Refund,
                    amount,
                    balance.available(),
                    reference,
                    metadata.as_ref(),
                )
                .await?;

                commit_transaction(tx).await?;

                debug!("Refunded {} blocked credits for user {}", amount, user_id);
                Ok(balance)
            })
            .await
    }

    #[instrument(skip(self))]
    async fn add_credits(
        &self,
        user_id: &UserId,
        amount: Decimal,
        reference: &LedgerReference,
    ) -> AppResult<AccountBalance> {
        self.executor
            .run_with_timeout(async {
                let mut tx = begin_transaction(&self.pool).await?;

                // First purchase creates the account row.
                let row = sqlx::query(
                    r"
                    INSERT INTO credit_accounts (user_id, credits, blocked_credits, updated_at)
                    VALUES ($1, $2, 0, $3)
                    ON CONFLICT (user_id) DO UPDATE
                    SET credits = credit_accounts.credits + EXCLUDED.credits,
                        updated_at = EXCLUDED.updated_at
                    RETURNING credits, blocked_credits
                    ",
                )
                .bind(user_id.as_uuid())
                .bind(amount)
                .bind(OffsetDateTime::now_utc())
                .fetch_one(&mut *tx)
                .await
                .map_err(|e| db_error("Failed to add credits", &e))?;

                let balance = balance_from_row(&row)?;
                append_entry(
                    &mut tx,
                    user_id,
                    TransactionType::Purchase,
                    amount,
                    balance.available(),
                    reference,
                    None,
                )
                .await?;

                commit_transaction(tx).await?;

                debug!(
                    "Added {} credits for user {}, {} available",
                    amount,
                    user_id,
                    balance.available()
                );
                Ok(balance)
            })
            .await
    }

    #[instrument(skip(self, metadata))]
    async fn apply_adjustment(
        &self,
        user_id: &UserId,
        amount: Decimal,
        reference: &LedgerReference,
        metadata: Option<TransactionMetadata>,
    ) -> AppResult<AccountBalance> {
        self.executor
            .run_with_timeout(async {
                let mut tx = begin_transaction(&self.pool).await?;

                let mut balance = lock_balance(&mut tx, user_id).await?;
                balance.adjust(amount);

                store_balance(&mut tx, user_id, &balance).await?;
                append_entry(
                    &mut tx,
                    user_id,
                    TransactionType::Adjustment,
                    amount,
                    balance.available(),
                    reference,
                    metadata.as_ref(),
                )
                .await?;

                commit_transaction(tx).await?;

                debug!("Adjusted user {} balance by {}", user_id, amount);
                Ok(balance)
            })
            .await
    }

    #[instrument(skip(self))]
    async fn list_transactions(
        &self,
        user_id: &UserId,
        query: &TransactionQuery,
    ) -> AppResult<TransactionPage> {
        self.executor
            .run_with_timeout(async {
                let mut count_builder = QueryBuilder::<Postgres>::new(
                    "SELECT COUNT(*) AS total FROM credit_transactions WHERE user_id = ",
                );
                count_builder.push_bind(*user_id.as_uuid());
                push_filters(&mut count_builder, query);

                let total: i64 = count_builder
                    .build()
                    .fetch_one(&self.pool)
                    .await
                    .map_err(|e| db_error("Failed to count transactions", &e))?
                    .try_get("total")
                    .map_err(|e| db_error("Failed to read transaction count", &e))?;

                let mut builder = QueryBuilder::<Postgres>::new(
                    "SELECT id, user_id, transaction_type, amount, balance_after, \
                     reference_id, reference_type, metadata, created_at \
                     FROM credit_transactions WHERE user_id = ",
                );
                builder.push_bind(*user_id.as_uuid());
                push_filters(&mut builder, query);
                builder
                    .push(" ORDER BY created_at DESC LIMIT ")
                    .push_bind(i64::from(query.limit))
                    .push(" OFFSET ")
                    .push_bind(i64::from(query.offset));

                let rows = builder
                    .build()
                    .fetch_all(&self.pool)
                    .await
                    .map_err(|e| db_error("Failed to list transactions", &e))?;

                let transactions: Vec<TransactionEntry> = rows
                    .iter()
                    .map(entry_from_row)
                    .collect::<AppResult<Vec<_>>>()?;

                let has_more = i64::from(query.offset) + i64::try_from(transactions.len())
                    .unwrap_or(i64::MAX)
                    < total;

                Ok(TransactionPage {
                    transactions,
                    total,
                    has_more,
                })
            })
            .await
    }
}
