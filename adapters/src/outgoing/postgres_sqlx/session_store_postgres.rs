use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use time::OffsetDateTime;
use tracing::{debug, instrument};

use domain::account::UserId;
use domain::session::{
    InterviewSession, SessionCredits, SessionId, SessionStatus, SettlementState,
};
use intervox_application::{
    error::{AppError, AppResult},
    ports::outgoing::session_store::{NewSession, SessionStorePort, SettlementWrite},
};

use super::utils::PostgresExecutor;

pub struct PostgresSessionStoreAdapter {
    pool: PgPool,
    executor: PostgresExecutor,
}

impl PostgresSessionStoreAdapter {
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

const SESSION_COLUMNS: &str = "id, user_id, status, requested_minutes, elapsed_seconds, \
     credits_blocked, credits_deducted, credits_refunded, settlement_state, \
     created_at, ended_at";

fn session_from_row(row: &PgRow) -> AppResult<InterviewSession> {
    let status_label: String = row
        .try_get("status")
        .map_err(|e| db_error("Failed to read status", &e))?;
    let status = SessionStatus::parse(&status_label).ok_or_else(|| AppError::DatabaseError {
        message: format!("Unrecognized session status: {}", status_label),
    })?;

    let state_label: String = row
        .try_get("settlement_state")
        .map_err(|e| db_error("Failed to read settlement_state", &e))?;
    let settlement_state =
        SettlementState::parse(&state_label).ok_or_else(|| AppError::DatabaseError {
            message: format!("Unrecognized settlement_state: {}", state_label),
        })?;

    let requested_minutes: i32 = row
        .try_get("requested_minutes")
        .map_err(|e| db_error("Failed to read requested_minutes", &e))?;

    Ok(InterviewSession {
        id: SessionId::from_uuid(
            row.try_get("id")
                .map_err(|e| db_error("Failed to read id", &e))?,
        ),
        user_id: UserId::from_uuid(
            row.try_get("user_id")
                .map_err(|e| db_error("Failed to read user_id", &e))?,
        ),
        status,
        requested_minutes: u32::try_from(requested_minutes).unwrap_or(0),
        elapsed_seconds: row
            .try_get("elapsed_seconds")
            .map_err(|e| db_error("Failed to read elapsed_seconds", &e))?,
        credits: SessionCredits {
            credits_blocked: row
                .try_get("credits_blocked")
                .map_err(|e| db_error("Failed to read credits_blocked", &e))?,
            credits_deducted: row
                .try_get("credits_deducted")
                .map_err(|e| db_error("Failed to read credits_deducted", &e))?,
            credits_refunded: row
                .try_get("credits_refunded")
                .map_err(|e| db_error("Failed to read credits_refunded", &e))?,
            settlement_state,
        },
        created_at: row
            .try_get("created_at")
            .map_err(|e| db_error("Failed to read created_at", &e))?,
        ended_at: row
            .try_get("ended_at")
            .map_err(|e| db_error("Failed to read ended_at", &e))?,
    })
}

#[async_trait::async_trait]
impl SessionStorePort for PostgresSessionStoreAdapter {
    #[instrument(skip(self, session))]
    async fn create_session(&self, session: &NewSession) -> AppResult<InterviewSession> {
        let sql = format!(
            r"
            INSERT INTO interview_sessions
                (id, user_id, status, requested_minutes, credits_blocked,
                 settlement_state, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {SESSION_COLUMNS}
            ",
        );
        let row = self
            .executor
            .execute_with_timeout(
                || {
                    sqlx::query(&sql)
                        .bind(session.id.as_uuid())
                        .bind(session.user_id.as_uuid())
                        .bind(SessionStatus::Pending.as_str())
                        .bind(i32::try_from(session.requested_minutes).unwrap_or(i32::MAX))
                        .bind(session.credits_blocked)
                        .bind(SettlementState::Reserved.as_str())
                        .bind(OffsetDateTime::now_utc())
                        .fetch_one(&self.pool)
                },
                &format!("Failed to create session {}", session.id),
            )
            .await?;

        debug!(
            "Created session {} with {} credits blocked",
            session.id, session.credits_blocked
        );
        session_from_row(&row)
    }

    #[instrument(skip(self))]
    async fn get_session(&self, session_id: &SessionId) -> AppResult<Option<InterviewSession>> {
        let sql = format!("SELECT {SESSION_COLUMNS} FROM interview_sessions WHERE id = $1");
        let row = self
            .executor
            .execute_with_timeout(
                || {
                    sqlx::query(&sql)
                        .bind(session_id.as_uuid())
                        .fetch_optional(&self.pool)
                },
                &format!("Failed to get session {}", session_id),
            )
            .await?;

        row.map(|row| session_from_row(&row)).transpose()
    }

    #[instrument(skip(self, settlement))]
    async fn record_settlement(
        &self,
        session_id: &SessionId,
        settlement: &SettlementWrite,
    ) -> AppResult<bool> {
        // Conditional on both fields still being unset: the at-most-once
        // guard between racing end-of-call triggers.
        let result = self
            .executor
            .execute_with_timeout(
                || {
                    sqlx::query(
                        r"
                        UPDATE interview_sessions
                        SET credits_deducted = $1,
                            credits_refunded = $2,
                            settlement_state = $3
                        WHERE id = $4
                          AND credits_deducted IS NULL
                          AND credits_refunded IS NULL
                        ",
                    )
                    .bind(settlement.credits_deducted)
                    .bind(settlement.credits_refunded)
                    .bind(settlement.settlement_state.as_str())
                    .bind(session_id.as_uuid())
                    .execute(&self.pool)
                },
                &format!("Failed to record settlement for session {}", session_id),
            )
            .await?;

        Ok(result.rows_affected() == 1)
    }

    #[instrument(skip(self, settlement))]
    async fn overwrite_settlement(
        &self,
        session_id: &SessionId,
        settlement: &SettlementWrite,
    ) -> AppResult<()> {
        self.executor
            .execute_with_timeout(
                || {
                    sqlx::query(
                        r"
                        UPDATE interview_sessions
                        SET credits_deducted = $1,
                            credits_refunded = $2,
                            settlement_state = $3
                        WHERE id = $4
                        ",
                    )
                    .bind(settlement.credits_deducted)
                    .bind(settlement.credits_refunded)
                    .bind(settlement.settlement_state.as_str())
                    .bind(session_id.as_uuid())
                    .execute(&self.pool)
                },
                &format!("Failed to overwrite settlement for session {}", session_id),
            )
            .await?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn mark_ended(
        &self,
        session_id: &SessionId,
        status: SessionStatus,
        elapsed_seconds: Option<i64>,
        ended_at: OffsetDateTime,
    ) -> AppResult<()> {
        self.executor
            .execute_with_timeout(
                || {
                    sqlx::query(
                        r"
                        UPDATE interview_sessions
                        SET status = $1,
                            elapsed_seconds = COALESCE($2, elapsed_seconds),
                            ended_at = $3
                        WHERE id = $4
                        ",
                    )
                    .bind(status.as_str())
                    .bind(elapsed_seconds)
                    .bind(ended_at)
                    .bind(session_id.as_uuid())
                    .execute(&self.pool)
                },
                &format!("Failed to mark session {} ended", session_id),
            )
            .await?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn find_stale_reserved(
        &self,
        cutoff: OffsetDateTime,
        limit: u32,
    ) -> AppResult<Vec<InterviewSession>> {
        let sql = format!(
            r"
            SELECT {SESSION_COLUMNS}
            FROM interview_sessions
            WHERE settlement_state = $1
              AND status IN ($2, $3)
              AND created_at < $4
            ORDER BY created_at
            LIMIT $5
            ",
        );
        let rows = self
            .executor
            .execute_with_timeout(
                || {
                    sqlx::query(&sql)
                        .bind(SettlementState::Reserved.as_str())
                        .bind(SessionStatus::Pending.as_str())
                        .bind(SessionStatus::Active.as_str())
                        .bind(cutoff)
                        .bind(i64::from(limit))
                        .fetch_all(&self.pool)
                },
                "Failed to scan for stale reservations",
            )
            .await?;

        rows.iter().map(session_from_row).collect()
    }
}
