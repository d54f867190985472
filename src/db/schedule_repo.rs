// src/db/schedule_repo.rs

use chrono::{DateTime, Utc};
use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::repository::ScheduleRepository,
    models::pt::{NewSchedule, Schedule, ScheduleFilter, ScheduleStatus},
};

// `reserved -= 1` sem passar de zero, dentro da transação de quem chama
async fn release_reservation<'e, E>(executor: E, contract_id: Uuid) -> Result<(), AppError>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query(
        r#"
        UPDATE contracts
        SET reserved_sessions = reserved_sessions - 1, updated_at = NOW()
        WHERE id = $1 AND reserved_sessions > 0
        "#,
    )
    .bind(contract_id)
    .execute(executor)
    .await?;
    Ok(())
}

#[derive(Clone)]
pub struct PgScheduleRepository {
    pool: PgPool,
}

impl PgScheduleRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl ScheduleRepository for PgScheduleRepository {
    async fn create_reserving(&self, new: NewSchedule) -> Result<Option<Schedule>, AppError> {
        let mut tx = self.pool.begin().await?;

        // 1. Agendamento. A chave do cliente é única por tenant.
        let schedule = sqlx::query_as::<_, Schedule>(
            r#"
            INSERT INTO schedules (
                client_id, tenant_id, branch_id, contract_id, coach_id, member_id,
                start_time, end_time, session_goal, remarks
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING *
            "#,
        )
        .bind(&new.client_id)
        .bind(new.tenant_id)
        .bind(new.branch_id)
        .bind(new.contract_id)
        .bind(new.coach_id)
        .bind(new.member_id)
        .bind(new.start_time)
        .bind(new.end_time)
        .bind(&new.session_goal)
        .bind(&new.remarks)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.is_unique_violation() {
                    return AppError::DuplicateClientId(new.client_id.clone().unwrap_or_default());
                }
            }
            e.into()
        })?;

        // 2. Reserva condicional no contrato, na mesma transação
        let reserved = sqlx::query_scalar::<_, Uuid>(
            r#"
            UPDATE contracts
            SET reserved_sessions = reserved_sessions + 1, updated_at = NOW()
            WHERE id = $1 AND status = 'ACTIVE' AND reserved_sessions < remaining_sessions
            RETURNING id
            "#,
        )
        .bind(new.contract_id)
        .fetch_optional(&mut *tx)
        .await?;

        if reserved.is_none() {
            tx.rollback().await?;
            return Ok(None);
        }

        tx.commit().await?;
        Ok(Some(schedule))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Schedule>, AppError> {
        let schedule = sqlx::query_as::<_, Schedule>("SELECT * FROM schedules WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(schedule)
    }

    async fn find_by_client_id(
        &self,
        tenant_id: Uuid,
        client_id: &str,
    ) -> Result<Option<Schedule>, AppError> {
        let schedule = sqlx::query_as::<_, Schedule>(
            "SELECT * FROM schedules WHERE tenant_id = $1 AND client_id = $2",
        )
        .bind(tenant_id)
        .bind(client_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(schedule)
    }

    async fn list_by_coach(
        &self,
        coach_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Schedule>, AppError> {
        let schedules = sqlx::query_as::<_, Schedule>(
            r#"
            SELECT * FROM schedules
            WHERE coach_id = $1 AND start_time >= $2 AND start_time <= $3
            ORDER BY start_time
            "#,
        )
        .bind(coach_id)
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;
        Ok(schedules)
    }

    async fn list_by_member(
        &self,
        member_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Schedule>, AppError> {
        let schedules = sqlx::query_as::<_, Schedule>(
            r#"
            SELECT * FROM schedules
            WHERE member_id = $1 AND start_time >= $2 AND start_time <= $3
            ORDER BY start_time
            "#,
        )
        .bind(member_id)
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;
        Ok(schedules)
    }

    async fn list(
        &self,
        tenant_id: Uuid,
        filter: ScheduleFilter,
    ) -> Result<Vec<Schedule>, AppError> {
        // Filtros opcionais: parâmetro NULL desliga a condição
        let schedules = sqlx::query_as::<_, Schedule>(
            r#"
            SELECT * FROM schedules
            WHERE tenant_id = $1
              AND ($2::schedule_status IS NULL OR status = $2)
              AND ($3::uuid IS NULL OR coach_id = $3)
              AND ($4::uuid IS NULL OR member_id = $4)
              AND ($5::uuid IS NULL OR contract_id = $5)
              AND ($6::timestamptz IS NULL OR start_time >= $6)
              AND ($7::timestamptz IS NULL OR start_time <= $7)
            ORDER BY start_time
            "#,
        )
        .bind(tenant_id)
        .bind(filter.status)
        .bind(filter.coach_id)
        .bind(filter.member_id)
        .bind(filter.contract_id)
        .bind(filter.from)
        .bind(filter.to)
        .fetch_all(&self.pool)
        .await?;
        Ok(schedules)
    }

    async fn update_status_if(
        &self,
        id: Uuid,
        expected: &[ScheduleStatus],
        next: ScheduleStatus,
    ) -> Result<Option<Schedule>, AppError> {
        let schedule = sqlx::query_as::<_, Schedule>(
            r#"
            UPDATE schedules
            SET status = $3, updated_at = NOW()
            WHERE id = $1 AND status = ANY($2)
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(expected.to_vec())
        .bind(next)
        .fetch_optional(&self.pool)
        .await?;
        Ok(schedule)
    }

    async fn reschedule_if(
        &self,
        id: Uuid,
        expected: &[ScheduleStatus],
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        next: ScheduleStatus,
    ) -> Result<Option<Schedule>, AppError> {
        let schedule = sqlx::query_as::<_, Schedule>(
            r#"
            UPDATE schedules
            SET start_time = $3, end_time = $4, status = $5, updated_at = NOW()
            WHERE id = $1 AND status = ANY($2)
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(expected.to_vec())
        .bind(start_time)
        .bind(end_time)
        .bind(next)
        .fetch_optional(&self.pool)
        .await?;
        Ok(schedule)
    }

    async fn close_releasing(
        &self,
        id: Uuid,
        expected: &[ScheduleStatus],
        next: ScheduleStatus,
    ) -> Result<Option<Schedule>, AppError> {
        let mut tx = self.pool.begin().await?;

        let closed = sqlx::query_as::<_, Schedule>(
            r#"
            UPDATE schedules
            SET status = $3, updated_at = NOW()
            WHERE id = $1 AND status = ANY($2)
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(expected.to_vec())
        .bind(next)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(closed) = closed else {
            tx.rollback().await?;
            return Ok(None);
        };

        release_reservation(&mut *tx, closed.contract_id).await?;
        tx.commit().await?;
        Ok(Some(closed))
    }

    async fn delete_releasing(
        &self,
        id: Uuid,
        expected: ScheduleStatus,
    ) -> Result<bool, AppError> {
        let mut tx = self.pool.begin().await?;

        let contract_id = sqlx::query_scalar::<_, Uuid>(
            "DELETE FROM schedules WHERE id = $1 AND status = $2 RETURNING contract_id",
        )
        .bind(id)
        .bind(expected)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(contract_id) = contract_id else {
            tx.rollback().await?;
            return Ok(false);
        };

        release_reservation(&mut *tx, contract_id).await?;
        tx.commit().await?;
        Ok(true)
    }

    async fn count_by_contract_and_status(
        &self,
        contract_id: Uuid,
        statuses: &[ScheduleStatus],
    ) -> Result<i64, AppError> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM schedules WHERE contract_id = $1 AND status = ANY($2)",
        )
        .bind(contract_id)
        .bind(statuses.to_vec())
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    async fn list_completed_without_consumption(
        &self,
        tenant_id: Uuid,
    ) -> Result<Vec<Schedule>, AppError> {
        let schedules = sqlx::query_as::<_, Schedule>(
            r#"
            SELECT s.* FROM schedules s
            LEFT JOIN session_consumptions c ON c.schedule_id = s.id
            WHERE s.tenant_id = $1 AND s.status = 'COMPLETED' AND c.schedule_id IS NULL
            ORDER BY s.start_time
            "#,
        )
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(schedules)
    }
}
