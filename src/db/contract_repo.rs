// src/db/contract_repo.rs

use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::repository::ContractRepository,
    models::pt::{Contract, ContractStatus, NewContract, ScheduleStatus},
};

#[derive(Clone)]
pub struct PgContractRepository {
    pool: PgPool,
}

impl PgContractRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl ContractRepository for PgContractRepository {
    async fn create(&self, new: NewContract) -> Result<Contract, AppError> {
        // O saldo nasce igual ao total copiado do modelo
        let contract = sqlx::query_as::<_, Contract>(
            r#"
            INSERT INTO contracts (
                tenant_id, branch_id, package_id, member_id, coach_id,
                total_sessions, remaining_sessions, price
            )
            VALUES ($1, $2, $3, $4, $5, $6, $6, $7)
            RETURNING *
            "#,
        )
        .bind(new.tenant_id)
        .bind(new.branch_id)
        .bind(new.package_id)
        .bind(new.member_id)
        .bind(new.coach_id)
        .bind(new.total_sessions)
        .bind(new.price)
        .fetch_one(&self.pool)
        .await?;

        Ok(contract)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Contract>, AppError> {
        let contract = sqlx::query_as::<_, Contract>("SELECT * FROM contracts WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(contract)
    }

    async fn list_by_tenant(&self, tenant_id: Uuid) -> Result<Vec<Contract>, AppError> {
        let contracts = sqlx::query_as::<_, Contract>(
            "SELECT * FROM contracts WHERE tenant_id = $1 ORDER BY created_at",
        )
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(contracts)
    }

    async fn list_active_by_member(&self, member_id: Uuid) -> Result<Vec<Contract>, AppError> {
        let contracts = sqlx::query_as::<_, Contract>(
            r#"
            SELECT * FROM contracts
            WHERE member_id = $1 AND status = 'ACTIVE' AND remaining_sessions > 0
            ORDER BY created_at
            "#,
        )
        .bind(member_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(contracts)
    }

    async fn list_active_by_coach(&self, coach_id: Uuid) -> Result<Vec<Contract>, AppError> {
        let contracts = sqlx::query_as::<_, Contract>(
            r#"
            SELECT * FROM contracts
            WHERE coach_id = $1 AND status = 'ACTIVE' AND remaining_sessions > 0
            ORDER BY created_at
            "#,
        )
        .bind(coach_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(contracts)
    }

    async fn find_first_active_by_coach_and_member(
        &self,
        coach_id: Uuid,
        member_id: Uuid,
    ) -> Result<Option<Contract>, AppError> {
        let contract = sqlx::query_as::<_, Contract>(
            r#"
            SELECT * FROM contracts
            WHERE coach_id = $1 AND member_id = $2
              AND status = 'ACTIVE' AND remaining_sessions > 0
            ORDER BY created_at
            LIMIT 1
            "#,
        )
        .bind(coach_id)
        .bind(member_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(contract)
    }

    async fn list_low_sessions_by_coach(
        &self,
        coach_id: Uuid,
        threshold: i32,
    ) -> Result<Vec<Contract>, AppError> {
        let contracts = sqlx::query_as::<_, Contract>(
            r#"
            SELECT * FROM contracts
            WHERE coach_id = $1 AND status = 'ACTIVE' AND remaining_sessions <= $2
            ORDER BY remaining_sessions
            "#,
        )
        .bind(coach_id)
        .bind(threshold)
        .fetch_all(&self.pool)
        .await?;
        Ok(contracts)
    }

    async fn resync_reservations(&self, tenant_id: Uuid) -> Result<Vec<Contract>, AppError> {
        let mut tx = self.pool.begin().await?;

        // Trava os contratos do tenant: agendamentos em voo terminam antes da contagem
        sqlx::query("SELECT id FROM contracts WHERE tenant_id = $1 FOR UPDATE")
            .bind(tenant_id)
            .execute(&mut *tx)
            .await?;

        let fixed = sqlx::query_as::<_, Contract>(
            r#"
            UPDATE contracts c
            SET reserved_sessions = LEAST(r.open, c.remaining_sessions), updated_at = NOW()
            FROM (
                SELECT k.id, COUNT(s.id)::int AS open
                FROM contracts k
                LEFT JOIN schedules s ON s.contract_id = k.id AND s.status = ANY($2)
                WHERE k.tenant_id = $1
                GROUP BY k.id
            ) r
            WHERE c.id = r.id AND c.reserved_sessions <> LEAST(r.open, c.remaining_sessions)
            RETURNING c.*
            "#,
        )
        .bind(tenant_id)
        .bind(ScheduleStatus::RESERVING.to_vec())
        .fetch_all(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(fixed)
    }

    async fn decrement_session(
        &self,
        contract_id: Uuid,
        schedule_id: Uuid,
    ) -> Result<Contract, AppError> {
        let mut tx = self.pool.begin().await?;

        // 1. Registra o consumo. Se já existe, a sessão já foi debitada.
        let inserted = sqlx::query(
            r#"
            INSERT INTO session_consumptions (schedule_id, contract_id)
            VALUES ($1, $2)
            ON CONFLICT (schedule_id) DO NOTHING
            "#,
        )
        .bind(schedule_id)
        .bind(contract_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.is_foreign_key_violation() {
                    return AppError::PackageDepleted;
                }
            }
            e.into()
        })?
        .rows_affected();

        if inserted == 0 {
            tx.rollback().await?;
            return self
                .find_by_id(contract_id)
                .await?
                .ok_or(AppError::PackageDepleted);
        }

        // 2. Débito condicional. O status derivado muda na mesma instrução.
        let updated = sqlx::query_as::<_, Contract>(
            r#"
            UPDATE contracts
            SET remaining_sessions = remaining_sessions - 1,
                reserved_sessions = GREATEST(reserved_sessions - 1, 0),
                status = CASE
                    WHEN remaining_sessions - 1 = 0 THEN 'DEPLETED'::contract_status
                    ELSE status
                END,
                updated_at = NOW()
            WHERE id = $1 AND remaining_sessions > 0
            RETURNING *
            "#,
        )
        .bind(contract_id)
        .fetch_optional(&mut *tx)
        .await?;

        match updated {
            Some(contract) => {
                tx.commit().await?;
                Ok(contract)
            }
            None => {
                tx.rollback().await?;
                Err(AppError::PackageDepleted)
            }
        }
    }

    async fn update_status(
        &self,
        contract_id: Uuid,
        status: ContractStatus,
    ) -> Result<Option<Contract>, AppError> {
        let contract = sqlx::query_as::<_, Contract>(
            "UPDATE contracts SET status = $2, updated_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(contract_id)
        .bind(status)
        .fetch_optional(&self.pool)
        .await?;
        Ok(contract)
    }
}
