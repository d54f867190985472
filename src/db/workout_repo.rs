// src/db/workout_repo.rs

// Registros de treino: exercícios planejados, séries executadas e recordes.

use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::repository::{PersonalBestRepository, PlannedExerciseRepository, SetLogRepository},
    models::workout::{
        NewPlannedExercise, NewSetLog, PersonalBest, PersonalBestCandidate, PlannedExercise,
        SetLog,
    },
};

#[derive(Clone)]
pub struct PgWorkoutRepository {
    pool: PgPool,
}

impl PgWorkoutRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

// =========================================================================
//  SÉRIES EXECUTADAS
// =========================================================================

#[async_trait::async_trait]
impl SetLogRepository for PgWorkoutRepository {
    async fn create(&self, new: NewSetLog) -> Result<SetLog, AppError> {
        let log = sqlx::query_as::<_, SetLog>(
            r#"
            INSERT INTO set_logs (
                client_id, planned_exercise_id, schedule_id, member_id, exercise_id,
                set_index, weight, reps, remarks, completed
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING *
            "#,
        )
        .bind(&new.client_id)
        .bind(new.planned_exercise_id)
        .bind(new.schedule_id)
        .bind(new.member_id)
        .bind(new.exercise_id)
        .bind(new.set_index)
        .bind(new.weight)
        .bind(new.reps)
        .bind(&new.remarks)
        .bind(new.completed)
        .fetch_one(&self.pool)
        .await?;
        Ok(log)
    }

    async fn find_by_schedule(&self, schedule_id: Uuid) -> Result<Vec<SetLog>, AppError> {
        let logs = sqlx::query_as::<_, SetLog>(
            r#"
            SELECT * FROM set_logs
            WHERE schedule_id = $1
            ORDER BY planned_exercise_id, set_index
            "#,
        )
        .bind(schedule_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(logs)
    }

    async fn delete_by_schedule(&self, schedule_id: Uuid) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM set_logs WHERE schedule_id = $1")
            .bind(schedule_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

// =========================================================================
//  EXERCÍCIOS PLANEJADOS
// =========================================================================

#[async_trait::async_trait]
impl PlannedExerciseRepository for PgWorkoutRepository {
    async fn create(&self, new: NewPlannedExercise) -> Result<PlannedExercise, AppError> {
        let planned = sqlx::query_as::<_, PlannedExercise>(
            r#"
            INSERT INTO planned_exercises (
                client_id, schedule_id, member_id, exercise_id,
                target_sets, target_reps, rest_seconds, notes, position
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(&new.client_id)
        .bind(new.schedule_id)
        .bind(new.member_id)
        .bind(new.exercise_id)
        .bind(new.target_sets)
        .bind(new.target_reps)
        .bind(new.rest_seconds)
        .bind(&new.notes)
        .bind(new.position)
        .fetch_one(&self.pool)
        .await?;
        Ok(planned)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<PlannedExercise>, AppError> {
        let planned =
            sqlx::query_as::<_, PlannedExercise>("SELECT * FROM planned_exercises WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(planned)
    }

    async fn list_by_schedule(&self, schedule_id: Uuid) -> Result<Vec<PlannedExercise>, AppError> {
        let planned = sqlx::query_as::<_, PlannedExercise>(
            "SELECT * FROM planned_exercises WHERE schedule_id = $1 ORDER BY position",
        )
        .bind(schedule_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(planned)
    }

    async fn delete_by_schedule(&self, schedule_id: Uuid) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM planned_exercises WHERE schedule_id = $1")
            .bind(schedule_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

// =========================================================================
//  RECORDES PESSOAIS
// =========================================================================

#[async_trait::async_trait]
impl PersonalBestRepository for PgWorkoutRepository {
    async fn upsert(&self, candidate: PersonalBestCandidate) -> Result<bool, AppError> {
        // O WHERE do DO UPDATE garante que o recorde nunca diminui
        let written = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO personal_bests (tenant_id, member_id, exercise_id, weight, reps, schedule_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT ON CONSTRAINT personal_bests_member_exercise DO UPDATE
            SET weight = EXCLUDED.weight,
                reps = EXCLUDED.reps,
                schedule_id = EXCLUDED.schedule_id,
                achieved_at = NOW(),
                updated_at = NOW()
            WHERE personal_bests.weight < EXCLUDED.weight
            RETURNING id
            "#,
        )
        .bind(candidate.tenant_id)
        .bind(candidate.member_id)
        .bind(candidate.exercise_id)
        .bind(candidate.weight)
        .bind(candidate.reps)
        .bind(candidate.schedule_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(written.is_some())
    }

    async fn list_by_member(
        &self,
        tenant_id: Uuid,
        member_id: Uuid,
    ) -> Result<Vec<PersonalBest>, AppError> {
        let pbs = sqlx::query_as::<_, PersonalBest>(
            "SELECT * FROM personal_bests WHERE tenant_id = $1 AND member_id = $2 ORDER BY exercise_id",
        )
        .bind(tenant_id)
        .bind(member_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(pbs)
    }
}
