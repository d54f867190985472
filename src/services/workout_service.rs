// src/services/workout_service.rs

use std::sync::Arc;

use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::repository::{
        PersonalBestRepository, PlannedExerciseRepository, ScheduleRepository, SetLogRepository,
    },
    models::{
        pt::{Actor, ActorRole, Schedule},
        workout::{NewPlannedExercise, NewSetLog, PersonalBest, PlannedExercise, SetLog},
    },
    services::session_service::resolve_schedule,
};

/// Exercício a incluir no plano da sessão.
#[derive(Debug, Clone)]
pub struct PlanExercise {
    pub client_id: Option<String>,
    pub exercise_id: Uuid,
    pub target_sets: i32,
    pub target_reps: i32,
    pub rest_seconds: Option<i32>,
    pub notes: Option<String>,
    pub position: i32,
}

/// Série executada que o coach registra durante a sessão.
#[derive(Debug, Clone)]
pub struct LogSet {
    pub client_id: Option<String>,
    pub planned_exercise_id: Uuid,
    pub set_index: i32,
    pub weight: f64,
    pub reps: i32,
    pub remarks: Option<String>,
    pub completed: bool,
}

#[derive(Clone)]
pub struct WorkoutService {
    schedules: Arc<dyn ScheduleRepository>,
    planned_exercises: Arc<dyn PlannedExerciseRepository>,
    set_logs: Arc<dyn SetLogRepository>,
    personal_bests: Arc<dyn PersonalBestRepository>,
}

impl WorkoutService {
    pub fn new(
        schedules: Arc<dyn ScheduleRepository>,
        planned_exercises: Arc<dyn PlannedExerciseRepository>,
        set_logs: Arc<dyn SetLogRepository>,
        personal_bests: Arc<dyn PersonalBestRepository>,
    ) -> Self {
        Self {
            schedules,
            planned_exercises,
            set_logs,
            personal_bests,
        }
    }

    // Registros só entram em sessões abertas do próprio coach
    async fn open_schedule_of(&self, actor: &Actor, key: &str) -> Result<Schedule, AppError> {
        let schedule = resolve_schedule(self.schedules.as_ref(), actor.tenant_id, key).await?;
        if actor.role != ActorRole::Coach || schedule.coach_id != actor.actor_id {
            return Err(AppError::Forbidden);
        }
        if !schedule.status.holds_reservation() {
            return Err(AppError::InvalidRequest(format!(
                "a sessão está '{}' e não aceita novos registros",
                schedule.status
            )));
        }
        Ok(schedule)
    }

    pub async fn add_planned_exercise(
        &self,
        actor: &Actor,
        key: &str,
        plan: PlanExercise,
    ) -> Result<PlannedExercise, AppError> {
        if plan.target_sets <= 0 || plan.target_reps <= 0 {
            return Err(AppError::InvalidRequest(
                "séries e repetições devem ser positivas".into(),
            ));
        }
        let schedule = self.open_schedule_of(actor, key).await?;

        self.planned_exercises
            .create(NewPlannedExercise {
                client_id: plan.client_id,
                schedule_id: schedule.id,
                member_id: schedule.member_id,
                exercise_id: plan.exercise_id,
                target_sets: plan.target_sets,
                target_reps: plan.target_reps,
                rest_seconds: plan.rest_seconds,
                notes: plan.notes,
                position: plan.position,
            })
            .await
    }

    pub async fn list_planned_exercises(
        &self,
        tenant_id: Uuid,
        key: &str,
    ) -> Result<Vec<PlannedExercise>, AppError> {
        let schedule = resolve_schedule(self.schedules.as_ref(), tenant_id, key).await?;
        self.planned_exercises.list_by_schedule(schedule.id).await
    }

    pub async fn log_set(&self, actor: &Actor, key: &str, set: LogSet) -> Result<SetLog, AppError> {
        if set.weight < 0.0 || set.reps < 0 || set.set_index < 1 {
            return Err(AppError::InvalidRequest(
                "peso e repetições não podem ser negativos; set_index começa em 1".into(),
            ));
        }
        let schedule = self.open_schedule_of(actor, key).await?;

        let planned = self
            .planned_exercises
            .find_by_id(set.planned_exercise_id)
            .await?
            .filter(|p| p.schedule_id == schedule.id)
            .ok_or_else(|| {
                AppError::InvalidRequest("exercício planejado não pertence a esta sessão".into())
            })?;

        self.set_logs
            .create(NewSetLog {
                client_id: set.client_id,
                planned_exercise_id: planned.id,
                schedule_id: schedule.id,
                member_id: schedule.member_id,
                exercise_id: planned.exercise_id,
                set_index: set.set_index,
                weight: set.weight,
                reps: set.reps,
                remarks: set.remarks,
                completed: set.completed,
            })
            .await
    }

    pub async fn list_set_logs(&self, tenant_id: Uuid, key: &str) -> Result<Vec<SetLog>, AppError> {
        let schedule = resolve_schedule(self.schedules.as_ref(), tenant_id, key).await?;
        self.set_logs.find_by_schedule(schedule.id).await
    }

    /// Recordes do aluno dentro do tenant de quem pergunta.
    pub async fn list_personal_bests(
        &self,
        tenant_id: Uuid,
        member_id: Uuid,
    ) -> Result<Vec<PersonalBest>, AppError> {
        self.personal_bests.list_by_member(tenant_id, member_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        db::{repository::ContractRepository, MemoryStore},
        models::{
            pt::{NewContract, NewSchedule, ScheduleStatus},
            workout::PersonalBestCandidate,
        },
    };
    use chrono::{Duration, Utc};
    use rust_decimal::Decimal;

    struct Fixture {
        store: Arc<MemoryStore>,
        svc: WorkoutService,
        schedule: Schedule,
        coach: Actor,
    }

    async fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let tenant_id = Uuid::new_v4();
        let coach_id = Uuid::new_v4();
        let contract = ContractRepository::create(
            store.as_ref(),
            NewContract {
                tenant_id,
                branch_id: Uuid::new_v4(),
                package_id: Uuid::new_v4(),
                member_id: Uuid::new_v4(),
                coach_id,
                total_sessions: 10,
                price: Decimal::ONE,
            },
        )
        .await
        .unwrap();
        let start = Utc::now();
        let schedule = store
            .create_reserving(NewSchedule {
                tenant_id,
                branch_id: contract.branch_id,
                contract_id: contract.id,
                coach_id,
                member_id: contract.member_id,
                client_id: None,
                start_time: start,
                end_time: start + Duration::hours(1),
                session_goal: None,
                remarks: None,
            })
            .await
            .unwrap()
            .unwrap();

        Fixture {
            svc: WorkoutService::new(store.clone(), store.clone(), store.clone(), store.clone()),
            store,
            schedule,
            coach: Actor {
                tenant_id,
                actor_id: coach_id,
                role: ActorRole::Coach,
            },
        }
    }

    fn plan() -> PlanExercise {
        PlanExercise {
            client_id: None,
            exercise_id: Uuid::new_v4(),
            target_sets: 3,
            target_reps: 8,
            rest_seconds: Some(120),
            notes: None,
            position: 0,
        }
    }

    fn set(planned_exercise_id: Uuid, weight: f64) -> LogSet {
        LogSet {
            client_id: None,
            planned_exercise_id,
            set_index: 1,
            weight,
            reps: 8,
            remarks: None,
            completed: true,
        }
    }

    #[tokio::test]
    async fn logs_sets_against_planned_exercise() {
        let f = fixture().await;
        let key = f.schedule.id.to_string();
        let planned = f.svc.add_planned_exercise(&f.coach, &key, plan()).await.unwrap();

        let log = f.svc.log_set(&f.coach, &key, set(planned.id, 60.0)).await.unwrap();
        assert_eq!(log.exercise_id, planned.exercise_id);
        assert_eq!(log.member_id, f.schedule.member_id);

        let tenant = f.coach.tenant_id;
        assert_eq!(f.svc.list_set_logs(tenant, &key).await.unwrap().len(), 1);
        assert_eq!(f.svc.list_planned_exercises(tenant, &key).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn rejects_planned_exercise_of_another_session() {
        let f = fixture().await;
        let err = f
            .svc
            .log_set(&f.coach, &f.schedule.id.to_string(), set(Uuid::new_v4(), 60.0))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn only_owning_coach_writes() {
        let f = fixture().await;
        let other = Actor {
            actor_id: Uuid::new_v4(),
            ..f.coach
        };
        let err = f
            .svc
            .add_planned_exercise(&other, &f.schedule.id.to_string(), plan())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden));
    }

    #[tokio::test]
    async fn closed_session_accepts_no_logs() {
        let f = fixture().await;
        f.store
            .update_status_if(f.schedule.id, &[ScheduleStatus::Scheduled], ScheduleStatus::Cancelled)
            .await
            .unwrap();

        let err = f
            .svc
            .add_planned_exercise(&f.coach, &f.schedule.id.to_string(), plan())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn personal_bests_stay_inside_the_tenant() {
        let f = fixture().await;
        let member_id = f.schedule.member_id;
        f.store
            .upsert(PersonalBestCandidate {
                tenant_id: f.coach.tenant_id,
                member_id,
                exercise_id: Uuid::new_v4(),
                weight: 100.0,
                reps: 5,
                schedule_id: f.schedule.id,
            })
            .await
            .unwrap();

        let own = f.svc.list_personal_bests(f.coach.tenant_id, member_id).await.unwrap();
        assert_eq!(own.len(), 1);
        assert_eq!(own[0].tenant_id, f.coach.tenant_id);

        let foreign = f.svc.list_personal_bests(Uuid::new_v4(), member_id).await.unwrap();
        assert!(foreign.is_empty());
    }
}
