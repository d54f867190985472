// src/models/workout.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

// Exercício planejado para uma sessão
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PlannedExercise {
    pub id: Uuid,
    pub client_id: Option<String>,
    pub schedule_id: Uuid,
    pub member_id: Uuid,
    pub exercise_id: Uuid,
    pub target_sets: i32,
    pub target_reps: i32,
    pub rest_seconds: Option<i32>,
    pub notes: Option<String>,
    pub position: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewPlannedExercise {
    pub client_id: Option<String>,
    pub schedule_id: Uuid,
    pub member_id: Uuid,
    pub exercise_id: Uuid,
    pub target_sets: i32,
    pub target_reps: i32,
    pub rest_seconds: Option<i32>,
    pub notes: Option<String>,
    pub position: i32,
}

// Série executada (documento próprio, referenciando o agendamento)
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SetLog {
    pub id: Uuid,
    pub client_id: Option<String>,
    pub planned_exercise_id: Uuid,
    pub schedule_id: Uuid,
    pub member_id: Uuid,
    pub exercise_id: Uuid,
    // Índice 1-based para exibição
    pub set_index: i32,
    pub weight: f64,
    pub reps: i32,
    pub remarks: Option<String>,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewSetLog {
    pub client_id: Option<String>,
    pub planned_exercise_id: Uuid,
    pub schedule_id: Uuid,
    pub member_id: Uuid,
    pub exercise_id: Uuid,
    pub set_index: i32,
    pub weight: f64,
    pub reps: i32,
    pub remarks: Option<String>,
    pub completed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PersonalBest {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub member_id: Uuid,
    pub exercise_id: Uuid,
    pub weight: f64,
    pub reps: i32,
    // Sessão em que o recorde foi alcançado
    pub schedule_id: Uuid,
    pub achieved_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Candidato a recorde vindo da conclusão de uma sessão.
#[derive(Debug, Clone, PartialEq)]
pub struct PersonalBestCandidate {
    pub tenant_id: Uuid,
    pub member_id: Uuid,
    pub exercise_id: Uuid,
    pub weight: f64,
    pub reps: i32,
    pub schedule_id: Uuid,
}
