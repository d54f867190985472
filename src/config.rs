// src/config.rs

use std::{env, str::FromStr, sync::Arc, time::Duration};

use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::{
    db::{
        MemoryStore, PgContractRepository, PgPackageRepository, PgScheduleRepository,
        PgWorkoutRepository,
    },
    services::{
        ContractService, PackageService, ReconciliationService, SessionService, WorkoutService,
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Postgres,
    Memory,
}

impl FromStr for StorageBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(StorageBackend::Postgres),
            "memory" => Ok(StorageBackend::Memory),
            other => anyhow::bail!("STORAGE_BACKEND inválido: '{}' (use postgres ou memory)", other),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub storage: StorageBackend,
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub db_acquire_timeout: Duration,
    pub bind_addr: String,
    pub request_timeout: Duration,
    pub pb_detection_enabled: bool,
}

// Lê uma variável opcional, convertendo com contexto no erro
fn var_or<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("valor inválido para {}: '{}'", key, raw)),
        Err(_) => Ok(default),
    }
}

impl Settings {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let storage = match env::var("STORAGE_BACKEND") {
            Ok(raw) => raw.parse::<StorageBackend>()?,
            Err(_) => StorageBackend::Postgres,
        };

        let database_url = env::var("DATABASE_URL").ok();
        if storage == StorageBackend::Postgres && database_url.is_none() {
            anyhow::bail!("DATABASE_URL deve ser definida quando STORAGE_BACKEND=postgres");
        }

        Ok(Self {
            storage,
            database_url,
            db_max_connections: var_or("DB_MAX_CONNECTIONS", 5)?,
            db_acquire_timeout: Duration::from_secs(var_or("DB_ACQUIRE_TIMEOUT_SECS", 3)?),
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string()),
            request_timeout: Duration::from_secs(var_or("REQUEST_TIMEOUT_SECS", 10)?),
            pb_detection_enabled: var_or("PB_DETECTION_ENABLED", true)?,
        })
    }

    #[cfg(test)]
    pub fn in_memory() -> Self {
        Self {
            storage: StorageBackend::Memory,
            database_url: None,
            db_max_connections: 5,
            db_acquire_timeout: Duration::from_secs(3),
            bind_addr: "127.0.0.1:0".to_string(),
            request_timeout: Duration::from_secs(10),
            pb_detection_enabled: true,
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub db_pool: Option<PgPool>,
    pub request_timeout: Duration,
    pub package_service: PackageService,
    pub contract_service: ContractService,
    pub session_service: SessionService,
    pub reconciliation_service: ReconciliationService,
    pub workout_service: WorkoutService,
}

impl AppState {
    pub async fn new(settings: &Settings) -> anyhow::Result<Self> {
        match settings.storage {
            StorageBackend::Memory => {
                tracing::warn!("⚠️ Usando armazenamento em memória: os dados somem ao reiniciar");
                Ok(Self::with_memory_store(settings, MemoryStore::new()))
            }
            StorageBackend::Postgres => {
                let database_url = settings
                    .database_url
                    .as_deref()
                    .context("DATABASE_URL deve ser definida")?;

                let db_pool = PgPoolOptions::new()
                    .max_connections(settings.db_max_connections)
                    .acquire_timeout(settings.db_acquire_timeout)
                    .connect(database_url)
                    .await
                    .context("Falha ao conectar ao banco de dados")?;

                tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");
                Ok(Self::with_pool(settings, db_pool))
            }
        }
    }

    fn with_pool(settings: &Settings, db_pool: PgPool) -> Self {
        // --- Monta o gráfico de dependências ---
        let packages = Arc::new(PgPackageRepository::new(db_pool.clone()));
        let contracts = Arc::new(PgContractRepository::new(db_pool.clone()));
        let schedules = Arc::new(PgScheduleRepository::new(db_pool.clone()));
        let workouts = Arc::new(PgWorkoutRepository::new(db_pool.clone()));

        let contract_service = ContractService::new(contracts, packages.clone());
        Self {
            db_pool: Some(db_pool),
            request_timeout: settings.request_timeout,
            package_service: PackageService::new(packages),
            session_service: SessionService::new(
                contract_service.clone(),
                schedules.clone(),
                workouts.clone(),
                workouts.clone(),
                workouts.clone(),
                settings.pb_detection_enabled,
            ),
            reconciliation_service: ReconciliationService::new(
                contract_service.clone(),
                schedules.clone(),
            ),
            workout_service: WorkoutService::new(
                schedules,
                workouts.clone(),
                workouts.clone(),
                workouts,
            ),
            contract_service,
        }
    }

    pub fn with_memory_store(settings: &Settings, store: MemoryStore) -> Self {
        let store = Arc::new(store);
        let contract_service = ContractService::new(store.clone(), store.clone());
        Self {
            db_pool: None,
            request_timeout: settings.request_timeout,
            package_service: PackageService::new(store.clone()),
            session_service: SessionService::new(
                contract_service.clone(),
                store.clone(),
                store.clone(),
                store.clone(),
                store.clone(),
                settings.pb_detection_enabled,
            ),
            reconciliation_service: ReconciliationService::new(
                contract_service.clone(),
                store.clone(),
            ),
            workout_service: WorkoutService::new(
                store.clone(),
                store.clone(),
                store.clone(),
                store,
            ),
            contract_service,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("postgres", StorageBackend::Postgres)]
    #[case("PostgreSQL", StorageBackend::Postgres)]
    #[case(" memory ", StorageBackend::Memory)]
    fn parses_storage_backend(#[case] raw: &str, #[case] expected: StorageBackend) {
        assert_eq!(raw.parse::<StorageBackend>().unwrap(), expected);
    }

    #[test]
    fn rejects_unknown_backend() {
        assert!("sqlite".parse::<StorageBackend>().is_err());
    }
}
