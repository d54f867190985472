pub mod repository;
pub mod memory;
pub mod package_repo;
pub mod contract_repo;
pub mod schedule_repo;
pub mod workout_repo;

pub use memory::MemoryStore;
pub use package_repo::PgPackageRepository;
pub use contract_repo::PgContractRepository;
pub use schedule_repo::PgScheduleRepository;
pub use workout_repo::PgWorkoutRepository;
