pub mod package_service;
pub mod contract_service;
pub mod session_service;
pub mod reconciliation_service;
pub mod workout_service;

pub use package_service::PackageService;
pub use contract_service::ContractService;
pub use session_service::SessionService;
pub use reconciliation_service::ReconciliationService;
pub use workout_service::WorkoutService;
