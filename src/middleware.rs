pub mod actor;
pub mod rbac;
pub mod tenancy;
pub mod timeout;
