pub mod contracts;
pub mod packages;
pub mod schedules;
pub mod workouts;
