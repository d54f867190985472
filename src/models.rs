pub mod pt;
pub mod workout;
