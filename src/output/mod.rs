//! Output module for reporting on harvested data

pub mod stats;

pub use stats::{format_statistics, load_statistics, print_statistics, StoreStatistics};
