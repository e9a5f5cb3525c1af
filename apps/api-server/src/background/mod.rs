//! Background jobs.

pub mod scheduler;

pub use scheduler::{Scheduler, SchedulerConfig, start_orphan_sweep};
