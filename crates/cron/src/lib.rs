//! Daily scheduling of notification dispatch runs.
//!
//! [`DailySchedule`] computes when the next run is due in a given timezone;
//! [`NotificationScheduler`] sleeps until then, calls the dispatch callback,
//! and keeps the last run's outcome for status queries.

pub mod schedule;
pub mod service;

pub use {
    schedule::DailySchedule,
    service::{DispatchFn, NotificationScheduler, RunRecord, RunTrigger, SchedulerStatus},
};
