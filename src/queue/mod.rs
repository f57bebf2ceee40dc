//! Durable job queue (C6, §4.6): SQLite-backed, at-most-one-active-lease
//! execution semantics via a lease/heartbeat/sweep cycle.

pub mod model;
pub mod sqlite;
pub mod worker;

pub use model::{Job, JobData, JobResultData, JobState, JOB_NAME};
pub use sqlite::JobQueue;
pub use worker::run_worker_loop;
