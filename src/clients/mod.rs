//! Per-worker client implementations.

mod worker;
pub use worker::{Pipeline, WorkerClient};
