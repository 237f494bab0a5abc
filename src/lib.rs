//! A per-worker Redis client for request-processing pipelines.
//!
//! Each worker execution context owns a [`WorkerClient`] holding exactly one
//! connection. Commands retry once, and only once, when the peer closes the
//! stream. Explicit pipelining ([`WorkerClient::begin_pipeline`]) decouples
//! command submission from reply collection.
//!
//! The major components are:
//! * `config`: immutable configuration snapshots and the [`Registry`] that
//!   publishes them to concurrent workers.
//! * `clients`: the per-worker client and its pipeline driver.
//! * `frame`: represents a single Redis protocol frame.
//! * `workspace`: request-scoped scratch space for reply text.

#![warn(clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]

pub mod clients;
pub use clients::{Pipeline, WorkerClient};

pub mod cmd;
pub use cmd::Command;

pub mod config;
pub use config::{initialize, Config, Registry};

mod connection;
pub use connection::Connection;

mod error;
pub use error::Error;

pub mod frame;
pub use frame::Frame;

pub mod workspace;
pub use workspace::Workspace;

use std::time::Duration;

/// Default port that a redis server listens on.
pub const DEFAULT_PORT: u16 = 6379;

/// Default bound on connect and per-command I/O.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(200);

pub type Result<T> = std::result::Result<T, Error>;
