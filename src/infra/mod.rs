//! Infrastructure adapters: durable storage backends and telemetry bootstrap.

pub mod error;
pub mod storage;
pub mod telemetry;
