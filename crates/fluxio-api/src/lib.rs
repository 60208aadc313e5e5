//! Fluxio API Library
//!
//! The HTTP surface of the orchestrator: batch task submission, path
//! validation, session status polling, and upload staging, served by axum
//! over the capability routers (object storage, queue, task table).

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod services;
pub mod setup;
pub mod state;
pub mod telemetry;
