//! Photo gallery service: validate and enhance uploaded images, store them in
//! an object-storage bucket, serve them back, and report synthetic readiness.

pub mod config;
pub mod errors;
pub mod handlers;
pub mod metrics;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
