//! # Fulfillment server
//! This crate hosts the HTTP surface of the fulfillment engine. It is responsible for:
//! * Verifying the caller identity forwarded by the identity provider, and enforcing which roles may call each route.
//! * Translating requests into engine API calls, and engine errors into HTTP status codes.
//! * Running the background workers: the confirmation timeout sweep and the optional assignment repair job.
//! * Forwarding engine events to the notification dispatcher.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
//!
//! ## Routes
//! `/health` is open. Everything else lives under `/api` and needs the `X-Actor-*` identity headers. See
//! [routes](routes/index.html) for the full list and the roles each route accepts.

pub mod cli;
pub mod config;
pub mod data_objects;
pub mod errors;
pub mod helpers;
pub mod middleware;
pub mod notifications;
pub mod routes;
pub mod server;
pub mod workers;

#[cfg(test)]
mod endpoint_tests;
