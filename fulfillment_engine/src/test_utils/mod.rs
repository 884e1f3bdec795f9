//! Helpers for integration tests and the cucumber suite. Each test gets its own throwaway SQLite file.
pub mod fixtures;
pub mod prepare_env;
