//! Durable decision log backed by PostgreSQL.

mod postgres;

pub use postgres::{DatabasePool, PostgresDecisionLog, StorageError};
