//! `SeaORM` implementation of the invoicing store.

use std::sync::Arc;

use chrono::{DateTime, FixedOffset, Utc};
use pratica_core::invoicing::RepositoryError;
use sea_orm::{DatabaseConnection, DbErr, SqlErr};

/// Database-backed store for praticas, invoices, line items, audit entries
/// and invoice rules.
#[derive(Debug, Clone)]
pub struct SeaOrmInvoicingStore {
    pub(crate) db: Arc<DatabaseConnection>,
}

impl SeaOrmInvoicingStore {
    /// Create a new store over a connection pool, owned or shared.
    #[must_use]
    pub fn new(db: impl Into<Arc<DatabaseConnection>>) -> Self {
        Self { db: db.into() }
    }
}

pub(crate) fn db_err(err: DbErr) -> RepositoryError {
    RepositoryError::Database(err.to_string())
}

/// True when the insert lost against a unique constraint.
pub(crate) fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

/// A stored value that no longer maps onto the domain model.
pub(crate) fn corrupt(table: &str, column: &str, value: impl std::fmt::Display) -> RepositoryError {
    RepositoryError::Database(format!("{table}.{column} holds an invalid value: {value}"))
}

pub(crate) fn to_utc(at: DateTime<FixedOffset>) -> DateTime<Utc> {
    at.with_timezone(&Utc)
}
