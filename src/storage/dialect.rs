//! Claim dialect persistence

use std::sync::Arc;

use rusqlite::{params, Connection};
use tracing::Span;

use super::connection::{ConnectionProvider, ManagedConnection};
use super::queries;
use super::violation::is_uniqueness_violation;
use crate::model::{ClaimDialect, TenantId};
use crate::{Error, Result};

/// Tenant-scoped storage for claim dialects.
///
/// Every mutating operation owns its connection and transaction.
pub struct DialectStore {
    provider: Arc<dyn ConnectionProvider>,
    span: Span,
}

impl DialectStore {
    pub fn new(provider: Arc<dyn ConnectionProvider>) -> Self {
        Self::with_span(provider, tracing::info_span!("dialect_store"))
    }

    /// Construct with the span all of this store's events are recorded under
    pub fn with_span(provider: Arc<dyn ConnectionProvider>, span: Span) -> Self {
        Self { provider, span }
    }

    /// List the dialects of a tenant on a connection of its own
    pub fn list_dialects(&self, tenant_id: TenantId) -> Result<Vec<ClaimDialect>> {
        let conn = ManagedConnection::acquire(&*self.provider, true)
            .map_err(|e| reword(e, "Error while listing claim dialects"))?;
        self.list_dialects_in(&conn, tenant_id)
    }

    /// List the dialects of a tenant inside the caller's transaction
    pub fn list_dialects_in(&self, conn: &Connection, tenant_id: TenantId) -> Result<Vec<ClaimDialect>> {
        let _enter = self.span.enter();
        tracing::debug!(tenant_id, "Listing claim dialects");

        let mut stmt = conn
            .prepare_cached(queries::GET_CLAIM_DIALECTS)
            .map_err(|e| Error::persistence("Error while listing claim dialects", e))?;

        let dialects = stmt
            .query_map([tenant_id], |row| {
                row.get::<_, String>(queries::DIALECT_URI_COLUMN).map(ClaimDialect::new)
            })
            .and_then(|rows| rows.collect::<rusqlite::Result<Vec<_>>>())
            .map_err(|e| Error::persistence("Error while listing claim dialects", e))?;

        Ok(dialects)
    }

    /// Add a dialect.
    ///
    /// A uniqueness violation for a dialect that turns out to be present
    /// already (a concurrent add won the race) is treated as success.
    pub fn add_dialect(&self, dialect: &ClaimDialect, tenant_id: TenantId) -> Result<()> {
        let dialect_uri = dialect.dialect_uri.as_str();
        let conn = ManagedConnection::acquire(&*self.provider, false)
            .map_err(|e| reword(e, format!("Error while adding claim dialect {}", dialect_uri)))?;

        let inserted = {
            let _enter = self.span.enter();
            tracing::debug!(tenant_id, dialect_uri, "Adding claim dialect");
            conn.prepare_cached(queries::ADD_CLAIM_DIALECT)
                .and_then(|mut stmt| stmt.execute(params![dialect_uri, tenant_id]))
        };

        match inserted {
            Ok(_) => conn.commit(),
            Err(e) if is_uniqueness_violation(&e) => self.reconcile_duplicate(&conn, dialect_uri, tenant_id),
            Err(e) => {
                conn.rollback();
                Err(Error::persistence(format!("Error while adding claim dialect {}", dialect_uri), e))
            }
        }
    }

    /// Decide whether a uniqueness violation on add was a benign duplicate
    fn reconcile_duplicate(&self, conn: &ManagedConnection<'_>, dialect_uri: &str, tenant_id: TenantId) -> Result<()> {
        let exists = self
            .list_dialects_in(conn, tenant_id)?
            .iter()
            .any(|d| d.dialect_uri == dialect_uri);

        let _enter = self.span.enter();
        conn.rollback();
        if exists {
            tracing::warn!(tenant_id, "Claim dialect URI {} is already persisted.", dialect_uri);
            Ok(())
        } else {
            Err(Error::persistence_msg(format!("Error while adding claim dialect {}", dialect_uri)))
        }
    }

    /// Change the URI of a dialect. A collision with another dialect is a
    /// plain persistence failure.
    pub fn rename_dialect(&self, old: &ClaimDialect, new: &ClaimDialect, tenant_id: TenantId) -> Result<()> {
        let message = format!("Error while renaming claim dialect {}", old.dialect_uri);
        let conn = ManagedConnection::acquire(&*self.provider, false).map_err(|e| reword(e, &message))?;

        let _enter = self.span.enter();
        tracing::debug!(tenant_id, from = %old.dialect_uri, to = %new.dialect_uri, "Renaming claim dialect");

        let updated = conn
            .prepare_cached(queries::UPDATE_CLAIM_DIALECT)
            .and_then(|mut stmt| stmt.execute(params![new.dialect_uri, old.dialect_uri, tenant_id]));
        finish(&conn, updated, message)
    }

    pub fn remove_dialect(&self, dialect: &ClaimDialect, tenant_id: TenantId) -> Result<()> {
        let message = format!("Error while deleting claim dialect {}", dialect.dialect_uri);
        let conn = ManagedConnection::acquire(&*self.provider, false).map_err(|e| reword(e, &message))?;

        let _enter = self.span.enter();
        tracing::debug!(tenant_id, dialect_uri = %dialect.dialect_uri, "Removing claim dialect");

        let removed = conn
            .prepare_cached(queries::REMOVE_CLAIM_DIALECT)
            .and_then(|mut stmt| stmt.execute(params![dialect.dialect_uri, tenant_id]));
        finish(&conn, removed, message)
    }
}

/// Commit on success, roll back and report on failure
pub(crate) fn finish(conn: &ManagedConnection<'_>, outcome: rusqlite::Result<usize>, message: String) -> Result<()> {
    match outcome {
        Ok(_) => conn.commit(),
        Err(e) => {
            conn.rollback();
            Err(Error::persistence(message, e))
        }
    }
}

/// Give an acquisition failure the message of the operation that needed it
pub(crate) fn reword(err: Error, message: impl Into<String>) -> Error {
    match err {
        Error::Persistence { source, .. } => Error::Persistence {
            message: message.into(),
            source,
        },
        other => other,
    }
}
