//! Claim and claim property persistence

use std::collections::BTreeMap;
use std::sync::Arc;

use rusqlite::{params, Connection, OptionalExtension};
use tracing::Span;

use super::connection::{ConnectionProvider, ManagedConnection};
use super::dialect::{finish, reword};
use super::queries;
use super::violation::is_uniqueness_violation;
use crate::model::{Claim, ClaimId, ClaimProperties, TenantId};
use crate::{Error, Result};

const PROPERTY_BATCH_SAVEPOINT: &str = "claim_property_batch";

/// Tenant-scoped storage for claims and their properties.
///
/// Apart from [`remove_claim`](Self::remove_claim), operations run on a
/// caller-supplied connection and never commit, so a claim and its
/// properties can be written in one transaction.
pub struct ClaimStore {
    provider: Arc<dyn ConnectionProvider>,
    span: Span,
}

impl ClaimStore {
    pub fn new(provider: Arc<dyn ConnectionProvider>) -> Self {
        Self::with_span(provider, tracing::info_span!("claim_store"))
    }

    /// Construct with the span all of this store's events are recorded under
    pub fn with_span(provider: Arc<dyn ConnectionProvider>, span: Span) -> Self {
        Self { provider, span }
    }

    // ========== Claim Operations ==========

    /// All claims of a dialect, keyed by id
    pub fn get_claims(&self, conn: &Connection, dialect_uri: &str, tenant_id: TenantId) -> Result<BTreeMap<ClaimId, Claim>> {
        let _enter = self.span.enter();
        tracing::debug!(tenant_id, dialect_uri, "Listing claims");

        let message = || format!("Error while listing claims for dialect {}", dialect_uri);
        let mut stmt = conn
            .prepare_cached(queries::GET_CLAIMS_BY_DIALECT)
            .map_err(|e| Error::persistence(message(), e))?;

        let claims = stmt
            .query_map(params![dialect_uri, tenant_id, tenant_id], |row| {
                let id: ClaimId = row.get(queries::ID_COLUMN)?;
                let claim_uri: String = row.get(queries::CLAIM_URI_COLUMN)?;
                Ok((id, Claim::new(dialect_uri, claim_uri)))
            })
            .and_then(|rows| rows.collect::<rusqlite::Result<BTreeMap<_, _>>>())
            .map_err(|e| Error::persistence(message(), e))?;

        Ok(claims)
    }

    /// Insert a claim and return its generated id.
    ///
    /// A uniqueness violation for a claim that the follow-up lookup finds is
    /// reported as [`Error::DuplicateClaim`].
    pub fn add_claim(&self, conn: &Connection, dialect_uri: &str, claim_uri: &str, tenant_id: TenantId) -> Result<ClaimId> {
        let inserted = {
            let _enter = self.span.enter();
            tracing::debug!(tenant_id, dialect_uri, claim_uri, "Adding claim");
            conn.prepare_cached(queries::ADD_CLAIM)
                .and_then(|mut stmt| stmt.execute(params![dialect_uri, tenant_id, claim_uri, tenant_id]))
        };

        match inserted {
            Ok(_) => Ok(conn.last_insert_rowid()),
            Err(e) if is_uniqueness_violation(&e) && self.is_claim_persisted(conn, dialect_uri, claim_uri, tenant_id)? => {
                Err(Error::DuplicateClaim {
                    dialect_uri: dialect_uri.to_string(),
                    claim_uri: claim_uri.to_string(),
                    source: e,
                })
            }
            Err(e) => Err(Error::persistence(
                format!("Error while adding claim {} to dialect {}", claim_uri, dialect_uri),
                e,
            )),
        }
    }

    /// Resolve the id of an existing claim.
    ///
    /// Absence is an [`Error::InvalidClaimMapping`], since callers use this
    /// to resolve a required reference.
    pub fn get_claim_id(&self, conn: &Connection, dialect_uri: &str, claim_uri: &str, tenant_id: TenantId) -> Result<ClaimId> {
        self.find_claim_id(conn, dialect_uri, claim_uri, tenant_id)?
            .ok_or_else(|| Error::InvalidClaimMapping {
                dialect_uri: dialect_uri.to_string(),
                claim_uri: claim_uri.to_string(),
            })
    }

    fn find_claim_id(&self, conn: &Connection, dialect_uri: &str, claim_uri: &str, tenant_id: TenantId) -> Result<Option<ClaimId>> {
        let _enter = self.span.enter();
        tracing::debug!(tenant_id, dialect_uri, claim_uri, "Looking up claim id");

        conn.prepare_cached(queries::GET_CLAIM_ID)
            .and_then(|mut stmt| {
                stmt.query_row(params![dialect_uri, tenant_id, claim_uri, tenant_id], |row| {
                    row.get::<_, ClaimId>(queries::ID_COLUMN)
                })
                .optional()
            })
            .map(|id| id.filter(|id| *id > 0))
            .map_err(|e| {
                Error::persistence(
                    format!("Error while retrieving ID for claim {} in dialect {}", claim_uri, dialect_uri),
                    e,
                )
            })
    }

    fn is_claim_persisted(&self, conn: &Connection, dialect_uri: &str, claim_uri: &str, tenant_id: TenantId) -> Result<bool> {
        Ok(self.find_claim_id(conn, dialect_uri, claim_uri, tenant_id)?.is_some())
    }

    /// Delete a claim (and, by cascade, its properties) in a transaction of
    /// its own
    pub fn remove_claim(&self, dialect_uri: &str, claim_uri: &str, tenant_id: TenantId) -> Result<()> {
        let message = format!("Error while deleting claim {} from dialect {}", claim_uri, dialect_uri);
        let conn = ManagedConnection::acquire(&*self.provider, false).map_err(|e| reword(e, &message))?;

        let _enter = self.span.enter();
        tracing::debug!(tenant_id, dialect_uri, claim_uri, "Removing claim");

        let removed = conn
            .prepare_cached(queries::REMOVE_CLAIM)
            .and_then(|mut stmt| stmt.execute(params![dialect_uri, tenant_id, claim_uri, tenant_id]));
        finish(&conn, removed, message)
    }

    // ========== Property Operations ==========

    pub fn get_claim_properties(&self, conn: &Connection, claim_id: ClaimId, tenant_id: TenantId) -> Result<ClaimProperties> {
        let _enter = self.span.enter();
        tracing::debug!(tenant_id, claim_id, "Reading claim properties");

        let mut stmt = conn
            .prepare_cached(queries::GET_CLAIM_PROPERTIES)
            .map_err(|e| Error::persistence("Error while retrieving claim properties", e))?;

        let properties = stmt
            .query_map(params![claim_id, tenant_id], |row| {
                Ok((
                    row.get::<_, String>(queries::PROPERTY_NAME_COLUMN)?,
                    row.get::<_, String>(queries::PROPERTY_VALUE_COLUMN)?,
                ))
            })
            .and_then(|rows| rows.collect::<rusqlite::Result<ClaimProperties>>())
            .map_err(|e| Error::persistence("Error while retrieving claim properties", e))?;

        Ok(properties)
    }

    /// Write a batch of properties for a claim.
    ///
    /// No-op for a non-positive claim id or an empty set. The claim must
    /// belong to the tenant. A failing row undoes the whole batch; the
    /// caller's transaction stays open.
    pub fn add_claim_properties(&self, conn: &Connection, claim_id: ClaimId, properties: &ClaimProperties, tenant_id: TenantId) -> Result<()> {
        if claim_id <= 0 || properties.is_empty() {
            return Ok(());
        }

        let _enter = self.span.enter();
        tracing::debug!(tenant_id, claim_id, count = properties.len(), "Adding claim properties");

        let batch = || -> Result<()> {
            let mut stmt = conn
                .prepare_cached(queries::ADD_CLAIM_PROPERTY)
                .map_err(|e| Error::persistence("Error while adding claim properties", e))?;
            for (name, value) in properties {
                let inserted = stmt
                    .execute(params![claim_id, name, value, tenant_id])
                    .map_err(|e| Error::persistence("Error while adding claim properties", e))?;
                if inserted == 0 {
                    return Err(Error::persistence_msg(format!(
                        "Claim {} does not exist for tenant {}",
                        claim_id, tenant_id
                    )));
                }
            }
            Ok(())
        };

        conn.execute_batch(&format!("SAVEPOINT {}", PROPERTY_BATCH_SAVEPOINT))
            .map_err(|e| Error::persistence("Error while adding claim properties", e))?;

        match batch() {
            Ok(()) => conn
                .execute_batch(&format!("RELEASE {}", PROPERTY_BATCH_SAVEPOINT))
                .map_err(|e| Error::persistence("Error while adding claim properties", e)),
            Err(e) => {
                let undo = format!(
                    "ROLLBACK TO {0}; RELEASE {0}",
                    PROPERTY_BATCH_SAVEPOINT
                );
                if let Err(undo_err) = conn.execute_batch(&undo) {
                    tracing::warn!("Failed to undo claim property batch: {}", undo_err);
                }
                Err(e)
            }
        }
    }

    /// Remove every property of a claim
    pub(crate) fn delete_claim_properties(&self, conn: &Connection, claim_id: ClaimId, tenant_id: TenantId) -> Result<()> {
        let _enter = self.span.enter();
        tracing::debug!(tenant_id, claim_id, "Deleting claim properties");

        conn.prepare_cached(queries::DELETE_CLAIM_PROPERTY)
            .and_then(|mut stmt| stmt.execute(params![claim_id, tenant_id]))
            .map_err(|e| Error::persistence("Error while deleting claim properties", e))?;
        Ok(())
    }

    /// Replace the full property set of a claim
    pub fn update_claim_properties(&self, conn: &Connection, claim_id: ClaimId, properties: &ClaimProperties, tenant_id: TenantId) -> Result<()> {
        self.delete_claim_properties(conn, claim_id, tenant_id)?;
        self.add_claim_properties(conn, claim_id, properties, tenant_id)
    }
}
