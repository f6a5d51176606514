//! Storage Layer - SQLite-backed claim metadata persistence
//!
//! System of record is SQLite with tables:
//! - claim_dialects(id, dialect_uri, tenant_id)
//! - claims(id, dialect_id, claim_uri, tenant_id)
//! - claim_properties(id, claim_id, property_name, property_value, tenant_id)

pub mod claim;
pub mod connection;
pub mod dialect;
pub mod queries;
pub mod schema;
pub mod violation;

pub use claim::ClaimStore;
pub use connection::{ConnectionProvider, ManagedConnection, SqliteProvider, StoreOptions};
pub use dialect::DialectStore;
pub use violation::is_uniqueness_violation;
