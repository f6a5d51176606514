//! Query catalog
//!
//! Every statement the stores run, with positional parameters. Claim rows
//! point at their dialect by id, so claim statements resolve the dialect with
//! a `(dialect_uri, tenant_id)` sub-select and qualify the claim row with the
//! tenant a second time.

pub const ID_COLUMN: &str = "id";
pub const DIALECT_URI_COLUMN: &str = "dialect_uri";
pub const CLAIM_URI_COLUMN: &str = "claim_uri";
pub const PROPERTY_NAME_COLUMN: &str = "property_name";
pub const PROPERTY_VALUE_COLUMN: &str = "property_value";

/// Numeric code some engines attach to a generic failure instead of
/// reporting a categorized constraint violation (SQL Server uses 2627).
pub const UNIQUE_CONSTRAINT_VIOLATION_ERROR_CODE: i32 = 2627;

// ========== Dialects ==========

/// ?1 tenant_id
pub const GET_CLAIM_DIALECTS: &str =
    "SELECT dialect_uri FROM claim_dialects WHERE tenant_id = ?1 ORDER BY id";

/// ?1 dialect_uri, ?2 tenant_id
pub const ADD_CLAIM_DIALECT: &str =
    "INSERT INTO claim_dialects (dialect_uri, tenant_id) VALUES (?1, ?2)";

/// ?1 new dialect_uri, ?2 old dialect_uri, ?3 tenant_id
pub const UPDATE_CLAIM_DIALECT: &str =
    "UPDATE claim_dialects SET dialect_uri = ?1 WHERE dialect_uri = ?2 AND tenant_id = ?3";

/// ?1 dialect_uri, ?2 tenant_id
pub const REMOVE_CLAIM_DIALECT: &str =
    "DELETE FROM claim_dialects WHERE dialect_uri = ?1 AND tenant_id = ?2";

// ========== Claims ==========

/// ?1 dialect_uri, ?2 dialect tenant_id, ?3 claim tenant_id
pub const GET_CLAIMS_BY_DIALECT: &str = r#"
SELECT id, claim_uri FROM claims
WHERE dialect_id = (SELECT id FROM claim_dialects WHERE dialect_uri = ?1 AND tenant_id = ?2)
  AND tenant_id = ?3
ORDER BY id
"#;

/// ?1 dialect_uri, ?2 dialect tenant_id, ?3 claim_uri, ?4 claim tenant_id
pub const ADD_CLAIM: &str = r#"
INSERT INTO claims (dialect_id, claim_uri, tenant_id)
VALUES ((SELECT id FROM claim_dialects WHERE dialect_uri = ?1 AND tenant_id = ?2), ?3, ?4)
"#;

/// ?1 dialect_uri, ?2 dialect tenant_id, ?3 claim_uri, ?4 claim tenant_id
pub const REMOVE_CLAIM: &str = r#"
DELETE FROM claims
WHERE dialect_id = (SELECT id FROM claim_dialects WHERE dialect_uri = ?1 AND tenant_id = ?2)
  AND claim_uri = ?3 AND tenant_id = ?4
"#;

/// ?1 dialect_uri, ?2 dialect tenant_id, ?3 claim_uri, ?4 claim tenant_id
pub const GET_CLAIM_ID: &str = r#"
SELECT id FROM claims
WHERE dialect_id = (SELECT id FROM claim_dialects WHERE dialect_uri = ?1 AND tenant_id = ?2)
  AND claim_uri = ?3 AND tenant_id = ?4
"#;

// ========== Claim properties ==========

/// ?1 claim_id, ?2 tenant_id
pub const GET_CLAIM_PROPERTIES: &str =
    "SELECT property_name, property_value FROM claim_properties WHERE claim_id = ?1 AND tenant_id = ?2";

/// ?1 claim_id, ?2 property_name, ?3 property_value, ?4 tenant_id.
/// Inserts nothing unless the claim belongs to the tenant.
pub const ADD_CLAIM_PROPERTY: &str = r#"
INSERT INTO claim_properties (claim_id, property_name, property_value, tenant_id)
SELECT ?1, ?2, ?3, ?4
WHERE EXISTS (SELECT 1 FROM claims WHERE id = ?1 AND tenant_id = ?4)
"#;

/// ?1 claim_id, ?2 tenant_id
pub const DELETE_CLAIM_PROPERTY: &str =
    "DELETE FROM claim_properties WHERE claim_id = ?1 AND tenant_id = ?2";
