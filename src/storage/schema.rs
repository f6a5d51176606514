//! Database schema definitions

/// SQL to create the claim dialects table
pub const CREATE_CLAIM_DIALECTS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS claim_dialects (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    dialect_uri TEXT NOT NULL,
    tenant_id INTEGER NOT NULL,
    CONSTRAINT dialect_uri_constraint UNIQUE (dialect_uri, tenant_id)
)
"#;

/// SQL to create the claims table
/// `dialect_id` is resolved from `(dialect_uri, tenant_id)` on insert
pub const CREATE_CLAIMS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS claims (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    dialect_id INTEGER NOT NULL,
    claim_uri TEXT NOT NULL,
    tenant_id INTEGER NOT NULL,
    FOREIGN KEY (dialect_id) REFERENCES claim_dialects(id) ON DELETE CASCADE,
    CONSTRAINT claim_uri_constraint UNIQUE (dialect_id, claim_uri, tenant_id)
)
"#;

/// SQL to create the claim properties table
pub const CREATE_CLAIM_PROPERTIES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS claim_properties (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    claim_id INTEGER NOT NULL,
    property_name TEXT NOT NULL,
    property_value TEXT NOT NULL,
    tenant_id INTEGER NOT NULL,
    FOREIGN KEY (claim_id) REFERENCES claims(id) ON DELETE CASCADE,
    CONSTRAINT property_name_constraint UNIQUE (claim_id, property_name, tenant_id)
)
"#;

/// SQL to create indexes
pub const CREATE_INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_claim_dialects_tenant ON claim_dialects(tenant_id)",
    "CREATE INDEX IF NOT EXISTS idx_claims_dialect ON claims(dialect_id, tenant_id)",
    "CREATE INDEX IF NOT EXISTS idx_claim_properties_claim ON claim_properties(claim_id, tenant_id)",
];

/// All schema creation statements
pub fn all_schema_statements() -> Vec<&'static str> {
    let mut stmts = vec![
        CREATE_CLAIM_DIALECTS_TABLE,
        CREATE_CLAIMS_TABLE,
        CREATE_CLAIM_PROPERTIES_TABLE,
    ];
    stmts.extend(CREATE_INDEXES.iter().copied());
    stmts
}
