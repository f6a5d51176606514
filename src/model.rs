//! Claim metadata value objects
//!
//! Plain data carriers exchanged with the stores. Identity lives in the
//! database: a dialect is keyed by `(dialect_uri, tenant)`, a claim by
//! `(dialect_uri, claim_uri, tenant)` plus a store-generated surrogate id.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Tenant identifier. Every read and write is qualified by one.
pub type TenantId = i32;

/// Surrogate key generated by the store when a claim is inserted.
pub type ClaimId = i64;

/// Property name to value mapping attached to a claim.
pub type ClaimProperties = HashMap<String, String>;

/// A URI-identified namespace of claims
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClaimDialect {
    pub dialect_uri: String,
}

impl ClaimDialect {
    pub fn new(dialect_uri: impl Into<String>) -> Self {
        Self {
            dialect_uri: dialect_uri.into(),
        }
    }
}

impl fmt::Display for ClaimDialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.dialect_uri)
    }
}

/// A claim definition within a dialect
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Claim {
    pub dialect_uri: String,
    pub claim_uri: String,
}

impl Claim {
    pub fn new(dialect_uri: impl Into<String>, claim_uri: impl Into<String>) -> Self {
        Self {
            dialect_uri: dialect_uri.into(),
            claim_uri: claim_uri.into(),
        }
    }
}

impl fmt::Display for Claim {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.claim_uri, self.dialect_uri)
    }
}
