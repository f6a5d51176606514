//! Uniqueness-violation detection
//!
//! Drivers signal a duplicate key in one of two ways: a categorized
//! constraint-violation result, or a generic failure carrying a
//! vendor-specific numeric code. Both mean "already exists" to the stores.

use rusqlite::ErrorCode;

use super::queries::UNIQUE_CONSTRAINT_VIOLATION_ERROR_CODE;

/// Returns true when `err` reports that a write would duplicate a unique key
pub fn is_uniqueness_violation(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(failure, _) => {
            failure.code == ErrorCode::ConstraintViolation
                || failure.extended_code == UNIQUE_CONSTRAINT_VIOLATION_ERROR_CODE
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::{ffi, Connection};

    fn failure(extended_code: i32) -> rusqlite::Error {
        rusqlite::Error::SqliteFailure(ffi::Error::new(extended_code), None)
    }

    #[test]
    fn test_categorized_signal() {
        let err = failure(ffi::SQLITE_CONSTRAINT_UNIQUE);
        assert!(is_uniqueness_violation(&err));
    }

    #[test]
    fn test_vendor_code_signal() {
        let err = failure(UNIQUE_CONSTRAINT_VIOLATION_ERROR_CODE);
        match &err {
            rusqlite::Error::SqliteFailure(f, _) => assert_ne!(f.code, ErrorCode::ConstraintViolation),
            _ => unreachable!(),
        }
        assert!(is_uniqueness_violation(&err));
    }

    #[test]
    fn test_unrelated_failures() {
        assert!(!is_uniqueness_violation(&failure(ffi::SQLITE_BUSY)));
        assert!(!is_uniqueness_violation(&rusqlite::Error::QueryReturnedNoRows));
        assert!(!is_uniqueness_violation(&rusqlite::Error::InvalidColumnName("id".into())));
    }

    #[test]
    fn test_real_unique_failure() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE t (k TEXT UNIQUE)").unwrap();
        conn.execute("INSERT INTO t (k) VALUES ('a')", []).unwrap();

        let err = conn.execute("INSERT INTO t (k) VALUES ('a')", []).unwrap_err();
        assert!(is_uniqueness_violation(&err));
    }
}
