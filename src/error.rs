use rusqlite::ffi;

use crate::db::collection::Collection;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{collection} record not found: {key}")]
    NotFound { collection: Collection, key: String },

    #[error("Uniqueness violation in {collection}: {detail}")]
    UniquenessViolation {
        collection: Collection,
        detail: String,
    },

    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Password hashing error: {0}")]
    PasswordHash(#[from] bcrypt::BcryptError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    /// Errors the caller can fix and retry (re-prompt a form, pick another key).
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            StoreError::NotFound { .. }
                | StoreError::UniquenessViolation { .. }
                | StoreError::Validation(_)
        )
    }

    /// Map a UNIQUE or PRIMARY KEY failure on `collection` to a uniqueness violation.
    /// Other constraint failures stay database errors.
    pub(crate) fn from_constraint(collection: Collection, err: rusqlite::Error) -> Self {
        match err {
            rusqlite::Error::SqliteFailure(e, message)
                if e.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE
                    || e.extended_code == ffi::SQLITE_CONSTRAINT_PRIMARYKEY =>
            {
                StoreError::UniquenessViolation {
                    collection,
                    detail: message.unwrap_or_else(|| "constraint failed".to_string()),
                }
            }
            other => StoreError::Database(other),
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_is_recoverable() {
        let err = StoreError::NotFound {
            collection: Collection::Recipes,
            key: "42".into(),
        };
        assert!(err.is_recoverable());
        assert_eq!(err.to_string(), "recipes record not found: 42");
    }

    #[test]
    fn storage_unavailable_is_not_recoverable() {
        assert!(!StoreError::StorageUnavailable("locked".into()).is_recoverable());
    }

    #[test]
    fn constraint_failure_maps_to_uniqueness_violation() {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE t (name TEXT UNIQUE); INSERT INTO t VALUES ('a');")
            .unwrap();
        let err = conn
            .execute("INSERT INTO t VALUES ('a')", [])
            .unwrap_err();

        match StoreError::from_constraint(Collection::Categories, err) {
            StoreError::UniquenessViolation { collection, detail } => {
                assert_eq!(collection, Collection::Categories);
                assert!(detail.contains("t.name"));
            }
            other => panic!("expected uniqueness violation, got {other:?}"),
        }
    }

    #[test]
    fn duplicate_primary_key_maps_to_uniqueness_violation() {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE t (id INTEGER PRIMARY KEY); INSERT INTO t VALUES (1);")
            .unwrap();
        let err = conn.execute("INSERT INTO t VALUES (1)", []).unwrap_err();

        assert!(matches!(
            StoreError::from_constraint(Collection::Recipes, err),
            StoreError::UniquenessViolation { .. }
        ));
    }

    #[test]
    fn not_null_and_check_failures_stay_database_errors() {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE t (name TEXT NOT NULL, n INTEGER CHECK (n > 0));")
            .unwrap();

        let not_null = conn
            .execute("INSERT INTO t VALUES (NULL, 1)", [])
            .unwrap_err();
        assert!(matches!(
            StoreError::from_constraint(Collection::Users, not_null),
            StoreError::Database(_)
        ));

        let check = conn
            .execute("INSERT INTO t VALUES ('a', 0)", [])
            .unwrap_err();
        assert!(matches!(
            StoreError::from_constraint(Collection::Users, check),
            StoreError::Database(_)
        ));
    }

    #[test]
    fn other_sqlite_errors_stay_database_errors() {
        let err = StoreError::from_constraint(
            Collection::Users,
            rusqlite::Error::QueryReturnedNoRows,
        );
        assert!(matches!(err, StoreError::Database(_)));
    }
}
