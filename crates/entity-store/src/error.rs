use thiserror::Error;

/// Errors that can occur when interacting with the entity store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A unique constraint rejected the write.
    #[error("Unique constraint violated: {constraint}")]
    UniqueViolation { constraint: String },

    /// A referenced row does not exist.
    #[error("Foreign key constraint violated: {constraint}")]
    ForeignKeyViolation { constraint: String },

    /// A check constraint rejected the written value.
    #[error("Check constraint violated: {constraint}")]
    CheckViolation { constraint: String },

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[source] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

impl StoreError {
    pub(crate) fn unique(constraint: &str) -> Self {
        StoreError::UniqueViolation {
            constraint: constraint.to_string(),
        }
    }

    pub(crate) fn foreign_key(constraint: &str) -> Self {
        StoreError::ForeignKeyViolation {
            constraint: constraint.to_string(),
        }
    }

    pub(crate) fn check(constraint: &str) -> Self {
        StoreError::CheckViolation {
            constraint: constraint.to_string(),
        }
    }

    /// Returns true if this is a unique violation of the named constraint.
    pub fn is_unique_violation_of(&self, name: &str) -> bool {
        matches!(self, StoreError::UniqueViolation { constraint } if constraint == name)
    }

    /// Returns true if a referenced row was missing.
    pub fn is_foreign_key_violation(&self) -> bool {
        matches!(self, StoreError::ForeignKeyViolation { .. })
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(ref db_err) = err {
            let constraint = db_err.constraint().unwrap_or_default();
            if db_err.is_unique_violation() {
                return StoreError::unique(constraint);
            }
            if db_err.is_foreign_key_violation() {
                return StoreError::foreign_key(constraint);
            }
            if db_err.is_check_violation() {
                return StoreError::check(constraint);
            }
        }
        StoreError::Database(err)
    }
}

/// Result type for entity store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unique_violation_matches_by_constraint_name() {
        let err = StoreError::unique("unique_open_loan");
        assert!(err.is_unique_violation_of("unique_open_loan"));
        assert!(!err.is_unique_violation_of("unique_username"));
        assert!(!err.is_foreign_key_violation());
    }

    #[test]
    fn non_database_errors_stay_database_errors() {
        let err = StoreError::from(sqlx::Error::RowNotFound);
        assert!(matches!(err, StoreError::Database(sqlx::Error::RowNotFound)));
    }

    #[test]
    fn display_names_constraint() {
        let err = StoreError::foreign_key("loans_instrument_id_fkey");
        assert_eq!(
            err.to_string(),
            "Foreign key constraint violated: loans_instrument_id_fkey"
        );
    }
}
