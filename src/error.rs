use rusqlite::ErrorCode;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("no matching row in `{table}`")]
    NotFound { table: &'static str },

    #[error("constraint violated: {message} (statement: {statement})")]
    ConstraintViolation { statement: String, message: String },

    #[error("timed out waiting for the database lock (statement: {statement})")]
    LockTimeout { statement: String },

    #[error("sqlite error `{source}` (statement: {statement})")]
    Storage {
        statement: String,
        #[source]
        source: rusqlite::Error,
    },

    #[error("`{field}` is not a column of `{table}`")]
    UnknownField {
        table: &'static str,
        field: &'static str,
    },

    #[error("fields {fields:?} do not match the columns of `{table}`")]
    FieldMismatch {
        table: &'static str,
        fields: Vec<&'static str>,
    },

    #[error("update on `{table}` has no columns to set")]
    EmptyUpdate { table: &'static str },

    #[error("{0}")]
    Validation(String),

    #[error("serde_rusqlite `{0}`")]
    Marshal(#[from] serde_rusqlite::Error),

    #[error("could not decode row `{source}` (statement: {statement})")]
    Decode {
        statement: String,
        #[source]
        source: serde_rusqlite::Error,
    },

    #[error("r2d2 `{0}`")]
    Pool(#[from] r2d2::Error),

    #[error("rusqlite_migration `{0}`")]
    Migration(#[from] rusqlite_migration::Error),
}

impl Error {
    /// Classifies a rusqlite failure by its SQLite result code, keeping the
    /// statement that produced it.
    pub(crate) fn sqlite(statement: impl Into<String>, source: rusqlite::Error) -> Self {
        let statement = statement.into();
        let failure = match &source {
            rusqlite::Error::SqliteFailure(err, message) => Some((
                err.code,
                message.clone().unwrap_or_else(|| err.to_string()),
            )),
            _ => None,
        };
        match failure {
            Some((ErrorCode::ConstraintViolation, message)) => {
                Error::ConstraintViolation { statement, message }
            }
            Some((ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked, _)) => {
                Error::LockTimeout { statement }
            }
            _ => Error::Storage { statement, source },
        }
    }

    /// Classifies a failure met while stepping or decoding result rows.
    pub(crate) fn row(statement: impl Into<String>, source: serde_rusqlite::Error) -> Self {
        match source {
            serde_rusqlite::Error::Rusqlite(e) => Error::sqlite(statement, e),
            other => Error::Decode {
                statement: statement.into(),
                source: other,
            },
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }

    pub fn is_constraint_violation(&self) -> bool {
        matches!(self, Error::ConstraintViolation { .. })
    }
}
