use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("dimension mismatch: {left} vs {right} features")]
    DimensionMismatch { left: usize, right: usize },

    #[error("malformed vector{}: field `{field}` {reason}", row_suffix(.row))]
    MalformedVector {
        field: String,
        reason: String,
        row: Option<usize>,
    },

    #[error("candidate pool is empty")]
    EmptyPool,

    #[error("no track named {name:?} in the seed pool")]
    SeedNotFound { name: String },

    #[error("ranking cancelled")]
    Cancelled,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

fn row_suffix(row: &Option<usize>) -> String {
    match row {
        Some(row) => format!(" at row {row}"),
        None => String::new(),
    }
}

impl Error {
    pub(crate) fn malformed(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::MalformedVector {
            field: field.into(),
            reason: reason.into(),
            row: None,
        }
    }

    /// Attach a pool row index to a `MalformedVector`; other variants pass through.
    pub(crate) fn at_row(self, index: usize) -> Self {
        match self {
            Error::MalformedVector { field, reason, .. } => Error::MalformedVector {
                field,
                reason,
                row: Some(index),
            },
            other => other,
        }
    }

    /// True when a seed lookup failed, as opposed to a load or ranking failure.
    pub fn is_seed_not_found(&self) -> bool {
        matches!(self, Error::SeedNotFound { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;
