use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// The entity does not exist or belongs to another owner. Callers cannot
    /// tell the two apart.
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    #[error("invalid {field}: {reason}")]
    Validation { field: &'static str, reason: String },

    #[error("no task ids supplied")]
    EmptyBatch,

    #[error("{entity} '{name}' already exists")]
    Duplicate { entity: &'static str, name: String },

    #[error(transparent)]
    Storage(#[from] rusqlite::Error),
}

impl Error {
    pub(crate) fn task_not_found(id: i64) -> Self {
        Self::NotFound { entity: "task", id }
    }

    pub(crate) fn category_not_found(id: i64) -> Self {
        Self::NotFound {
            entity: "category",
            id,
        }
    }

    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Validation {
            field,
            reason: reason.into(),
        }
    }
}
