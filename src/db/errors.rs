use std::fmt;

// ============================================================================
// Storage Errors
// ============================================================================

/// The sub-insert of an order write that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteStep {
    Begin,
    SetIsolation,
    InsertPayment,
    InsertDelivery,
    InsertOrder,
    InsertItem(usize),
    LinkItem(usize),
    Commit,
}

impl fmt::Display for WriteStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WriteStep::Begin => write!(f, "begin transaction"),
            WriteStep::SetIsolation => write!(f, "set isolation level"),
            WriteStep::InsertPayment => write!(f, "insert payment"),
            WriteStep::InsertDelivery => write!(f, "insert delivery"),
            WriteStep::InsertOrder => write!(f, "insert order"),
            WriteStep::InsertItem(index) => write!(f, "insert item #{}", index),
            WriteStep::LinkItem(index) => write!(f, "link item #{}", index),
            WriteStep::Commit => write!(f, "commit"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("order not found: {0}")]
    NotFound(String),

    #[error("order already stored: {0}")]
    DuplicateOrder(String),

    #[error("order write failed at {step}: {source}")]
    Write {
        step: WriteStep,
        #[source]
        source: sqlx::Error,
    },

    #[error("order write failed at {step} ({source}) and rollback failed: {rollback}")]
    RollbackFailed {
        step: WriteStep,
        #[source]
        source: sqlx::Error,
        rollback: sqlx::Error,
    },

    #[error("reading {what} failed: {source}")]
    Read {
        what: &'static str,
        #[source]
        source: sqlx::Error,
    },
}

impl StorageError {
    pub(crate) fn read(what: &'static str) -> impl FnOnce(sqlx::Error) -> Self {
        move |source| StorageError::Read { what, source }
    }

    /// Label used for the `storage_errors_total` metric.
    pub fn kind(&self) -> &'static str {
        match self {
            StorageError::NotFound(_) => "not_found",
            StorageError::DuplicateOrder(_) => "duplicate",
            StorageError::Write { .. } => "write",
            StorageError::RollbackFailed { .. } => "rollback",
            StorageError::Read { .. } => "read",
        }
    }
}

pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    if let sqlx::Error::Database(db_err) = err {
        return db_err.code().map(|code| code == "23505").unwrap_or(false);
    }
    false
}
