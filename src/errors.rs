//! Error types for the file table and its owning registry
//!
//! `TableError` covers the core table: every variant is reported
//! synchronously and leaves the table untouched. `RegistryError` adds the
//! conditions that only exist at the registration surface.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableError {
    /// Backing storage for `requested` slots could not be reserved
    OutOfMemory { requested: usize },
    /// Every slot in the active allocation range is occupied
    NoSpace,
    /// Explicit install targeted a live slot
    AlreadyOccupied { index: usize },
    /// Slot is empty or out of bounds
    NotFound { index: usize },
    /// Range or index exceeds the table capacity
    InvalidRange { offset: usize, len: usize, capacity: usize },
    /// Reference address overlaps the flag bits
    MisalignedReference { addr: usize },
}

impl fmt::Display for TableError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfMemory { requested } => {
                write!(f, "Out of memory: cannot allocate {} slots", requested)
            }
            Self::NoSpace => {
                write!(f, "No free slot in allocation range")
            }
            Self::AlreadyOccupied { index } => {
                write!(f, "Slot {} is already occupied", index)
            }
            Self::NotFound { index } => {
                write!(f, "No file installed at slot {}", index)
            }
            Self::InvalidRange { offset, len, capacity } => {
                write!(
                    f,
                    "Invalid range: offset {} + len {} exceeds capacity {}",
                    offset, len, capacity
                )
            }
            Self::MisalignedReference { addr } => {
                write!(f, "Reference {:#x} collides with flag bits", addr)
            }
        }
    }
}

impl std::error::Error for TableError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    Table(TableError),
    /// No table has been registered yet
    NotRegistered,
    /// A table is already registered
    AlreadyRegistered,
    TooManyFiles { requested: usize, max: usize },
    InvalidArgument { reason: String },
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Table(err) => write!(f, "{}", err),
            Self::NotRegistered => write!(f, "No file table registered"),
            Self::AlreadyRegistered => write!(f, "File table already registered"),
            Self::TooManyFiles { requested, max } => {
                write!(f, "Too many files: requested {}, maximum {}", requested, max)
            }
            Self::InvalidArgument { reason } => {
                write!(f, "Invalid argument: {}", reason)
            }
        }
    }
}

impl std::error::Error for RegistryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Table(err) => Some(err),
            _ => None,
        }
    }
}

impl From<TableError> for RegistryError {
    fn from(err: TableError) -> Self {
        Self::Table(err)
    }
}

impl RegistryError {
    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidArgument { reason: reason.into() }
    }
}

pub type TableResult<T> = Result<T, TableError>;
pub type RegistryResult<T> = Result<T, RegistryError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn display_names_the_slot() {
        let err = TableError::AlreadyOccupied { index: 7 };
        assert_eq!(err.to_string(), "Slot 7 is already occupied");
    }

    #[test]
    fn registry_error_wraps_table_error() {
        let err: RegistryError = TableError::NoSpace.into();
        assert_eq!(err, RegistryError::Table(TableError::NoSpace));
        assert!(err.source().is_some());
        assert!(RegistryError::NotRegistered.source().is_none());
    }
}
