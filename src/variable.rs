//! External variable model and the host's variable store capability.
//!
//! The pipeline host owns a set of named, typed integer variables that
//! outlive any single execution. This module defines the read-only
//! descriptor for such a variable ([`VariableInfo`]), the capability trait
//! the host implements to expose lock-scoped access ([`VariableStore`]),
//! and [`VariableGateway`], the thin name-scoped adapter the transform uses
//! at end-of-stream. The core never creates, renames, or deletes variables.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Data type a host variable declares.
///
/// Only the four integer types can receive a row tally; anything else is
/// carried as [`Other`](VariableDataType::Other) with the host's type name
/// so validation messages can show it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum VariableDataType {
    Int32,
    Int64,
    UInt32,
    UInt64,
    Other(String),
}

impl VariableDataType {
    /// Whether a row tally can be written into a variable of this type.
    #[must_use]
    pub fn is_countable(&self) -> bool {
        !matches!(self, VariableDataType::Other(_))
    }

    /// Inclusive bounds a written value must satisfy for this type.
    ///
    /// The accumulator is a signed 64-bit integer, so `UInt64` is capped at
    /// `i64::MAX` even though the host type could hold more.
    pub(crate) fn value_range(&self) -> Option<(i64, i64)> {
        match self {
            VariableDataType::Int32 => Some((i64::from(i32::MIN), i64::from(i32::MAX))),
            VariableDataType::Int64 => Some((i64::MIN, i64::MAX)),
            VariableDataType::UInt32 => Some((0, i64::from(u32::MAX))),
            VariableDataType::UInt64 => Some((0, i64::MAX)),
            VariableDataType::Other(_) => None,
        }
    }
}

impl fmt::Display for VariableDataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VariableDataType::Int32 => write!(f, "INT32"),
            VariableDataType::Int64 => write!(f, "INT64"),
            VariableDataType::UInt32 => write!(f, "UINT32"),
            VariableDataType::UInt64 => write!(f, "UINT64"),
            VariableDataType::Other(name) => write!(f, "{name}"),
        }
    }
}

/// Descriptor for a host-owned variable, as seen at resolution time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableInfo {
    /// Declared data type of the variable's value.
    pub data_type: VariableDataType,
    /// System-defined variables may never be targeted by the transform.
    pub system: bool,
    /// Read-only variables may never be targeted by the transform.
    pub read_only: bool,
}

impl VariableInfo {
    /// Descriptor for a writable, user-defined variable of the given type.
    #[must_use]
    pub fn user(data_type: VariableDataType) -> Self {
        Self {
            data_type,
            system: false,
            read_only: false,
        }
    }
}

/// Whether a lock grants read or write access.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockMode {
    Read,
    Write,
}

/// Opaque token for a held variable lock.
///
/// Handles are issued by a [`VariableStore`] and consumed by
/// [`VariableStore::unlock`]; they are deliberately not `Clone`, so a lock
/// can only be released once.
#[derive(Debug)]
pub struct LockHandle {
    id: u64,
    variable: String,
    mode: LockMode,
}

impl LockHandle {
    /// Create a handle. Only store implementations should call this.
    #[must_use]
    pub fn new(id: u64, variable: impl Into<String>, mode: LockMode) -> Self {
        Self {
            id,
            variable: variable.into(),
            mode,
        }
    }

    /// Store-assigned identifier of this lock.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Name of the variable this lock covers.
    #[must_use]
    pub fn variable(&self) -> &str {
        &self.variable
    }

    /// Access mode granted by this lock.
    #[must_use]
    pub fn mode(&self) -> LockMode {
        self.mode
    }
}

/// A variable access failure during finalization.
///
/// These are fatal for the current execution: the tally is never retried,
/// and the transform stays un-finalized unless the write went through.
#[derive(Debug, Clone, Error, Serialize, Deserialize)]
pub enum AccessError {
    #[error("variable \"{0}\" is locked by another component")]
    LockContended(String),
    #[error("variable \"{0}\" no longer exists")]
    VariableGone(String),
    #[error("lock handle for variable \"{0}\" is stale or was not issued by this store")]
    StaleHandle(String),
    #[error("value {value} does not fit the declared type {data_type} of variable \"{name}\"")]
    ValueOutOfRange {
        name: String,
        value: i64,
        data_type: VariableDataType,
    },
    #[error("host variable store failure: {0}")]
    Host(String),
}

/// Capability trait the host implements over its shared-variable store.
///
/// All methods are name- or handle-addressed; the transform holds no direct
/// reference to the host's storage. Implementations must be safe to share
/// across components within one pipeline execution.
pub trait VariableStore: Send + Sync {
    /// Look a variable up by name. `None` means the name does not exist,
    /// which is distinct from "exists but has the wrong type".
    fn resolve(&self, name: &str) -> Option<VariableInfo>;

    /// Acquire a read lock on `name`.
    fn lock_for_read(&self, name: &str) -> Result<LockHandle, AccessError>;

    /// Acquire a write lock on `name`.
    fn lock_for_write(&self, name: &str) -> Result<LockHandle, AccessError>;

    /// Read the variable's value under the given lock, coerced to `i64`.
    fn read(&self, handle: &LockHandle) -> Result<i64, AccessError>;

    /// Write `value` under the given lock, coerced to the variable's
    /// declared type. A value outside the declared type's range is rejected
    /// with [`AccessError::ValueOutOfRange`] rather than wrapped.
    fn write(&self, handle: &LockHandle, value: i64) -> Result<(), AccessError>;

    /// Release a lock. Infallible so cleanup on error paths cannot fail.
    fn unlock(&self, handle: LockHandle);
}

/// Name-scoped adapter over a [`VariableStore`].
///
/// Each call acquires a lock, performs exactly one typed access, and
/// releases the lock on every exit path, including when the access fails.
/// The read lock taken by [`current_value`](Self::current_value) is released
/// before [`publish`](Self::publish) acquires its write lock; two components
/// finalizing into the same variable concurrently can therefore lose an
/// update. That matches the host's locking protocol and is not papered over
/// here.
pub struct VariableGateway<'a> {
    store: &'a dyn VariableStore,
    name: &'a str,
}

impl<'a> VariableGateway<'a> {
    #[must_use]
    pub fn new(store: &'a dyn VariableStore, name: &'a str) -> Self {
        Self { store, name }
    }

    /// Name of the variable this gateway is scoped to.
    #[must_use]
    pub fn variable(&self) -> &str {
        self.name
    }

    /// Read the variable's current value under a read lock.
    pub fn current_value(&self) -> Result<i64, AccessError> {
        let handle = self.store.lock_for_read(self.name)?;
        let value = self.store.read(&handle);
        self.store.unlock(handle);
        value
    }

    /// Write `value` to the variable under a write lock.
    pub fn publish(&self, value: i64) -> Result<(), AccessError> {
        let handle = self.store.lock_for_write(self.name)?;
        let outcome = self.store.write(&handle, value);
        self.store.unlock(handle);
        outcome
    }
}
