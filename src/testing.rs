//! Test doubles for exercising the transform without a live host.
//!
//! [`InMemoryVariableStore`] implements [`VariableStore`] with the same
//! observable behavior a host store has: name resolution, exclusive
//! per-variable locks, typed range-checked writes, and simulated lock
//! contention. It also counts lock/read/write traffic so tests can assert
//! that finalization performs exactly one read-modify-write cycle.
//!
//! # Example
//!
//! ```
//! use rowtally::testing::{batch, terminal_batch, InMemoryVariableStore};
//! use rowtally::{CounterConfig, RowCounter, VariableDataType};
//!
//! let store = InMemoryVariableStore::new();
//! store.define_user("rows_seen", VariableDataType::Int64, 100);
//!
//! let mut counter = RowCounter::new(CounterConfig::new("rows_seen", true));
//! counter.process_input(&batch(5), &store).unwrap();
//! counter.process_input(&terminal_batch(), &store).unwrap();
//!
//! assert_eq!(store.value("rows_seen"), Some(105));
//! ```

use crate::component::{Row, RowBatch};
use crate::variable::{
    AccessError, LockHandle, LockMode, VariableDataType, VariableInfo, VariableStore,
};
use serde_json::json;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// A non-terminal batch of `rows` synthetic single-cell rows.
#[must_use]
pub fn batch(rows: usize) -> RowBatch {
    RowBatch::of((0..rows).map(|i| Row::new(vec![json!(i)])).collect())
}

/// The terminal, end-of-rowset batch.
#[must_use]
pub fn terminal_batch() -> RowBatch {
    RowBatch::terminal()
}

struct StoredVariable {
    info: VariableInfo,
    value: i64,
    locked_by: Option<u64>,
}

struct StoreInner {
    next_lock_id: u64,
    variables: HashMap<String, StoredVariable>,
    held: HashMap<u64, String>,
    fail_next_lock: bool,
    reads: u64,
    writes: u64,
    read_locks: u64,
    write_locks: u64,
}

/// In-memory [`VariableStore`] with exclusive per-variable locks.
///
/// Clones share state, so a test can hand the store to a counter and keep a
/// handle for assertions. Lock contention can be simulated either by
/// holding a lock through the trait (`lock_for_write`) before finalizing,
/// or by arming [`fail_next_lock`](Self::fail_next_lock).
#[derive(Clone)]
pub struct InMemoryVariableStore {
    inner: Arc<Mutex<StoreInner>>,
}

impl InMemoryVariableStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(StoreInner {
                next_lock_id: 0,
                variables: HashMap::new(),
                held: HashMap::new(),
                fail_next_lock: false,
                reads: 0,
                writes: 0,
                read_locks: 0,
                write_locks: 0,
            })),
        }
    }

    /// Define a variable with an explicit descriptor.
    pub fn define(&self, name: impl Into<String>, info: VariableInfo, value: i64) {
        let mut inner = self.inner.lock().unwrap();
        inner.variables.insert(
            name.into(),
            StoredVariable {
                info,
                value,
                locked_by: None,
            },
        );
    }

    /// Define a writable user variable of the given type.
    pub fn define_user(&self, name: impl Into<String>, data_type: VariableDataType, value: i64) {
        self.define(name, VariableInfo::user(data_type), value);
    }

    /// Current value of a variable, bypassing locks. For assertions only.
    #[must_use]
    pub fn value(&self, name: &str) -> Option<i64> {
        let inner = self.inner.lock().unwrap();
        inner.variables.get(name).map(|v| v.value)
    }

    /// Make the next lock acquisition fail with
    /// [`AccessError::LockContended`], then behave normally again.
    pub fn fail_next_lock(&self) {
        self.inner.lock().unwrap().fail_next_lock = true;
    }

    /// Number of typed reads served.
    #[must_use]
    pub fn reads(&self) -> u64 {
        self.inner.lock().unwrap().reads
    }

    /// Number of typed writes that succeeded.
    #[must_use]
    pub fn writes(&self) -> u64 {
        self.inner.lock().unwrap().writes
    }

    /// Number of read locks granted.
    #[must_use]
    pub fn read_locks_taken(&self) -> u64 {
        self.inner.lock().unwrap().read_locks
    }

    /// Number of write locks granted.
    #[must_use]
    pub fn write_locks_taken(&self) -> u64 {
        self.inner.lock().unwrap().write_locks
    }

    /// Number of locks currently held. Zero after every well-behaved
    /// access, successful or not.
    #[must_use]
    pub fn outstanding_locks(&self) -> usize {
        self.inner.lock().unwrap().held.len()
    }

    fn acquire(&self, name: &str, mode: LockMode) -> Result<LockHandle, AccessError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.fail_next_lock {
            inner.fail_next_lock = false;
            return Err(AccessError::LockContended(name.to_string()));
        }

        let id = inner.next_lock_id;
        let var = inner
            .variables
            .get_mut(name)
            .ok_or_else(|| AccessError::VariableGone(name.to_string()))?;
        if var.locked_by.is_some() {
            return Err(AccessError::LockContended(name.to_string()));
        }
        var.locked_by = Some(id);

        inner.next_lock_id += 1;
        inner.held.insert(id, name.to_string());
        match mode {
            LockMode::Read => inner.read_locks += 1,
            LockMode::Write => inner.write_locks += 1,
        }
        Ok(LockHandle::new(id, name, mode))
    }
}

impl Default for InMemoryVariableStore {
    fn default() -> Self {
        Self::new()
    }
}

impl VariableStore for InMemoryVariableStore {
    fn resolve(&self, name: &str) -> Option<VariableInfo> {
        let inner = self.inner.lock().unwrap();
        inner.variables.get(name).map(|v| v.info.clone())
    }

    fn lock_for_read(&self, name: &str) -> Result<LockHandle, AccessError> {
        self.acquire(name, LockMode::Read)
    }

    fn lock_for_write(&self, name: &str) -> Result<LockHandle, AccessError> {
        self.acquire(name, LockMode::Write)
    }

    fn read(&self, handle: &LockHandle) -> Result<i64, AccessError> {
        let mut inner = self.inner.lock().unwrap();
        if !inner.held.contains_key(&handle.id()) {
            return Err(AccessError::StaleHandle(handle.variable().to_string()));
        }
        let value = inner
            .variables
            .get(handle.variable())
            .map(|v| v.value)
            .ok_or_else(|| AccessError::VariableGone(handle.variable().to_string()))?;
        inner.reads += 1;
        Ok(value)
    }

    fn write(&self, handle: &LockHandle, value: i64) -> Result<(), AccessError> {
        let mut inner = self.inner.lock().unwrap();
        if !inner.held.contains_key(&handle.id()) {
            return Err(AccessError::StaleHandle(handle.variable().to_string()));
        }
        if handle.mode() != LockMode::Write {
            return Err(AccessError::Host(format!(
                "lock on variable \"{}\" does not grant write access",
                handle.variable()
            )));
        }

        let var = inner
            .variables
            .get_mut(handle.variable())
            .ok_or_else(|| AccessError::VariableGone(handle.variable().to_string()))?;
        match var.info.data_type.value_range() {
            Some((lo, hi)) if (lo..=hi).contains(&value) => {
                var.value = value;
            }
            Some(_) => {
                return Err(AccessError::ValueOutOfRange {
                    name: handle.variable().to_string(),
                    value,
                    data_type: var.info.data_type.clone(),
                });
            }
            None => {
                return Err(AccessError::Host(format!(
                    "variable \"{}\" does not hold an integer value",
                    handle.variable()
                )));
            }
        }
        inner.writes += 1;
        Ok(())
    }

    fn unlock(&self, handle: LockHandle) {
        let mut inner = self.inner.lock().unwrap();
        inner.held.remove(&handle.id());
        if let Some(var) = inner.variables.get_mut(handle.variable()) {
            if var.locked_by == Some(handle.id()) {
                var.locked_by = None;
            }
        }
    }
}
