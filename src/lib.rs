//! # Rowtally
//!
//! A **streaming row-counting transform** for host-managed tabular data
//! pipelines. The transform observes every row flowing through its single
//! input, tallies them, and at end-of-stream writes the tally into a named
//! integer variable owned by the host environment, either overwriting the
//! variable or adding to it.
//!
//! The counting arithmetic is trivial; the crate exists for the contract
//! around it:
//!
//! - **Validation before rows** - a fixed-order, short-circuiting check
//!   sequence rejects misconfiguration (unconnected input, missing or
//!   unresolvable variable, system or read-only variable, non-integer type)
//!   before the host delivers the first buffer.
//! - **Exactly one write** - finalization performs at most one locked read
//!   (incremental mode only) and exactly one locked write, and is idempotent
//!   under repeated end-of-stream signals.
//! - **Cheap per-row path** - counting a row is a bare increment; no
//!   locking, I/O, allocation, or name lookups happen per row.
//!
//! ## Quick Start
//!
//! ```
//! use rowtally::*;
//! use rowtally::testing::{batch, terminal_batch, InMemoryVariableStore};
//!
//! # fn main() -> anyhow::Result<()> {
//! // The host owns the variable; here a test double stands in for it.
//! let store = InMemoryVariableStore::new();
//! store.define_user("rows_seen", VariableDataType::Int64, 0);
//!
//! // Configure and validate before any row is delivered.
//! let config = CounterConfig::new("rows_seen", false);
//! let input = InputSchema::attached(vec![InputColumn::new("id", 1)]);
//! validate(&config, &input, &store)?;
//!
//! // The host pushes buffers, then signals end-of-stream.
//! let mut counter = RowCounter::new(config);
//! counter.process_input(&batch(10), &store)?;
//! counter.process_input(&batch(5), &store)?;
//! counter.process_input(&terminal_batch(), &store)?;
//!
//! assert_eq!(store.value("rows_seen"), Some(15));
//! # Ok(())
//! # }
//! ```
//!
//! ## Execution model
//!
//! Single-threaded, synchronous, push-driven: the host calls
//! [`RowCounter::process_input`] on its own thread, once per delivered
//! buffer, in delivery order. The transform never spawns threads and blocks
//! only inside the store's lock-scoped calls during finalization. One
//! [`RowCounter`] serves exactly one pipeline execution and is then
//! discarded.
//!
//! In incremental mode the pre-read and the write take separate locks, so
//! two components finalizing into the same variable concurrently can lose
//! an update. This mirrors the host's locking protocol; see
//! [`VariableGateway`].
//!
//! ## Module Overview
//!
//! - [`component`] - the [`RowCounter`] state machine, configuration, and
//!   row/batch types
//! - [`validation`] - pre-execution checks and their error taxonomy
//! - [`variable`] - the host variable model, the [`VariableStore`]
//!   capability trait, and the lock-scoped [`VariableGateway`]
//! - [`metadata`] - the design-time contract surface (inputs, outputs,
//!   custom properties, column usage)
//! - [`testing`] - an in-memory variable store and batch builders for
//!   testing without a live host

pub mod component;
pub mod metadata;
pub mod testing;
pub mod validation;
pub mod variable;

pub use component::{CounterConfig, Row, RowBatch, RowCounter};
pub use metadata::{
    on_input_attached, ColumnUsage, ComponentMetadata, InputColumn, InputSchema,
    INCREMENTAL_PROPERTY, INPUT_NAME, OUTPUT_NAME, VARIABLE_PROPERTY,
};
pub use validation::{validate, ValidationError};
pub use variable::{
    AccessError, LockHandle, LockMode, VariableDataType, VariableGateway, VariableInfo,
    VariableStore,
};
