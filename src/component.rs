//! The counting transform and its per-execution state machine.
//!
//! A [`RowCounter`] lives for exactly one pipeline execution: the host
//! pushes row buffers into [`process_input`](RowCounter::process_input) on
//! its own thread, and the terminal buffer triggers a single
//! read-modify-write cycle against the configured host variable. The
//! per-row path is a bare increment; all variable I/O, locking, and name
//! lookups happen at end-of-stream only.
//!
//! The state machine is Idle → Counting → Finalized. The first buffer moves
//! it into Counting (validation must already have passed); the terminal
//! buffer moves it into Finalized, at most once. Rows delivered after
//! finalization violate the host contract and are ignored.

use crate::metadata::{ComponentMetadata, INCREMENTAL_PROPERTY, VARIABLE_PROPERTY};
use crate::variable::{AccessError, VariableGateway, VariableStore};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Configuration of one counter instance, immutable during execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterConfig {
    /// Name of the host variable that receives the tally.
    pub variable: String,
    /// Add the tally to the variable's current value instead of
    /// overwriting it.
    pub incremental: bool,
}

impl CounterConfig {
    #[must_use]
    pub fn new(variable: impl Into<String>, incremental: bool) -> Self {
        Self {
            variable: variable.into(),
            incremental,
        }
    }

    /// Read the configuration out of the component's declared properties,
    /// applying the declared defaults (`incremental` true, `variable`
    /// unset).
    #[must_use]
    pub fn from_properties(metadata: &ComponentMetadata) -> Self {
        let incremental = metadata
            .property_value(INCREMENTAL_PROPERTY)
            .and_then(Value::as_bool)
            .unwrap_or(true);
        let variable = metadata
            .property_value(VARIABLE_PROPERTY)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        Self {
            variable,
            incremental,
        }
    }
}

/// One row as delivered by the host. The transform never inspects cell
/// values; they are carried only so downstream components see them intact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Row {
    cells: Vec<Value>,
}

impl Row {
    #[must_use]
    pub fn new(cells: Vec<Value>) -> Self {
        Self { cells }
    }

    #[must_use]
    pub fn cells(&self) -> &[Value] {
        &self.cells
    }
}

/// A finite chunk of rows delivered together by the host.
///
/// One execution may involve many batches; batch boundaries are invisible
/// to the tally. A batch with the end-of-rowset flag set is the host's
/// signal that no further rows will arrive.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RowBatch {
    rows: Vec<Row>,
    end_of_rowset: bool,
}

impl RowBatch {
    /// A non-terminal batch carrying `rows`.
    #[must_use]
    pub fn of(rows: Vec<Row>) -> Self {
        Self {
            rows,
            end_of_rowset: false,
        }
    }

    /// The terminal batch: empty, end-of-rowset set.
    #[must_use]
    pub fn terminal() -> Self {
        Self {
            rows: Vec::new(),
            end_of_rowset: true,
        }
    }

    #[must_use]
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    #[must_use]
    pub fn is_end_of_rowset(&self) -> bool {
        self.end_of_rowset
    }
}

/// Streaming row counter for a single pipeline execution.
///
/// Not reusable: create one instance per execution and discard it when the
/// execution ends. The tally is mutated without synchronization, which is
/// safe only under the host's guarantee of single-threaded buffer delivery
/// per execution instance.
#[derive(Debug)]
pub struct RowCounter {
    config: CounterConfig,
    row_count: i64,
    finalized: bool,
}

impl RowCounter {
    /// A fresh counter in the Idle state.
    #[must_use]
    pub fn new(config: CounterConfig) -> Self {
        Self {
            config,
            row_count: 0,
            finalized: false,
        }
    }

    #[must_use]
    pub fn config(&self) -> &CounterConfig {
        &self.config
    }

    /// Rows tallied so far in this execution.
    #[must_use]
    pub fn row_count(&self) -> i64 {
        self.row_count
    }

    /// Whether the tally has been published to the host variable.
    #[must_use]
    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    /// Count one row. O(1), allocation-free, no I/O.
    ///
    /// Rows arriving after finalization violate the host contract and are
    /// ignored.
    pub fn on_row(&mut self, _row: &Row) {
        if !self.finalized {
            self.row_count += 1;
        }
    }

    /// Host entry point for one delivered buffer.
    ///
    /// A non-terminal batch tallies its rows and touches nothing else. The
    /// terminal batch publishes the tally via [`finish`](Self::finish).
    pub fn process_input(
        &mut self,
        batch: &RowBatch,
        store: &dyn VariableStore,
    ) -> Result<(), AccessError> {
        if batch.is_end_of_rowset() {
            return self.finish(store);
        }
        for row in batch.rows() {
            self.on_row(row);
        }
        Ok(())
    }

    /// Publish the tally: at most one typed read (incremental mode only)
    /// followed by exactly one typed write, then the Finalized state.
    ///
    /// Idempotent: a host that delivers more than one terminal buffer gets
    /// a no-op after the first. On an access failure the counter stays
    /// un-finalized; the execution is expected to abort rather than retry.
    ///
    /// In incremental mode the pre-read and the write take separate locks,
    /// so a concurrent writer to the same variable can slip between them
    /// and lose its update.
    pub fn finish(&mut self, store: &dyn VariableStore) -> Result<(), AccessError> {
        if self.finalized {
            return Ok(());
        }

        let gateway = VariableGateway::new(store, &self.config.variable);
        let mut total = self.row_count;
        if self.config.incremental {
            total += gateway.current_value()?;
        }
        gateway.publish(total)?;
        self.finalized = true;
        Ok(())
    }
}
