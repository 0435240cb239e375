//! Pre-execution validation.
//!
//! Validation gates row delivery: no row is ever counted against a variable
//! that cannot safely receive the tally. It runs once per execution, before
//! the first buffer, performs no side effects, and reports the first failing
//! check so error output is deterministic.

use crate::component::CounterConfig;
use crate::metadata::InputSchema;
use crate::variable::{VariableDataType, VariableStore};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A configuration problem found before execution.
///
/// Each variant names the failing configuration field or variable so the
/// host can point the user at it.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum ValidationError {
    #[error("input \"Input\" is not connected")]
    InputNotConnected,
    #[error("property \"variable\" is not set")]
    VariableNotConfigured,
    #[error("variable \"{0}\" not found")]
    VariableNotFound(String),
    #[error("variable \"{0}\" is a system variable; the target must be a user variable")]
    SystemVariableForbidden(String),
    #[error("variable \"{0}\" is read-only")]
    VariableReadOnly(String),
    #[error("variable \"{name}\" has type {data_type}; the type must be INT32, INT64, UINT32 or UINT64")]
    UnsupportedVariableType {
        name: String,
        data_type: VariableDataType,
    },
}

/// Check that the component may run.
///
/// Checks run in a fixed order and stop at the first failure: input
/// connected, variable name set, name resolves, not a system variable, not
/// read-only, countable data type. A failing result must keep the host from
/// delivering any rows to this component.
pub fn validate(
    config: &CounterConfig,
    input: &InputSchema,
    store: &dyn VariableStore,
) -> Result<(), ValidationError> {
    if !input.is_connected() {
        return Err(ValidationError::InputNotConnected);
    }

    if config.variable.is_empty() {
        return Err(ValidationError::VariableNotConfigured);
    }

    let Some(info) = store.resolve(&config.variable) else {
        return Err(ValidationError::VariableNotFound(config.variable.clone()));
    };

    if info.system {
        return Err(ValidationError::SystemVariableForbidden(
            config.variable.clone(),
        ));
    }

    if info.read_only {
        return Err(ValidationError::VariableReadOnly(config.variable.clone()));
    }

    if !info.data_type.is_countable() {
        return Err(ValidationError::UnsupportedVariableType {
            name: config.variable.clone(),
            data_type: info.data_type,
        });
    }

    Ok(())
}
