//! Design-time contract surface the transform exposes to the host.
//!
//! Declares one input, one output synchronous to that input (the component
//! passes rows through untouched), and the two custom properties the host
//! surfaces at configuration time.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Name of the component's single input.
pub const INPUT_NAME: &str = "Input";
/// Name of the component's single output.
pub const OUTPUT_NAME: &str = "Output";
/// Boolean property: add to the variable instead of overwriting it.
pub const INCREMENTAL_PROPERTY: &str = "incremental";
/// String property: name of the target host variable.
pub const VARIABLE_PROPERTY: &str = "variable";

/// A configuration property declared by the component.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropertySpec {
    pub name: String,
    pub description: String,
    /// Current value; starts at the declared default.
    pub value: Value,
}

/// Declared input of the component.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputDecl {
    pub id: u32,
    pub name: String,
}

/// Declared output of the component.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputDecl {
    pub id: u32,
    pub name: String,
    /// Output carries the same rows as this input; no columns are added,
    /// removed, or transformed.
    pub synchronous_input_id: u32,
    pub error_output: bool,
}

/// The component descriptor handed to the host at registration time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentMetadata {
    pub name: String,
    pub description: String,
    pub input: InputDecl,
    pub output: OutputDecl,
    pub properties: Vec<PropertySpec>,
}

impl ComponentMetadata {
    /// Build the descriptor: one input, one synchronous output, and the
    /// `incremental` (default `true`) and `variable` (default unset)
    /// properties.
    #[must_use]
    pub fn provide() -> Self {
        let input = InputDecl {
            id: 1,
            name: INPUT_NAME.to_string(),
        };
        let output = OutputDecl {
            id: 2,
            name: OUTPUT_NAME.to_string(),
            synchronous_input_id: input.id,
            error_output: false,
        };
        Self {
            name: "RowTally".to_string(),
            description: "Counts rows and publishes the tally to a host variable".to_string(),
            input,
            output,
            properties: vec![
                PropertySpec {
                    name: INCREMENTAL_PROPERTY.to_string(),
                    description: "Whether the tally is added to the variable or overwrites it"
                        .to_string(),
                    value: json!(true),
                },
                PropertySpec {
                    name: VARIABLE_PROPERTY.to_string(),
                    description: "User variable that receives the row tally".to_string(),
                    value: Value::Null,
                },
            ],
        }
    }

    /// Current value of a property, by name.
    #[must_use]
    pub fn property_value(&self, name: &str) -> Option<&Value> {
        self.properties
            .iter()
            .find(|p| p.name == name)
            .map(|p| &p.value)
    }

    /// Set a property's value, by name. Unknown names are ignored.
    pub fn set_property(&mut self, name: &str, value: Value) {
        if let Some(p) = self.properties.iter_mut().find(|p| p.name == name) {
            p.value = value;
        }
    }
}

/// How the component uses an input column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnUsage {
    Ignored,
    ReadOnly,
    ReadWrite,
}

/// A column exposed by the upstream path attached to the input.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputColumn {
    pub name: String,
    /// Host-assigned identifier tying the column to its upstream origin.
    pub lineage_id: u32,
    pub usage: ColumnUsage,
}

impl InputColumn {
    #[must_use]
    pub fn new(name: impl Into<String>, lineage_id: u32) -> Self {
        Self {
            name: name.into(),
            lineage_id,
            usage: ColumnUsage::Ignored,
        }
    }
}

/// Shape of the input as attached by the host.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputSchema {
    attached: bool,
    columns: Vec<InputColumn>,
}

impl InputSchema {
    /// An input with no upstream path attached.
    #[must_use]
    pub fn detached() -> Self {
        Self {
            attached: false,
            columns: Vec::new(),
        }
    }

    /// An input attached to an upstream path exposing `columns`.
    #[must_use]
    pub fn attached(columns: Vec<InputColumn>) -> Self {
        Self {
            attached: true,
            columns,
        }
    }

    /// Whether the input is attached and exposes at least one column.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.attached && !self.columns.is_empty()
    }

    #[must_use]
    pub fn columns(&self) -> &[InputColumn] {
        &self.columns
    }

    /// Drop columns whose lineage no longer exists upstream. Called when the
    /// host asks the component to repair its metadata.
    pub fn retain_valid_columns(&mut self, live_lineage_ids: &[u32]) {
        self.columns
            .retain(|c| live_lineage_ids.contains(&c.lineage_id));
    }
}

/// Mark every available column read-only: the transform observes rows but
/// never edits column values. Called when the host attaches an upstream path.
pub fn on_input_attached(input: &mut InputSchema) {
    for column in &mut input.columns {
        column.usage = ColumnUsage::ReadOnly;
    }
}
