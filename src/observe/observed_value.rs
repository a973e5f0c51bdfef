//! One emitted snapshot

use crate::any::{ParamValue, TypedValue};
use crate::parameter::ParameterProperties;
use crate::Result;

/// Immutable snapshot of a value at one step
#[derive(Clone, Debug)]
pub struct ObservedValue {
    step: i64,
    name: String,
    value: TypedValue,
    description: String,
    properties: ParameterProperties,
}

impl ObservedValue {
    /// New record; `value` should already be an independent copy
    pub fn new(
        step: i64,
        name: impl Into<String>,
        value: TypedValue,
        description: impl Into<String>,
        properties: ParameterProperties,
    ) -> Self {
        ObservedValue {
            step,
            name: name.into(),
            value,
            description: description.into(),
            properties,
        }
    }

    /// Step the value was taken at, -1 if unknown
    pub fn step(&self) -> i64 {
        self.step
    }

    /// Name of the observed quantity
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The snapshot
    pub fn value(&self) -> &TypedValue {
        &self.value
    }

    /// Typed copy of the snapshot
    pub fn get<T: ParamValue>(&self) -> Result<T> {
        self.value.extract()
    }

    /// Description of the observed quantity
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Properties of the source parameter, NONE for ad hoc values
    pub fn properties(&self) -> ParameterProperties {
        self.properties
    }
}
