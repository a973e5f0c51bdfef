//! Parameter descriptor: value plus metadata

use super::{AnyParameterProperties, AutoInit, ConstraintFn, ParameterProperties};
use crate::any::TypedValue;
use crate::object::Object;
use std::fmt;
use std::sync::Arc;

/// Reaction to a successful put of one parameter
pub type PutCallback = Arc<dyn Fn(&dyn Object) -> crate::Result<()> + Send + Sync>;

/// One registered parameter.
///
/// Descriptors are immutable once stored; a put swaps in a new descriptor
/// that shares the constraint, initializer and callbacks of the old one.
#[derive(Clone)]
pub struct AnyParameter {
    value: TypedValue,
    properties: AnyParameterProperties,
    constraint: Option<ConstraintFn>,
    auto_init: Option<Arc<dyn AutoInit>>,
    callbacks: Vec<PutCallback>,
}

impl AnyParameter {
    /// Plain parameter
    pub fn new(value: TypedValue, properties: AnyParameterProperties) -> Self {
        AnyParameter {
            value,
            properties,
            constraint: None,
            auto_init: None,
            callbacks: Vec::new(),
        }
    }

    /// Attach a constraint; sets CONSTRAIN
    pub fn with_constraint(mut self, constraint: ConstraintFn) -> Self {
        self.properties.set_property(ParameterProperties::CONSTRAIN);
        self.constraint = Some(constraint);
        self
    }

    /// Attach an auto-initializer; sets AUTO
    pub fn with_auto_init(mut self, auto_init: Arc<dyn AutoInit>) -> Self {
        self.properties.set_property(ParameterProperties::AUTO);
        self.auto_init = Some(auto_init);
        self
    }

    /// Run `callback` after every successful put
    pub fn with_callback(mut self, callback: PutCallback) -> Self {
        self.callbacks.push(callback);
        self
    }

    /// Same metadata, different value
    pub fn with_value(&self, value: TypedValue) -> Self {
        AnyParameter {
            value,
            properties: self.properties.clone(),
            constraint: self.constraint.clone(),
            auto_init: self.auto_init.clone(),
            callbacks: self.callbacks.clone(),
        }
    }

    /// Stored value
    pub fn value(&self) -> &TypedValue {
        &self.value
    }

    /// Description and flags
    pub fn properties(&self) -> &AnyParameterProperties {
        &self.properties
    }

    pub(crate) fn properties_mut(&mut self) -> &mut AnyParameterProperties {
        &mut self.properties
    }

    /// Shorthand for `properties().has_property(..)`
    pub fn has_property(&self, property: ParameterProperties) -> bool {
        self.properties.has_property(property)
    }

    /// Auto-initializer, if any
    pub fn auto_init(&self) -> Option<&Arc<dyn AutoInit>> {
        self.auto_init.as_ref()
    }

    /// Put callbacks in registration order
    pub fn callbacks(&self) -> &[PutCallback] {
        &self.callbacks
    }

    /// Run the constraint, if any, against a candidate value
    pub fn validate(&self, candidate: &TypedValue) -> Result<(), String> {
        match &self.constraint {
            Some(check) => check(candidate),
            None => Ok(()),
        }
    }
}

impl fmt::Debug for AnyParameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnyParameter")
            .field("value", &self.value)
            .field("properties", &self.properties)
            .field("constrained", &self.constraint.is_some())
            .field("auto_init", &self.auto_init.as_ref().map(|a| a.name().to_string()))
            .field("callbacks", &self.callbacks.len())
            .finish()
    }
}
