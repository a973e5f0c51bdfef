//! Lazily computed defaults for AUTO parameters

use crate::any::{ParamValue, TypedValue};
use crate::object::Object;
use crate::Result;
use std::fmt;
use std::sync::Arc;

/// Computes a parameter value from the state of its owner
pub trait AutoInit: Send + Sync {
    /// Short name of the heuristic
    fn name(&self) -> &str;

    /// What the heuristic does
    fn description(&self) -> &str;

    /// Compute the value
    fn compute(&self, owner: &dyn Object) -> Result<TypedValue>;
}

/// [`AutoInit`] backed by a closure returning a `T`
pub struct AutoValue<T> {
    name: String,
    description: String,
    compute: Arc<dyn Fn(&dyn Object) -> Result<T> + Send + Sync>,
}

impl<T: ParamValue> AutoValue<T> {
    /// Wrap a closure
    pub fn new<F>(name: impl Into<String>, description: impl Into<String>, compute: F) -> Self
    where
        F: Fn(&dyn Object) -> Result<T> + Send + Sync + 'static,
    {
        AutoValue {
            name: name.into(),
            description: description.into(),
            compute: Arc::new(compute),
        }
    }
}

impl<T: ParamValue> AutoInit for AutoValue<T> {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn compute(&self, owner: &dyn Object) -> Result<TypedValue> {
        (self.compute)(owner).map(TypedValue::new)
    }
}

impl<T> fmt::Debug for AutoValue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AutoValue")
            .field("name", &self.name)
            .field("description", &self.description)
            .finish()
    }
}
