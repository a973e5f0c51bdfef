//! Computed parameter values

use super::{Object, ObjectRef};
use crate::any::{CloneContext, CompareContext, HashContext, ParamValue, TypedValue};
use crate::{ReflexError, Result};
use serde_json::Value;
use std::any::type_name;
use std::fmt;
use std::sync::Arc;

/// A value computed from its owning object whenever it is read.
///
/// Methods carry no state of their own: they are skipped by clone, equality,
/// hashing and serialization, and cannot be put.
pub struct Method<T> {
    f: Arc<dyn Fn(&dyn Object) -> Result<T> + Send + Sync>,
}

impl<T> Method<T> {
    /// Wrap a closure
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&dyn Object) -> Result<T> + Send + Sync + 'static,
    {
        Method { f: Arc::new(f) }
    }

    /// Evaluate against `owner`
    pub fn call(&self, owner: &dyn Object) -> Result<T> {
        (self.f)(owner)
    }
}

impl<T> Clone for Method<T> {
    fn clone(&self) -> Self {
        Method {
            f: Arc::clone(&self.f),
        }
    }
}

impl<T> fmt::Debug for Method<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Method<{}>", type_name::<T>())
    }
}

impl<T: ParamValue> ParamValue for Method<T> {
    fn cloneable() -> bool {
        false
    }

    fn computed() -> bool {
        true
    }

    fn output_type_id() -> std::any::TypeId {
        std::any::TypeId::of::<T>()
    }

    fn clone_value(&self, _ctx: &mut CloneContext) -> Result<Self> {
        Err(ReflexError::NotCloneable {
            context: "method".to_string(),
            type_name: type_name::<Self>().to_string(),
        })
    }

    fn value_eq(&self, other: &Self, _ctx: &mut CompareContext) -> bool {
        Arc::ptr_eq(&self.f, &other.f)
    }

    fn value_hash(&self, _ctx: &mut HashContext) {}

    fn to_json(&self) -> Result<Value> {
        Err(ReflexError::Serialization(format!(
            "{} is computed and cannot be encoded",
            type_name::<Self>()
        )))
    }

    fn from_json(_value: &Value) -> Result<Self> {
        Err(ReflexError::Serialization(format!(
            "{} is computed and cannot be decoded",
            type_name::<Self>()
        )))
    }

    fn visit_objects(&self, _visit: &mut dyn FnMut(&ObjectRef)) {}

    fn invoke(&self, owner: &dyn Object) -> Option<Result<TypedValue>> {
        Some(self.call(owner).map(TypedValue::new))
    }
}
