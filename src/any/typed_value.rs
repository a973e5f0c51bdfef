//! Checked "any" container

use super::{CloneContext, CompareContext, HashContext, ParamValue};
use crate::object::{Object, ObjectRef};
use crate::{ReflexError, Result};
use serde_json::Value;
use std::any::{type_name, Any, TypeId};
use std::fmt;
use std::hash::Hash;

/// Object-safe view of a [`ParamValue`]
trait ErasedValue: Send + Sync {
    fn as_any(&self) -> &dyn Any;
    fn type_name(&self) -> &'static str;
    fn is_cloneable(&self) -> bool;
    fn is_computed(&self) -> bool;
    fn output_type_id(&self) -> TypeId;
    fn shallow_clone(&self) -> Box<dyn ErasedValue>;
    fn deep_clone(&self, ctx: &mut CloneContext) -> Result<Box<dyn ErasedValue>>;
    fn equals(&self, other: &dyn ErasedValue, ctx: &mut CompareContext) -> bool;
    fn hash_into(&self, ctx: &mut HashContext);
    fn to_json(&self) -> Result<Value>;
    fn decode_json(&self, value: &Value) -> Result<Box<dyn ErasedValue>>;
    fn visit_objects(&self, visit: &mut dyn FnMut(&ObjectRef));
    fn invoke(&self, owner: &dyn Object) -> Option<Result<TypedValue>>;
    fn fmt_debug(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result;
}

struct Holder<T>(T);

impl<T: ParamValue> ErasedValue for Holder<T> {
    fn as_any(&self) -> &dyn Any {
        &self.0
    }

    fn type_name(&self) -> &'static str {
        type_name::<T>()
    }

    fn is_cloneable(&self) -> bool {
        T::cloneable()
    }

    fn is_computed(&self) -> bool {
        T::computed()
    }

    fn output_type_id(&self) -> TypeId {
        T::output_type_id()
    }

    fn shallow_clone(&self) -> Box<dyn ErasedValue> {
        Box::new(Holder(self.0.clone()))
    }

    fn deep_clone(&self, ctx: &mut CloneContext) -> Result<Box<dyn ErasedValue>> {
        if !T::cloneable() {
            return Err(ReflexError::NotCloneable {
                context: "value".to_string(),
                type_name: type_name::<T>().to_string(),
            });
        }
        Ok(Box::new(Holder(self.0.clone_value(ctx)?)))
    }

    fn equals(&self, other: &dyn ErasedValue, ctx: &mut CompareContext) -> bool {
        match other.as_any().downcast_ref::<T>() {
            Some(other) => self.0.value_eq(other, ctx),
            None => false,
        }
    }

    fn hash_into(&self, ctx: &mut HashContext) {
        self.0.value_hash(ctx);
    }

    fn to_json(&self) -> Result<Value> {
        self.0.to_json()
    }

    fn decode_json(&self, value: &Value) -> Result<Box<dyn ErasedValue>> {
        Ok(Box::new(Holder(T::from_json(value)?)))
    }

    fn visit_objects(&self, visit: &mut dyn FnMut(&ObjectRef)) {
        self.0.visit_objects(visit);
    }

    fn invoke(&self, owner: &dyn Object) -> Option<Result<TypedValue>> {
        self.0.invoke(owner)
    }

    fn fmt_debug(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.0, f)
    }
}

/// A single value of any [`ParamValue`] type, tagged with its runtime type.
///
/// Extraction compares type identity exactly; an `i32` is never handed out
/// as an `i64`. `Clone` copies the handle shallowly (objects stay shared),
/// [`TypedValue::deep_clone`] produces an independent copy.
pub struct TypedValue {
    inner: Box<dyn ErasedValue>,
}

impl TypedValue {
    /// Wrap a value
    pub fn new<T: ParamValue>(value: T) -> Self {
        TypedValue {
            inner: Box::new(Holder(value)),
        }
    }

    /// Runtime identity of the stored type
    pub fn type_id(&self) -> TypeId {
        self.inner.as_any().type_id()
    }

    /// Name of the stored type
    pub fn type_name(&self) -> &'static str {
        self.inner.type_name()
    }

    /// Whether the stored type is exactly `T`
    pub fn has_type<T: 'static>(&self) -> bool {
        self.inner.as_any().is::<T>()
    }

    /// Borrow the value if it is a `T`
    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        self.inner.as_any().downcast_ref::<T>()
    }

    /// Copy the value out as a `T`
    pub fn extract<T: ParamValue>(&self) -> Result<T> {
        self.downcast_ref::<T>()
            .cloned()
            .ok_or_else(|| ReflexError::TypeMismatch {
                context: "typed value".to_string(),
                expected: type_name::<T>().to_string(),
                actual: self.type_name().to_string(),
            })
    }

    /// Whether a deep copy can be made
    pub fn is_cloneable(&self) -> bool {
        self.inner.is_cloneable()
    }

    /// Whether this holds a computed (method) value
    pub fn is_computed(&self) -> bool {
        self.inner.is_computed()
    }

    /// Type a read produces; the result type for computed values
    pub fn output_type_id(&self) -> TypeId {
        self.inner.output_type_id()
    }

    /// Independent deep copy
    pub fn deep_clone(&self) -> Result<TypedValue> {
        self.deep_clone_with(&mut CloneContext::new())
    }

    /// Deep copy within an ongoing clone traversal
    pub fn deep_clone_with(&self, ctx: &mut CloneContext) -> Result<TypedValue> {
        Ok(TypedValue {
            inner: self.inner.deep_clone(ctx)?,
        })
    }

    /// Structural equality; values of different types are never equal
    pub fn equals(&self, other: &TypedValue) -> bool {
        self.equals_with(other, &mut CompareContext::new())
    }

    /// Structural equality within an ongoing comparison
    pub fn equals_with(&self, other: &TypedValue, ctx: &mut CompareContext) -> bool {
        self.inner.equals(other.inner.as_ref(), ctx)
    }

    /// Feed the value into a hash traversal
    pub fn hash_into(&self, ctx: &mut HashContext) {
        self.type_name().hash(ctx.hasher());
        self.inner.hash_into(ctx);
    }

    /// Encode as JSON
    pub fn to_json(&self) -> Result<Value> {
        self.inner.to_json()
    }

    /// Decode JSON into a new value of the same type as `self`
    pub fn decode_json(&self, value: &Value) -> Result<TypedValue> {
        Ok(TypedValue {
            inner: self.inner.decode_json(value)?,
        })
    }

    /// Visit every object handle held by the value
    pub fn visit_objects(&self, visit: &mut dyn FnMut(&ObjectRef)) {
        self.inner.visit_objects(visit);
    }

    /// Evaluate a computed value; `None` for stored values
    pub fn invoke(&self, owner: &dyn Object) -> Option<Result<TypedValue>> {
        self.inner.invoke(owner)
    }
}

impl Clone for TypedValue {
    fn clone(&self) -> Self {
        TypedValue {
            inner: self.inner.shallow_clone(),
        }
    }
}

impl fmt::Debug for TypedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.inner.fmt_debug(f)
    }
}
