//! Shared and weak handles to objects

use super::{Object, ObjectExt};
use crate::any::{CloneContext, CompareContext, HashContext, ParamValue};
use crate::{ReflexError, Result};
use serde_json::Value;
use std::any::type_name;
use std::fmt;
use std::hash::Hash;
use std::ops::Deref;
use std::sync::{Arc, Weak};

/// Shared, reference-counted handle to an object.
///
/// Cloning the handle is the `ref` operation; dropping it (or calling
/// [`ObjectRef::unref`]) is `unref`. The object is destroyed when the last
/// strong handle goes away.
#[derive(Clone)]
pub struct ObjectRef(Arc<dyn Object>);

impl ObjectRef {
    /// Share a new object
    pub fn new<T: Object>(object: T) -> Self {
        ObjectRef(Arc::new(object))
    }

    /// Wrap an existing shared object
    pub fn from_arc<T: Object>(object: Arc<T>) -> Self {
        ObjectRef(object)
    }

    /// Borrow as a trait object
    pub fn as_object(&self) -> &dyn Object {
        &*self.0
    }

    /// Number of strong handles
    pub fn ref_count(&self) -> usize {
        Arc::strong_count(&self.0)
    }

    /// Take another strong handle
    pub fn share(&self) -> ObjectRef {
        self.clone()
    }

    /// Release this handle and return how many strong handles remain.
    ///
    /// Zero means the object has been destroyed.
    pub fn unref(self) -> usize {
        let weak = Arc::downgrade(&self.0);
        drop(self);
        weak.strong_count()
    }

    /// Non-owning handle
    pub fn downgrade(&self) -> WeakObjectRef {
        WeakObjectRef(Some(Arc::downgrade(&self.0)))
    }

    /// Identity comparison
    pub fn ptr_eq(&self, other: &ObjectRef) -> bool {
        self.addr() == other.addr()
    }

    /// Address of the shared allocation, used as identity key
    pub fn addr(&self) -> usize {
        Arc::as_ptr(&self.0) as *const () as usize
    }

    /// Checked downcast to a concrete type
    pub fn downcast<T: Object>(&self) -> Result<Arc<T>> {
        Arc::clone(&self.0)
            .into_any_arc()
            .downcast::<T>()
            .map_err(|_| ReflexError::TypeMismatch {
                context: format!("cast of object {}", self.0.name()),
                expected: type_name::<T>().to_string(),
                actual: self.0.name().to_string(),
            })
    }
}

impl Deref for ObjectRef {
    type Target = dyn Object;

    fn deref(&self) -> &Self::Target {
        &*self.0
    }
}

impl<T: Object> From<Arc<T>> for ObjectRef {
    fn from(object: Arc<T>) -> Self {
        ObjectRef(object)
    }
}

impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.describe())
    }
}

impl ParamValue for ObjectRef {
    fn clone_value(&self, ctx: &mut CloneContext) -> Result<Self> {
        ctx.clone_object(self)
    }

    fn value_eq(&self, other: &Self, ctx: &mut CompareContext) -> bool {
        ctx.compare_objects(self, other)
    }

    fn value_hash(&self, ctx: &mut HashContext) {
        ctx.hash_object(self);
    }

    fn to_json(&self) -> Result<Value> {
        crate::io::object_to_json(self.as_object())
    }

    fn from_json(value: &Value) -> Result<Self> {
        crate::io::object_from_json(value)
    }

    fn visit_objects(&self, visit: &mut dyn FnMut(&ObjectRef)) {
        visit(self);
    }
}

/// Non-owning handle for back-links such as parent pointers.
///
/// Weak links never keep their target alive, are redirected to the copy
/// when their target is cloned in the same traversal, and are not persisted
/// by serialization.
#[derive(Clone, Default)]
pub struct WeakObjectRef(Option<Weak<dyn Object>>);

impl WeakObjectRef {
    /// Link to nothing
    pub fn empty() -> Self {
        WeakObjectRef(None)
    }

    /// Strong handle if the target is still alive
    pub fn upgrade(&self) -> Option<ObjectRef> {
        self.0.as_ref().and_then(Weak::upgrade).map(ObjectRef)
    }

    /// Address of the target allocation
    pub fn addr(&self) -> Option<usize> {
        self.0.as_ref().map(|w| Weak::as_ptr(w) as *const () as usize)
    }
}

impl fmt::Debug for WeakObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.upgrade() {
            Some(target) => write!(f, "Weak({})", target.name()),
            None => write!(f, "Weak(None)"),
        }
    }
}

impl ParamValue for WeakObjectRef {
    fn clone_value(&self, ctx: &mut CloneContext) -> Result<Self> {
        let copy = self.addr().and_then(|addr| ctx.lookup(addr));
        Ok(match copy {
            Some(copy) => copy.downgrade(),
            None => self.clone(),
        })
    }

    fn value_eq(&self, other: &Self, ctx: &mut CompareContext) -> bool {
        match (self.upgrade(), other.upgrade()) {
            (Some(a), Some(b)) => ctx.compare_objects(&a, &b),
            (None, None) => true,
            _ => false,
        }
    }

    fn value_hash(&self, ctx: &mut HashContext) {
        self.upgrade().is_some().hash(ctx.hasher());
    }

    fn to_json(&self) -> Result<Value> {
        Ok(Value::Null)
    }

    fn from_json(_value: &Value) -> Result<Self> {
        Ok(WeakObjectRef::empty())
    }
}
