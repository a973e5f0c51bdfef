//! The object trait every reflective type implements

use super::{ObjectBase, ObjectRef};
use crate::Result;
use std::any::Any;
use std::sync::Arc;

/// Upcasts available on every object, including `dyn Object`
pub trait AsObject {
    /// View as a trait object
    fn as_object(&self) -> &dyn Object;

    /// View as `Any` for checked downcasts
    fn as_any(&self) -> &dyn Any;

    /// Convert a shared handle for checked downcasts
    fn into_any_arc(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

impl<T: Object> AsObject for T {
    fn as_object(&self) -> &dyn Object {
        self
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any_arc(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

/// A reflective, shareable object.
///
/// Implementors own an [`ObjectBase`] holding all registered state and
/// provide a factory for empty instances of their own concrete type, which
/// cloning and deserialization start from.
///
/// The four serialization hooks may be overridden to fix up state that is
/// not registered as a parameter. Overrides must call the matching
/// `ObjectBase` method first.
pub trait Object: AsObject + Send + Sync + 'static {
    /// Registry and bookkeeping
    fn base(&self) -> &ObjectBase;

    /// New instance of the same concrete type with default parameters
    fn create_empty(&self) -> Result<ObjectRef>;

    /// Class name
    fn name(&self) -> &'static str {
        self.base().name()
    }

    /// Runs before parameters are loaded
    fn load_serializable_pre(&self) -> Result<()> {
        self.base().load_serializable_pre()
    }

    /// Runs after parameters are loaded
    fn load_serializable_post(&self) -> Result<()> {
        self.base().load_serializable_post()
    }

    /// Runs before parameters are saved
    fn save_serializable_pre(&self) -> Result<()> {
        self.base().save_serializable_pre()
    }

    /// Runs after parameters are saved
    fn save_serializable_post(&self) -> Result<()> {
        self.base().save_serializable_post()
    }
}
