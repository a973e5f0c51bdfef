//! Shared object model built on the parameter registry
//!
//! Concrete types embed an [`ObjectBase`], implement [`Object`] (two required
//! methods) and get the whole reflective API through [`ObjectExt`].

mod base;
mod builder;
mod ext;
mod factory;
mod generic;
mod graph;
mod handle;
mod method;
mod options;
mod traits;

pub use base::{Lifecycle, ObjectBase};
pub use builder::{param, ObjectBuilder, ParameterBuilder};
pub use ext::{GradientParameter, ObjectExt};
pub use factory::{class_names, create_object, register_class, Constructor};
pub use generic::{Primitive, PrimitiveType};
pub use handle::{ObjectRef, WeakObjectRef};
pub use method::Method;
pub use options::StringEnumMap;
pub use traits::{AsObject, Object};

pub(crate) use graph::{addr_of, deep_clone, hash_object, objects_equal};
