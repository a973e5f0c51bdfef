//! Registry-driven traversals over object graphs

use super::{Object, ObjectRef};
use crate::any::{CloneContext, CompareContext, HashContext};
use crate::parameter::ParameterProperties;
use crate::{ReflexError, Result};
use std::hash::Hash;
use tracing::{debug, trace};

/// Identity key of an object, equal to [`ObjectRef::addr`] for shared objects
pub(crate) fn addr_of(object: &dyn Object) -> usize {
    object as *const dyn Object as *const () as usize
}

/// Copy `source` into a fresh instance, recursing into nested objects.
///
/// The copy is recorded in `ctx` before any parameter is copied so that
/// back-references reached during the copy resolve to it.
pub(crate) fn deep_clone(
    source: &dyn Object,
    filter: ParameterProperties,
    ctx: &mut CloneContext,
) -> Result<ObjectRef> {
    let copy = source.create_empty()?;
    ctx.remember(addr_of(source), copy.clone());
    trace!(object = source.name(), "cloning object");

    for (name, parameter) in source.base().params() {
        if !parameter.properties().matches(filter) || parameter.value().is_computed() {
            continue;
        }
        if !parameter.value().is_cloneable() {
            return Err(ReflexError::NotCloneable {
                context: format!("parameter {}::{}", source.name(), name),
                type_name: parameter.value().type_name().to_string(),
            });
        }
        let value = parameter.value().deep_clone_with(ctx)?;
        copy.base().replace_parameter(&name, parameter.with_value(value));
    }
    copy.base().set_generic_type(source.base().generic());
    Ok(copy)
}

/// Same concrete type, same parameter names, structurally equal values
pub(crate) fn objects_equal(a: &dyn Object, b: &dyn Object, ctx: &mut CompareContext) -> bool {
    if a.as_any().type_id() != b.as_any().type_id() {
        debug!(left = a.name(), right = b.name(), "objects differ in type");
        return false;
    }
    if !ctx.enter(addr_of(a), addr_of(b)) {
        return true;
    }
    if a.base().generic() != b.base().generic() {
        return false;
    }

    let left = a.base().params();
    let right = b.base().params();
    if !left.keys().eq(right.keys()) {
        debug!(object = a.name(), "objects differ in parameter names");
        return false;
    }
    for ((name, x), (_, y)) in left.iter().zip(right.iter()) {
        if x.value().is_computed() {
            continue;
        }
        if !x.value().equals_with(y.value(), ctx) {
            debug!(object = a.name(), parameter = %name, "objects differ in parameter");
            return false;
        }
    }
    true
}

/// Feed every stored parameter of `object` into the traversal hash
pub(crate) fn hash_object(object: &dyn Object, ctx: &mut HashContext) {
    object.name().hash(ctx.hasher());
    for (name, parameter) in object.base().params() {
        if parameter.value().is_computed() {
            continue;
        }
        name.hash(ctx.hasher());
        parameter.value().hash_into(ctx);
    }
}
