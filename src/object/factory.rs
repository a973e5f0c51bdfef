//! Process-wide class factory

use super::ObjectRef;
use crate::{ReflexError, Result};
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use std::collections::HashMap;
use tracing::debug;

/// Builds an empty instance of one class
pub type Constructor = fn() -> Result<ObjectRef>;

static CLASSES: Lazy<RwLock<HashMap<String, Constructor>>> = Lazy::new(|| {
    let classes = crate::models::builtin_classes()
        .into_iter()
        .map(|(name, ctor)| (name.to_string(), ctor))
        .collect();
    RwLock::new(classes)
});

/// Make `name` constructible through [`create_object`]; replaces any
/// previous constructor
pub fn register_class(name: &str, constructor: Constructor) {
    debug!(class = name, "registering class");
    CLASSES.write().insert(name.to_string(), constructor);
}

/// New instance of class `name` with default parameters
pub fn create_object(name: &str) -> Result<ObjectRef> {
    let constructor = CLASSES
        .read()
        .get(name)
        .copied()
        .ok_or_else(|| ReflexError::UnknownClass(name.to_string()))?;
    constructor()
}

/// Sorted names of all registered classes
pub fn class_names() -> Vec<String> {
    let mut names: Vec<String> = CLASSES.read().keys().cloned().collect();
    names.sort();
    names
}
