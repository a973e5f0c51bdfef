//! Per-object mapping from parameter name to descriptor

use super::{AnyParameter, BaseTag, ParameterProperties, PutCallback};
use crate::any::TypedValue;
use crate::{ReflexError, Result};
use std::any::TypeId;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{debug, warn};

/// Named parameters of one object
#[derive(Clone, Debug)]
pub struct Registry {
    owner: String,
    params: HashMap<String, Arc<AnyParameter>>,
}

impl Registry {
    /// Empty registry for an object of type `owner`
    pub fn new(owner: impl Into<String>) -> Self {
        Registry {
            owner: owner.into(),
            params: HashMap::new(),
        }
    }

    /// Type name of the owning object
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Register a new parameter; names are unique
    pub fn create(&mut self, tag: &BaseTag, parameter: AnyParameter) -> Result<()> {
        if self.params.contains_key(tag.name()) {
            return Err(ReflexError::PreconditionFailure(format!(
                "Parameter {}::{} is already registered",
                self.owner, tag
            )));
        }
        debug!(
            object = %self.owner,
            parameter = %tag,
            properties = ?parameter.properties().mask(),
            "registering parameter"
        );
        self.params.insert(tag.name().to_string(), Arc::new(parameter));
        Ok(())
    }

    /// Whether a parameter with this name exists
    pub fn has(&self, name: &str) -> bool {
        self.params.contains_key(name)
    }

    /// Whether a parameter exists and reads as a `T`
    pub fn has_typed<T: 'static>(&self, name: &str) -> bool {
        self.params
            .get(name)
            .map(|p| p.value().output_type_id() == TypeId::of::<T>())
            .unwrap_or(false)
    }

    /// Descriptor for `tag`
    pub fn get(&self, tag: &BaseTag) -> Result<Arc<AnyParameter>> {
        self.params
            .get(tag.name())
            .cloned()
            .ok_or_else(|| self.not_found(tag.name()))
    }

    /// Replace a value after type, read-only and constraint checks.
    ///
    /// Returns the previous descriptor so the caller can release the old
    /// value after dropping any lock on the registry.
    pub fn update(&mut self, tag: &BaseTag, value: TypedValue) -> Result<Arc<AnyParameter>> {
        let current = self.get(tag)?;
        check_update(&self.owner, tag, &current, &value)?;
        match self.commit(tag, &current, value) {
            Ok((previous, _)) => Ok(previous),
            Err(_) => Err(self.not_found(tag.name())),
        }
    }

    /// Store `value` if `expected` is still the live descriptor for `tag`.
    ///
    /// Returns `(previous, stored)` descriptors, or hands `value` back when
    /// the descriptor was replaced since `expected` was read.
    pub(crate) fn commit(
        &mut self,
        tag: &BaseTag,
        expected: &Arc<AnyParameter>,
        value: TypedValue,
    ) -> std::result::Result<(Arc<AnyParameter>, Arc<AnyParameter>), TypedValue> {
        let slot = match self.params.get_mut(tag.name()) {
            Some(slot) if Arc::ptr_eq(slot, expected) => slot,
            _ => return Err(value),
        };
        let mut next = expected.with_value(value);
        next.properties_mut()
            .remove_property(ParameterProperties::AUTO);
        let next = Arc::new(next);
        let previous = std::mem::replace(slot, Arc::clone(&next));
        debug!(object = %self.owner, parameter = %tag, "updated parameter");
        Ok((previous, next))
    }

    /// Attach a put callback to an existing parameter
    pub(crate) fn add_callback(
        &mut self,
        tag: &BaseTag,
        callback: PutCallback,
    ) -> Result<Arc<AnyParameter>> {
        let current = self.get(tag)?;
        let next = AnyParameter::clone(&current).with_callback(callback);
        self.params.insert(tag.name().to_string(), Arc::new(next));
        debug!(object = %self.owner, parameter = %tag, "added callback");
        Ok(current)
    }

    /// Insert or overwrite a descriptor without checks
    pub(crate) fn replace(&mut self, name: &str, parameter: AnyParameter) -> Option<Arc<AnyParameter>> {
        self.params.insert(name.to_string(), Arc::new(parameter))
    }

    /// Snapshot of all descriptors, sorted by name
    pub fn params(&self) -> BTreeMap<String, Arc<AnyParameter>> {
        self.params
            .iter()
            .map(|(name, p)| (name.clone(), Arc::clone(p)))
            .collect()
    }

    /// Snapshot of descriptors matching a property filter
    pub fn filtered(&self, filter: ParameterProperties) -> BTreeMap<String, Arc<AnyParameter>> {
        self.params
            .iter()
            .filter(|(_, p)| p.properties().matches(filter))
            .map(|(name, p)| (name.clone(), Arc::clone(p)))
            .collect()
    }

    /// Sorted parameter names
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.params.keys().cloned().collect();
        names.sort();
        names
    }

    /// Number of parameters
    pub fn len(&self) -> usize {
        self.params.len()
    }

    /// No parameters registered
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub(crate) fn not_found(&self, name: &str) -> ReflexError {
        ReflexError::ParameterNotFound {
            object: self.owner.clone(),
            name: name.to_string(),
        }
    }
}

/// Type, read-only and constraint checks of `value` against `current`.
///
/// Runs user constraints, so callers must not hold a registry lock.
pub(crate) fn check_update(
    owner: &str,
    tag: &BaseTag,
    current: &AnyParameter,
    value: &TypedValue,
) -> Result<()> {
    if current.value().output_type_id() != value.type_id() {
        return Err(ReflexError::TypeMismatch {
            context: format!("parameter {}::{}", owner, tag),
            expected: current.value().type_name().to_string(),
            actual: value.type_name().to_string(),
        });
    }
    if current.has_property(ParameterProperties::READONLY) || current.value().is_computed() {
        return Err(ReflexError::PreconditionFailure(format!(
            "Parameter {}::{} is read-only",
            owner, tag
        )));
    }
    if let Err(reason) = current.validate(value) {
        warn!(object = %owner, parameter = %tag, %reason, "rejected parameter value");
        return Err(ReflexError::ConstraintViolation {
            object: owner.to_string(),
            name: tag.name().to_string(),
            reason,
        });
    }
    Ok(())
}
