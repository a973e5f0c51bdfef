//! State shared by every object: registry, options, observers, bookkeeping

use super::builder::{ObjectBuilder, ParameterBuilder};
use super::{Primitive, PrimitiveType, StringEnumMap};
use crate::any::{ParamValue, TypedValue};
use crate::observe::ObservationChannel;
use crate::parameter::{
    check_update, AnyParameter, BaseTag, ParameterProperties, PutCallback, Registry,
};
use crate::Result;
use parking_lot::{RwLock, RwLockReadGuard};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

/// Which serialization hooks have run
#[derive(Debug, Default)]
pub struct Lifecycle {
    load_pre: AtomicBool,
    load_post: AtomicBool,
    save_pre: AtomicBool,
    save_post: AtomicBool,
}

impl Lifecycle {
    /// `load_serializable_pre` ran
    pub fn load_pre_called(&self) -> bool {
        self.load_pre.load(Ordering::Acquire)
    }

    /// `load_serializable_post` ran
    pub fn load_post_called(&self) -> bool {
        self.load_post.load(Ordering::Acquire)
    }

    /// `save_serializable_pre` ran
    pub fn save_pre_called(&self) -> bool {
        self.save_pre.load(Ordering::Acquire)
    }

    /// `save_serializable_post` ran
    pub fn save_post_called(&self) -> bool {
        self.save_post.load(Ordering::Acquire)
    }
}

/// Registry and bookkeeping embedded in every object.
///
/// All methods take `&self`; each table sits behind its own lock and no lock
/// is held while user code (constraints, observers, computed values) runs.
#[derive(Debug)]
pub struct ObjectBase {
    name: &'static str,
    registry: RwLock<Registry>,
    options: RwLock<StringEnumMap>,
    observables: RwLock<BTreeMap<String, String>>,
    channel: ObservationChannel,
    hash: AtomicU64,
    generic: RwLock<Option<PrimitiveType>>,
    lifecycle: Lifecycle,
    default_mask: ParameterProperties,
}

impl ObjectBase {
    /// Empty base for class `name`
    pub fn new(name: &'static str) -> Self {
        ObjectBase {
            name,
            registry: RwLock::new(Registry::new(name)),
            options: RwLock::new(StringEnumMap::default()),
            observables: RwLock::new(BTreeMap::new()),
            channel: ObservationChannel::new(),
            hash: AtomicU64::new(0),
            generic: RwLock::new(None),
            lifecycle: Lifecycle::default(),
            default_mask: ParameterProperties::NONE,
        }
    }

    /// Chainable registration for class `name`
    pub fn builder(name: &'static str) -> ObjectBuilder {
        ObjectBuilder::new(ObjectBase::new(name))
    }

    /// Class name
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Read access to the registry
    pub fn registry(&self) -> RwLockReadGuard<'_, Registry> {
        self.registry.read()
    }

    /// Descriptor for `tag`, released from the lock
    pub fn parameter(&self, tag: &BaseTag) -> Result<Arc<AnyParameter>> {
        self.registry.read().get(tag)
    }

    /// Sorted snapshot of all descriptors
    pub fn params(&self) -> BTreeMap<String, Arc<AnyParameter>> {
        self.registry.read().params()
    }

    /// Register a parameter after construction; the initial value must pass
    /// the parameter's constraint
    pub fn watch<T: ParamValue>(&self, parameter: ParameterBuilder<T>) -> Result<()> {
        let (tag, parameter) = parameter.build(self.name, self.default_mask)?;
        self.registry.write().create(&tag, parameter)
    }

    /// Register an already assembled descriptor
    pub fn create_parameter(&self, tag: &BaseTag, parameter: AnyParameter) -> Result<()> {
        self.registry.write().create(tag, parameter)
    }

    /// Checked write, returning the stored descriptor.
    ///
    /// Checks run without the registry lock; the write lock is only taken to
    /// swap descriptors, and the previous value is released after it.
    pub fn update_parameter(
        &self,
        tag: &BaseTag,
        value: TypedValue,
    ) -> Result<Arc<AnyParameter>> {
        let mut value = value;
        loop {
            let current = self.parameter(tag)?;
            check_update(self.name, tag, &current, &value)?;
            let committed = self.registry.write().commit(tag, &current, value);
            match committed {
                Ok((previous, stored)) => {
                    drop(previous);
                    return Ok(stored);
                }
                Err(rejected) => value = rejected,
            }
        }
    }

    /// Run `callback` after every successful put of `tag`
    pub fn add_callback(&self, tag: &BaseTag, callback: PutCallback) -> Result<()> {
        let previous = self.registry.write().add_callback(tag, callback)?;
        drop(previous);
        Ok(())
    }

    pub(crate) fn replace_parameter(&self, name: &str, parameter: AnyParameter) {
        let previous = self.registry.write().replace(name, parameter);
        drop(previous);
    }

    pub(crate) fn set_default_mask(&mut self, mask: ParameterProperties) {
        self.default_mask = mask;
    }

    /// Mask OR-ed into every parameter registered from now on
    pub fn default_mask(&self) -> ParameterProperties {
        self.default_mask
    }

    /// Map a string option to an integer code for parameter `param`
    pub fn add_option(&self, param: &str, option: &str, code: i64) -> Result<()> {
        self.options.write().add(self.name, param, option, code)
    }

    /// Read access to the option table
    pub fn options(&self) -> RwLockReadGuard<'_, StringEnumMap> {
        self.options.read()
    }

    /// Declare a value the object emits while running
    pub fn register_observable(&self, name: &str, description: &str) {
        self.observables
            .write()
            .insert(name.to_string(), description.to_string());
    }

    /// Declared observables with their descriptions
    pub fn observables(&self) -> BTreeMap<String, String> {
        self.observables.read().clone()
    }

    /// Subscription table
    pub fn channel(&self) -> &ObservationChannel {
        &self.channel
    }

    /// Mark this object as a template instantiated for `T`
    pub fn set_generic<T: Primitive>(&self) {
        *self.generic.write() = Some(T::PRIMITIVE);
    }

    /// Set or clear the generic marker
    pub fn set_generic_type(&self, generic: Option<PrimitiveType>) {
        *self.generic.write() = generic;
    }

    /// Clear the generic marker
    pub fn unset_generic(&self) {
        *self.generic.write() = None;
    }

    /// Element type if this is a template instance
    pub fn generic(&self) -> Option<PrimitiveType> {
        *self.generic.read()
    }

    pub(crate) fn stored_hash(&self) -> u64 {
        self.hash.load(Ordering::Acquire)
    }

    pub(crate) fn store_hash(&self, hash: u64) {
        self.hash.store(hash, Ordering::Release);
    }

    /// Which serialization hooks have run
    pub fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    /// Base part of [`Object::load_serializable_pre`](super::Object::load_serializable_pre)
    pub fn load_serializable_pre(&self) -> Result<()> {
        self.lifecycle.load_pre.store(true, Ordering::Release);
        Ok(())
    }

    /// Base part of [`Object::load_serializable_post`](super::Object::load_serializable_post)
    pub fn load_serializable_post(&self) -> Result<()> {
        self.lifecycle.load_post.store(true, Ordering::Release);
        Ok(())
    }

    /// Base part of [`Object::save_serializable_pre`](super::Object::save_serializable_pre)
    pub fn save_serializable_pre(&self) -> Result<()> {
        self.lifecycle.save_pre.store(true, Ordering::Release);
        Ok(())
    }

    /// Base part of [`Object::save_serializable_post`](super::Object::save_serializable_post)
    pub fn save_serializable_post(&self) -> Result<()> {
        self.lifecycle.save_post.store(true, Ordering::Release);
        Ok(())
    }
}
