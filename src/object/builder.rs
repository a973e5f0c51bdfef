//! Chainable parameter registration

use super::{Method, Object, ObjectBase, Primitive};
use crate::any::{ParamValue, TypedValue};
use crate::parameter::{
    constraint, AnyParameter, AnyParameterProperties, AutoInit, BaseTag, Constrain, ConstraintFn,
    ParameterProperties, Tag,
};
use crate::{ReflexError, Result};
use std::sync::Arc;

/// Registration record for one parameter, see [`param`]
pub struct ParameterBuilder<T> {
    tag: Tag<T>,
    value: T,
    description: String,
    properties: ParameterProperties,
    constraint: Option<ConstraintFn>,
    auto_init: Option<Arc<dyn AutoInit>>,
}

/// Start registering parameter `tag` with initial `value`
pub fn param<T: ParamValue>(tag: impl Into<Tag<T>>, value: T) -> ParameterBuilder<T> {
    ParameterBuilder {
        tag: tag.into(),
        value,
        description: String::new(),
        properties: ParameterProperties::NONE,
        constraint: None,
        auto_init: None,
    }
}

impl<T: ParamValue> ParameterBuilder<T> {
    /// User-facing description
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Add property flags
    pub fn properties(mut self, properties: ParameterProperties) -> Self {
        self.properties |= properties;
        self
    }

    /// Mark as hyperparameter
    pub fn hyper(self) -> Self {
        self.properties(ParameterProperties::HYPER)
    }

    /// Mark as having a gradient
    pub fn gradient(self) -> Self {
        self.properties(ParameterProperties::GRADIENT)
    }

    /// Mark as learned model state
    pub fn model(self) -> Self {
        self.properties(ParameterProperties::MODEL)
    }

    /// Reject puts
    pub fn readonly(self) -> Self {
        self.properties(ParameterProperties::READONLY)
    }

    /// Validate every put
    pub fn constrain(mut self, check: impl Constrain<T> + 'static) -> Self {
        self.constraint = Some(constraint::erase::<T, _>(check));
        self
    }

    /// Compute the value on `init_auto_params` until the user sets one
    pub fn auto(mut self, init: impl AutoInit + 'static) -> Self {
        self.auto_init = Some(Arc::new(init));
        self
    }

    pub(crate) fn build(
        self,
        owner: &str,
        default_mask: ParameterProperties,
    ) -> Result<(BaseTag, AnyParameter)> {
        let properties =
            AnyParameterProperties::new(self.description, self.properties | default_mask);
        let mut parameter = AnyParameter::new(TypedValue::new(self.value), properties);
        if let Some(check) = self.constraint {
            parameter = parameter.with_constraint(check);
        }
        if let Some(init) = self.auto_init {
            parameter = parameter.with_auto_init(init);
        }
        if let Err(reason) = parameter.validate(parameter.value()) {
            return Err(ReflexError::ConstraintViolation {
                object: owner.to_string(),
                name: self.tag.name().to_string(),
                reason,
            });
        }
        Ok((self.tag.base(), parameter))
    }
}

/// Builds an [`ObjectBase`], collecting the first registration error
pub struct ObjectBuilder {
    base: ObjectBase,
    error: Option<ReflexError>,
}

impl ObjectBuilder {
    pub(crate) fn new(base: ObjectBase) -> Self {
        ObjectBuilder { base, error: None }
    }

    fn record(&mut self, result: Result<()>) {
        if let Err(e) = result {
            self.error.get_or_insert(e);
        }
    }

    /// Properties OR-ed into every parameter registered afterwards
    pub fn default_mask(mut self, mask: ParameterProperties) -> Self {
        self.base.set_default_mask(mask);
        self
    }

    /// Register a stored parameter
    pub fn watch<T: ParamValue>(mut self, parameter: ParameterBuilder<T>) -> Self {
        let result = self.base.watch(parameter);
        self.record(result);
        self
    }

    /// Register a read-only value computed from the object on every get
    pub fn method<T, F>(mut self, name: &'static str, f: F) -> Self
    where
        T: ParamValue,
        F: Fn(&dyn Object) -> Result<T> + Send + Sync + 'static,
    {
        let parameter = AnyParameter::new(
            TypedValue::new(Method::new(f)),
            AnyParameterProperties::new("Dynamic parameter", ParameterProperties::READONLY),
        );
        let result = self.base.create_parameter(&BaseTag::new(name), parameter);
        self.record(result);
        self
    }

    /// Register a function invokable through `run`; returning `false` fails the run
    pub fn run_function<F>(mut self, name: &'static str, f: F) -> Self
    where
        F: Fn(&dyn Object) -> Result<bool> + Send + Sync + 'static,
    {
        let parameter = AnyParameter::new(
            TypedValue::new(Method::new(f)),
            AnyParameterProperties::new(
                "Non-const function",
                ParameterProperties::RUNFUNCTION | ParameterProperties::READONLY,
            ),
        );
        let result = self.base.create_parameter(&BaseTag::new(name), parameter);
        self.record(result);
        self
    }

    /// Run `f` after every successful put of parameter `name`
    pub fn callback<F>(mut self, name: &'static str, f: F) -> Self
    where
        F: Fn(&dyn Object) -> Result<()> + Send + Sync + 'static,
    {
        let result = self.base.add_callback(&BaseTag::new(name), Arc::new(f));
        self.record(result);
        self
    }

    /// Map option string `option` of parameter `param` to `code`
    pub fn option(mut self, param: &str, option: &str, code: i64) -> Self {
        let result = self.base.add_option(param, option, code);
        self.record(result);
        self
    }

    /// Declare an observable value
    pub fn observable(self, name: &str, description: &str) -> Self {
        self.base.register_observable(name, description);
        self
    }

    /// Mark the object as a template instance for `T`
    pub fn generic<T: Primitive>(self) -> Self {
        self.base.set_generic::<T>();
        self
    }

    /// Finish; fails with the first registration error
    pub fn build(self) -> Result<ObjectBase> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(self.base),
        }
    }
}
