//! Reflective operations available on every object

use super::graph::{addr_of, deep_clone, hash_object, objects_equal};
use super::options::no_options;
use super::{Object, ObjectRef};
use crate::any::{CloneContext, CompareContext, HashContext, ParamValue, TypedValue};
use crate::io::{ParameterSink, ParameterSource};
use crate::observe::{ObservedValue, ParameterObserver};
use crate::parameter::{AnyParameter, BaseTag, ParameterProperties, Tag};
use crate::{ReflexError, Result};
use std::any::type_name;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tracing::debug;

/// A gradient parameter found in an object graph
#[derive(Clone, Debug)]
pub struct GradientParameter {
    /// Dotted path of parameter names from the root to the owner; empty for the root
    pub path: String,
    /// Class of the owning object
    pub owner: &'static str,
    /// Parameter name
    pub name: String,
    /// Current value
    pub value: TypedValue,
}

/// Typed and untyped access to an object's registry.
///
/// Implemented for every [`Object`], including `dyn Object`.
pub trait ObjectExt: Object {
    /// Whether a parameter named `name` exists
    fn has(&self, name: &str) -> bool {
        self.base().registry().has(name)
    }

    /// Whether a parameter named like `tag` exists and reads as a `T`
    fn has_typed<T: ParamValue>(&self, tag: impl Into<Tag<T>>) -> bool {
        self.base().registry().has_typed::<T>(tag.into().name())
    }

    /// Typed read; computed parameters are evaluated
    fn get<T: ParamValue>(&self, tag: impl Into<Tag<T>>) -> Result<T> {
        let tag = tag.into();
        let value = self.get_value(tag.name())?;
        value
            .downcast_ref::<T>()
            .cloned()
            .ok_or_else(|| ReflexError::TypeMismatch {
                context: format!("parameter {}::{}", self.name(), tag.name()),
                expected: type_name::<T>().to_string(),
                actual: value.type_name().to_string(),
            })
    }

    /// Typed, checked write; runs the parameter's put callbacks
    fn put<T: ParamValue>(&self, tag: impl Into<Tag<T>>, value: T) -> Result<&Self> {
        let tag = tag.into();
        self.put_value(tag.name(), TypedValue::new(value))?;
        Ok(self)
    }

    /// Untyped read
    fn get_value(&self, name: &str) -> Result<TypedValue> {
        let parameter = self.base().parameter(&BaseTag::from(name))?;
        match parameter.value().invoke(self.as_object()) {
            Some(result) => result,
            None => Ok(parameter.value().clone()),
        }
    }

    /// Untyped write; the value must have the stored type.
    ///
    /// Callbacks run after the value is stored; a failing callback is
    /// reported but the value stays.
    fn put_value(&self, name: &str, value: TypedValue) -> Result<()> {
        let stored = self.base().update_parameter(&BaseTag::from(name), value)?;
        for callback in stored.callbacks() {
            callback(self.as_object())?;
        }
        Ok(())
    }

    /// Run `f` after every successful put of parameter `name`
    fn add_callback_function<F>(&self, name: &str, f: F) -> Result<()>
    where
        F: Fn(&dyn Object) -> Result<()> + Send + Sync + 'static,
    {
        self.base().add_callback(&BaseTag::from(name), Arc::new(f))
    }

    /// Set an option parameter by its string, or a string parameter directly
    fn put_string(&self, name: &str, option: &str) -> Result<()> {
        let code = {
            let options = self.base().options();
            if options.has_options(name) {
                Some(options.code(self.name(), name, option)?)
            } else {
                None
            }
        };
        match code {
            Some(code) => self.put::<i64>(name, code).map(|_| ()),
            None if self.has_typed::<String>(name) => {
                self.put::<String>(name, option.to_string()).map(|_| ())
            }
            None if self.has(name) => Err(no_options(self.name(), name)),
            None => Err(self.base().registry().not_found(name)),
        }
    }

    /// Option string of an option parameter, or the value of a string parameter
    fn get_string(&self, name: &str) -> Result<String> {
        if !self.base().options().has_options(name) {
            return self.get::<String>(name);
        }
        let code = self.get::<i64>(name)?;
        self.base()
            .options()
            .option(name, code)
            .map(str::to_string)
            .ok_or_else(|| {
                ReflexError::InvalidOption(format!(
                    "Value {} of parameter {}::{} matches no option",
                    code,
                    self.name(),
                    name
                ))
            })
    }

    /// Option strings and codes of one parameter
    fn options(&self, name: &str) -> Result<BTreeMap<String, i64>> {
        self.base()
            .options()
            .options(name)
            .cloned()
            .ok_or_else(|| no_options(self.name(), name))
    }

    /// Every option parameter with its options
    fn string_to_enum_map(&self) -> BTreeMap<String, BTreeMap<String, i64>> {
        self.base().options().to_map()
    }

    /// Object held by an object or optional-object parameter
    fn get_object(&self, name: &str) -> Result<ObjectRef> {
        let value = self.get_value(name)?;
        if let Some(object) = value.downcast_ref::<ObjectRef>() {
            return Ok(object.clone());
        }
        match value.downcast_ref::<Option<ObjectRef>>() {
            Some(Some(object)) => Ok(object.clone()),
            Some(None) => Err(ReflexError::PreconditionFailure(format!(
                "Parameter {}::{} is not set",
                self.name(),
                name
            ))),
            None => Err(ReflexError::TypeMismatch {
                context: format!("parameter {}::{}", self.name(), name),
                expected: type_name::<ObjectRef>().to_string(),
                actual: value.type_name().to_string(),
            }),
        }
    }

    /// Element `index` of an object-list parameter
    fn get_object_at(&self, name: &str, index: usize) -> Result<ObjectRef> {
        let list = self.get::<Vec<ObjectRef>>(name)?;
        list.get(index).cloned().ok_or_else(|| {
            ReflexError::PreconditionFailure(format!(
                "Index {} out of range for parameter {}::{} of length {}",
                index,
                self.name(),
                name,
                list.len()
            ))
        })
    }

    /// Object parameter downcast to its concrete type
    fn get_as<T: Object>(&self, name: &str) -> Result<Arc<T>> {
        self.get_object(name)?.downcast::<T>()
    }

    /// Append to an object-list parameter
    fn add(&self, name: &str, object: ObjectRef) -> Result<()> {
        let mut list = self.get::<Vec<ObjectRef>>(name)?;
        list.push(object);
        self.put::<Vec<ObjectRef>>(name, list).map(|_| ())
    }

    /// Invoke a run-function; a `false` result is an error
    fn run(&self, name: &str) -> Result<()> {
        let parameter = self.base().parameter(&BaseTag::from(name))?;
        if !parameter.has_property(ParameterProperties::RUNFUNCTION) {
            return Err(ReflexError::PreconditionFailure(format!(
                "Parameter {}::{} is not a function",
                self.name(),
                name
            )));
        }
        debug!(object = self.name(), function = name, "running function");
        let succeeded = match parameter.value().invoke(self.as_object()) {
            Some(result) => result?.extract::<bool>()?,
            None => false,
        };
        if succeeded {
            Ok(())
        } else {
            Err(ReflexError::FunctionFailed {
                object: self.name().to_string(),
                name: name.to_string(),
            })
        }
    }

    /// All parameters sorted by name
    fn get_params(&self) -> BTreeMap<String, Arc<AnyParameter>> {
        self.base().params()
    }

    /// Parameters tagged HYPER
    fn model_selection_parameters(&self) -> BTreeMap<String, Arc<AnyParameter>> {
        self.base().registry().filtered(ParameterProperties::HYPER)
    }

    /// Parameters tagged GRADIENT
    fn gradient_parameters(&self) -> BTreeMap<String, Arc<AnyParameter>> {
        self.base().registry().filtered(ParameterProperties::GRADIENT)
    }

    /// Gradient parameters of this object and every object reachable from it
    fn gradient_parameter_dictionary(&self) -> Vec<GradientParameter> {
        let mut found = Vec::new();
        let mut visited = HashSet::new();
        collect_gradients(self.as_object(), String::new(), &mut visited, &mut found);
        found
    }

    /// Visit every stored parameter holding a `T`
    fn for_each_param_of_type<T: ParamValue>(&self, mut f: impl FnMut(&str, &T)) {
        for (name, parameter) in self.base().params() {
            if let Some(value) = parameter.value().downcast_ref::<T>() {
                f(&name, value);
            }
        }
    }

    /// Description of one parameter
    fn description(&self, name: &str) -> Result<String> {
        let parameter = self.base().parameter(&BaseTag::from(name))?;
        Ok(parameter.properties().description().to_string())
    }

    /// Deep copy of the parameters matching `filter` into a new instance
    fn clone_object(&self, filter: ParameterProperties) -> Result<ObjectRef> {
        debug!(object = self.name(), filter = ?filter, "cloning object graph");
        deep_clone(self.as_object(), filter, &mut CloneContext::new())
    }

    /// Structural equality of two object graphs
    fn equals(&self, other: &dyn Object) -> bool {
        addr_of(self.as_object()) == addr_of(other)
            || objects_equal(self.as_object(), other, &mut CompareContext::new())
    }

    /// Hash over all stored parameter values, nested objects included
    fn hash_parameters(&self) -> u64 {
        let mut ctx = HashContext::new();
        ctx.enter(addr_of(self.as_object()));
        hash_object(self.as_object(), &mut ctx);
        ctx.finish()
    }

    /// Remember the current parameter hash
    fn update_parameter_hash(&self) {
        self.base().store_hash(self.hash_parameters());
    }

    /// Whether parameters changed since the last [`ObjectExt::update_parameter_hash`]
    fn parameter_hash_changed(&self) -> bool {
        self.base().stored_hash() != self.hash_parameters()
    }

    /// Checked downcast of a borrowed object
    fn as_type<T: Object>(&self) -> Result<&T> {
        self.as_any()
            .downcast_ref::<T>()
            .ok_or_else(|| ReflexError::TypeMismatch {
                context: format!("cast of object {}", self.name()),
                expected: type_name::<T>().to_string(),
                actual: self.name().to_string(),
            })
    }

    /// One-line summary of the class and its stored parameters
    fn describe(&self) -> String {
        let params = self
            .base()
            .params()
            .into_iter()
            .filter(|(_, p)| !p.value().is_computed())
            .map(|(name, p)| {
                let mut nested = Vec::new();
                p.value().visit_objects(&mut |o| nested.push(o.name()));
                if nested.is_empty() {
                    format!("{}={:?}", name, p.value())
                } else {
                    format!("{}=[{}]", name, nested.join(", "))
                }
            })
            .collect::<Vec<_>>();
        format!("{}({})", self.name(), params.join(", "))
    }

    /// Attach an observer; returns its subscription index
    fn subscribe(&self, observer: Arc<dyn ParameterObserver>) -> usize {
        self.base().channel().subscribe(observer)
    }

    /// Detach an observer by identity
    fn unsubscribe(&self, observer: &Arc<dyn ParameterObserver>) -> Result<()> {
        if self.base().channel().unsubscribe(observer) {
            Ok(())
        } else {
            Err(ReflexError::PreconditionFailure(format!(
                "Observer is not subscribed to {}",
                self.name()
            )))
        }
    }

    /// Detach an observer by subscription index
    fn unsubscribe_index(&self, index: usize) -> Result<()> {
        if self.base().channel().unsubscribe_index(index) {
            Ok(())
        } else {
            Err(ReflexError::PreconditionFailure(format!(
                "No subscription {} on {}",
                index,
                self.name()
            )))
        }
    }

    /// Number of attached observers
    fn num_subscriptions(&self) -> usize {
        self.base().channel().len()
    }

    /// Emit a snapshot of `value`; free when nobody is subscribed
    fn observe<T: ParamValue>(
        &self,
        step: i64,
        name: &str,
        description: &str,
        value: &T,
    ) -> Result<()> {
        if !self.base().channel().has_subscribers() {
            return Ok(());
        }
        let snapshot = value.clone_value(&mut CloneContext::new())?;
        self.base().channel().observe(ObservedValue::new(
            step,
            name,
            TypedValue::new(snapshot),
            description,
            ParameterProperties::NONE,
        ));
        Ok(())
    }

    /// Emit a snapshot of a registered parameter
    fn observe_parameter(&self, step: i64, name: &str) -> Result<()> {
        if !self.base().channel().has_subscribers() {
            return Ok(());
        }
        let parameter = self.base().parameter(&BaseTag::from(name))?;
        let snapshot = self.get_value(name)?.deep_clone()?;
        self.base().channel().observe(ObservedValue::new(
            step,
            name,
            snapshot,
            parameter.properties().description(),
            parameter.properties().mask(),
        ));
        Ok(())
    }

    /// Value of `current_iteration`, or -1 if the object has none
    fn step(&self) -> i64 {
        self.get::<i64>("current_iteration").unwrap_or(-1)
    }

    /// Declared observables with their descriptions
    fn observable_names(&self) -> BTreeMap<String, String> {
        self.base().observables()
    }

    /// Compute and store every parameter still flagged AUTO
    fn init_auto_params(&self) -> Result<()> {
        for (name, parameter) in self.base().params() {
            let init = match parameter.auto_init() {
                Some(init) if parameter.has_property(ParameterProperties::AUTO) => init,
                _ => continue,
            };
            let value = init.compute(self.as_object())?;
            if value.type_id() != parameter.value().type_id() {
                return Err(ReflexError::TypeMismatch {
                    context: format!("auto value {} of {}::{}", init.name(), self.name(), name),
                    expected: parameter.value().type_name().to_string(),
                    actual: value.type_name().to_string(),
                });
            }
            if let Err(reason) = parameter.validate(&value) {
                return Err(ReflexError::ConstraintViolation {
                    object: self.name().to_string(),
                    name,
                    reason,
                });
            }
            debug!(object = self.name(), parameter = %name, auto = init.name(), "initialised parameter");
            self.base()
                .replace_parameter(&name, parameter.with_value(value));
        }
        Ok(())
    }

    /// Write all stored parameters, running the save hooks
    fn serialize(&self, sink: &mut dyn ParameterSink) -> Result<()> {
        crate::io::serialize(self.as_object(), sink)
    }

    /// Read all stored parameters, running the load hooks
    fn deserialize(&self, source: &mut dyn ParameterSource) -> Result<()> {
        crate::io::deserialize(self.as_object(), source)
    }
}

impl<O: Object + ?Sized> ObjectExt for O {}

fn collect_gradients(
    object: &dyn Object,
    path: String,
    visited: &mut HashSet<usize>,
    found: &mut Vec<GradientParameter>,
) {
    if !visited.insert(addr_of(object)) {
        return;
    }
    let params = object.base().params();
    for (name, parameter) in &params {
        if parameter.has_property(ParameterProperties::GRADIENT) {
            found.push(GradientParameter {
                path: path.clone(),
                owner: object.name(),
                name: name.clone(),
                value: parameter.value().clone(),
            });
        }
    }
    for (name, parameter) in &params {
        let mut nested = Vec::new();
        parameter.value().visit_objects(&mut |o| nested.push(o.clone()));
        let single = parameter.value().has_type::<ObjectRef>()
            || parameter.value().has_type::<Option<ObjectRef>>();
        for (i, child) in nested.iter().enumerate() {
            let segment = if single {
                name.clone()
            } else {
                format!("{}[{}]", name, i)
            };
            let child_path = if path.is_empty() {
                segment
            } else {
                format!("{}.{}", path, segment)
            };
            collect_gradients(child.as_object(), child_path, visited, found);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::GaussianKernel;
    use crate::object::{param, ObjectBase};
    use crate::observe::ParameterObserverHistory;
    use crate::parameter::{predicate, Positive};
    use proptest::prelude::*;
    use serde_json::Value;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const RATE: Tag<f64> = Tag::new("rate");
    const MODES: [&str; 4] = ["linear", "quadratic", "cubic", "exponential"];

    #[derive(Debug)]
    struct Machine {
        base: ObjectBase,
    }

    impl Machine {
        fn new() -> Result<Self> {
            let mut builder = ObjectBase::builder("Machine")
                .watch(param(RATE, 0.5).description("Step size").hyper().constrain(Positive))
                .watch(param("mode", 0i64).description("Schedule"))
                .watch(param("label", String::from("none")))
                .watch(param("kernel", None::<ObjectRef>))
                .watch(param("kernels", Vec::<ObjectRef>::new()))
                .watch(param("current_iteration", 0i64))
                .method("double_rate", |o| Ok(o.get(RATE)? * 2.0))
                .run_function("succeed", |_| Ok(true))
                .run_function("fail", |_| Ok(false))
                .observable("loss", "Training loss");
            for (code, mode) in MODES.iter().enumerate() {
                builder = builder.option("mode", mode, code as i64);
            }
            Ok(Machine {
                base: builder.build()?,
            })
        }
    }

    impl Object for Machine {
        fn base(&self) -> &ObjectBase {
            &self.base
        }

        fn create_empty(&self) -> Result<ObjectRef> {
            Ok(ObjectRef::new(Machine::new()?))
        }
    }

    fn machine() -> ObjectRef {
        ObjectRef::new(Machine::new().unwrap())
    }

    fn kernel(width: f64) -> ObjectRef {
        ObjectRef::new(GaussianKernel::with_width(width).unwrap())
    }

    static CLONES: AtomicUsize = AtomicUsize::new(0);

    #[derive(Clone, Debug, PartialEq)]
    struct Counted(Vec<f64>);

    impl ParamValue for Counted {
        fn clone_value(&self, _ctx: &mut CloneContext) -> Result<Self> {
            CLONES.fetch_add(1, Ordering::SeqCst);
            Ok(self.clone())
        }

        fn value_eq(&self, other: &Self, _ctx: &mut CompareContext) -> bool {
            self == other
        }

        fn value_hash(&self, _ctx: &mut HashContext) {}

        fn to_json(&self) -> Result<Value> {
            Ok(serde_json::to_value(&self.0)?)
        }

        fn from_json(value: &Value) -> Result<Self> {
            Ok(Counted(serde_json::from_value(value.clone())?))
        }
    }

    proptest! {
        #[test]
        fn prop_enum_round_trip(index in 0usize..4) {
            let m = machine();
            m.put_string("mode", MODES[index]).unwrap();
            prop_assert_eq!(m.get_string("mode").unwrap(), MODES[index]);
            prop_assert_eq!(m.get::<i64>("mode").unwrap(), index as i64);
        }

        #[test]
        fn prop_typed_put_get(value in any::<i64>(), rate in 0.001f64..1e6) {
            let m = machine();
            m.put("current_iteration", value).unwrap();
            prop_assert_eq!(m.get::<i64>("current_iteration").unwrap(), value);
            prop_assert!(
                matches!(m.get::<i32>("current_iteration"), Err(ReflexError::TypeMismatch { .. })),
                "narrower integer type must not match"
            );
            prop_assert!(
                matches!(m.put("current_iteration", value as f64), Err(ReflexError::TypeMismatch { .. })),
                "float must not be stored in an integer parameter"
            );

            m.put(RATE, rate).unwrap();
            prop_assert_eq!(m.get::<f64>("double_rate").unwrap(), rate * 2.0);
        }
    }

    #[test]
    fn test_missing_parameter() {
        let m = machine();
        assert!(!m.has("momentum"));
        assert!(matches!(
            m.get::<f64>("momentum"),
            Err(ReflexError::ParameterNotFound { ref object, ref name })
                if object == "Machine" && name == "momentum"
        ));
        assert!(matches!(
            m.put_string("momentum", "linear"),
            Err(ReflexError::ParameterNotFound { .. })
        ));
        assert!(m.run("momentum").is_err());
    }

    #[test]
    fn test_type_mismatch_names_both_types() {
        let m = machine();
        let err = m.get::<String>(RATE.name()).unwrap_err();
        let text = err.to_string();
        assert!(text.contains("Machine::rate"), "{}", text);
        assert!(text.contains("String"), "{}", text);
        assert!(text.contains("f64"), "{}", text);
        assert!(m.has_typed::<f64>("rate"));
        assert!(m.has_typed::<f64>("double_rate"));
        assert!(!m.has_typed::<i64>("rate"));
    }

    #[test]
    fn test_constraint_keeps_previous_value() {
        let m = machine();
        m.put(RATE, 2.0).unwrap();
        let err = m.put(RATE, -1.0).map(|_| ()).unwrap_err();
        assert!(matches!(err, ReflexError::ConstraintViolation { .. }));
        assert!(err.to_string().contains("must be greater than 0"));
        assert_eq!(m.get(RATE).unwrap(), 2.0);
    }

    #[test]
    fn test_initial_value_must_satisfy_constraint() {
        let result = ObjectBase::builder("Machine")
            .watch(param("n", -5i64).constrain(Positive))
            .build();
        assert!(matches!(
            result,
            Err(ReflexError::ConstraintViolation { ref object, ref name, .. })
                if object == "Machine" && name == "n"
        ));

        let base = ObjectBase::builder("Machine").build().unwrap();
        assert!(base.watch(param("n", 0i64).constrain(Positive)).is_err());
        assert!(!base.registry().has("n"));
        base.watch(param("n", 3i64).constrain(Positive)).unwrap();
        assert!(base.registry().has("n"));
    }

    #[derive(Debug)]
    struct Peer {
        base: ObjectBase,
    }

    impl Peer {
        fn create() -> ObjectRef {
            let base = ObjectBase::builder("Peer")
                .watch(param("peer", None::<ObjectRef>).constrain(predicate(
                    |peer: &Option<ObjectRef>| match peer {
                        Some(p) if !p.has("peer") => Err("peer has no peer slot".to_string()),
                        _ => Ok(()),
                    },
                )))
                .build()
                .unwrap();
            ObjectRef::new(Peer { base })
        }
    }

    impl Object for Peer {
        fn base(&self) -> &ObjectBase {
            &self.base
        }

        fn create_empty(&self) -> Result<ObjectRef> {
            Ok(Peer::create())
        }
    }

    #[test]
    fn test_constraint_can_inspect_its_owner() {
        let h = Peer::create();
        h.put("peer", Some(h.clone())).unwrap();
        assert!(h.get_object("peer").unwrap().ptr_eq(&h));
        assert!(matches!(
            h.put("peer", Some(machine())),
            Err(ReflexError::ConstraintViolation { .. })
        ));
        h.put("peer", None::<ObjectRef>).unwrap();
        assert_eq!(h.ref_count(), 1);
    }

    #[test]
    fn test_put_callbacks() {
        let m = machine();
        let writes = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&writes);
        m.add_callback_function("rate", move |o| {
            assert!(o.get(RATE)? > 0.0);
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
        .unwrap();

        m.put(RATE, 2.0).unwrap();
        m.put_value("rate", TypedValue::new(3.0f64)).unwrap();
        assert!(m.put(RATE, -1.0).is_err());
        m.put("label", String::from("x")).unwrap();
        assert_eq!(writes.load(Ordering::SeqCst), 2);

        assert!(matches!(
            m.add_callback_function("missing", |_| Ok(())),
            Err(ReflexError::ParameterNotFound { .. })
        ));
    }

    #[test]
    fn test_callbacks_may_write_other_parameters() {
        let base = ObjectBase::builder("Machine")
            .watch(param(RATE, 0.5))
            .watch(param("label", String::from("fresh")))
            .callback("rate", |o| {
                o.put("label", String::from("stale"))?;
                Ok(())
            })
            .build()
            .unwrap();
        let m = ObjectRef::new(Machine { base });
        assert_eq!(m.get_string("label").unwrap(), "fresh");
        m.put(RATE, 1.5).unwrap();
        assert_eq!(m.get_string("label").unwrap(), "stale");

        m.add_callback_function("label", |_| {
            Err(ReflexError::PreconditionFailure("cache is pinned".to_string()))
        })
        .unwrap();
        assert!(m.put("label", String::from("again")).is_err());
        assert_eq!(m.get_string("label").unwrap(), "again");
    }

    #[test]
    fn test_untyped_access() {
        let m = machine();
        m.put_value("label", TypedValue::new("linear-fit".to_string()))
            .unwrap();
        assert_eq!(m.get_string("label").unwrap(), "linear-fit");
        m.put_string("label", "other").unwrap();
        assert_eq!(m.get_value("label").unwrap().extract::<String>().unwrap(), "other");
        assert!(m.put_value("label", TypedValue::new(3i64)).is_err());
        assert_eq!(m.description("rate").unwrap(), "Step size");
    }

    #[test]
    fn test_enum_errors() {
        let m = machine();
        let err = m.put_string("mode", "sigmoid").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid option: Illegal option 'sigmoid' for parameter Machine::mode"
        );
        let err = m.put_string("current_iteration", "linear").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid option: There are no options for parameter Machine::current_iteration"
        );
        m.put("mode", 17i64).unwrap();
        assert!(matches!(m.get_string("mode"), Err(ReflexError::InvalidOption(_))));
        assert_eq!(m.options("mode").unwrap()["cubic"], 2);
        assert!(m.options("rate").is_err());
    }

    #[test]
    fn test_run_functions() {
        let m = machine();
        m.run("succeed").unwrap();
        assert!(matches!(
            m.run("fail"),
            Err(ReflexError::FunctionFailed { ref object, ref name })
                if object == "Machine" && name == "fail"
        ));
        assert!(matches!(m.run("rate"), Err(ReflexError::PreconditionFailure(_))));
        assert!(matches!(m.put("double_rate", 1.0), Err(ReflexError::PreconditionFailure(_))));
    }

    #[test]
    fn test_object_parameters() {
        let m = machine();
        assert!(matches!(m.get_object("kernel"), Err(ReflexError::PreconditionFailure(_))));
        assert!(matches!(m.get_object("rate"), Err(ReflexError::TypeMismatch { .. })));

        m.put("kernel", Some(kernel(2.0))).unwrap();
        let k = m.get_as::<GaussianKernel>("kernel").unwrap();
        assert_eq!(k.width().unwrap(), 2.0);
        assert!(m.get_as::<Machine>("kernel").is_err());

        m.add("kernels", kernel(1.0)).unwrap();
        m.add("kernels", kernel(3.0)).unwrap();
        assert_eq!(m.get_object_at("kernels", 1).unwrap().get::<f64>("width").unwrap(), 3.0);
        assert!(matches!(
            m.get_object_at("kernels", 2),
            Err(ReflexError::PreconditionFailure(_))
        ));
    }

    #[test]
    fn test_casts() {
        let m = machine();
        assert!(m.as_type::<Machine>().is_ok());
        assert!(matches!(
            m.as_type::<GaussianKernel>(),
            Err(ReflexError::TypeMismatch { ref actual, .. }) if actual == "Machine"
        ));
        assert!(m.downcast::<Machine>().is_ok());
        assert!(m.downcast::<GaussianKernel>().is_err());
    }

    #[test]
    fn test_reference_counting() {
        let history = Arc::new(ParameterObserverHistory::new());
        let m = machine();
        m.subscribe(history.clone());
        assert_eq!(m.ref_count(), 1);

        let a = m.share();
        let b = m.share();
        assert_eq!(m.ref_count(), 3);
        assert_eq!(a.unref(), 2);
        assert_eq!(b.unref(), 1);
        assert!(!history.completed());
        assert_eq!(m.unref(), 0);
        assert!(history.completed());
    }

    #[test]
    fn test_clone_is_deep() {
        let m = machine();
        m.put(RATE, 0.25).unwrap();
        m.put_string("mode", "cubic").unwrap();
        m.put("kernel", Some(kernel(2.0))).unwrap();

        let copy = m.clone_object(ParameterProperties::ALL).unwrap();
        assert!(copy.equals(&*m));
        assert!(!copy.ptr_eq(&m));
        assert_eq!(copy.get_string("mode").unwrap(), "cubic");

        let source_kernel = m.get_object("kernel").unwrap();
        let copied_kernel = copy.get_object("kernel").unwrap();
        assert!(!source_kernel.ptr_eq(&copied_kernel));

        copied_kernel.put("width", 5.0).unwrap();
        assert_eq!(source_kernel.get::<f64>("width").unwrap(), 2.0);
        assert!(!copy.equals(&*m));
    }

    #[test]
    fn test_clone_filter() {
        let m = machine();
        m.put(RATE, 0.25).unwrap();
        m.put("current_iteration", 9i64).unwrap();

        let copy = m.clone_object(ParameterProperties::HYPER).unwrap();
        assert_eq!(copy.get(RATE).unwrap(), 0.25);
        assert_eq!(copy.get::<i64>("current_iteration").unwrap(), 0);
    }

    #[test]
    fn test_clone_keeps_sharing() {
        let m = machine();
        let shared = kernel(2.0);
        m.put("kernel", Some(shared.clone())).unwrap();
        m.add("kernels", shared).unwrap();

        let copy = m.clone_object(ParameterProperties::ALL).unwrap();
        let a = copy.get_object("kernel").unwrap();
        let b = copy.get_object_at("kernels", 0).unwrap();
        assert!(a.ptr_eq(&b));
        assert!(!a.ptr_eq(&m.get_object("kernel").unwrap()));
    }

    #[test]
    fn test_cycles_terminate() {
        let a = machine();
        let b = machine();
        a.put("kernel", Some(b.clone())).unwrap();
        b.put("kernel", Some(a.clone())).unwrap();

        let copy = a.clone_object(ParameterProperties::ALL).unwrap();
        assert!(copy.equals(&*a));
        let copy_b = copy.get_object("kernel").unwrap();
        assert!(copy_b.get_object("kernel").unwrap().ptr_eq(&copy));
        assert_eq!(copy.hash_parameters(), a.hash_parameters());

        b.put(RATE, 9.0).unwrap();
        assert!(!copy.equals(&*a));

        // break the cycles so the objects are freed
        a.put("kernel", None::<ObjectRef>).unwrap();
        copy.put("kernel", None::<ObjectRef>).unwrap();
    }

    #[test]
    fn test_equality() {
        let a = machine();
        let b = machine();
        assert!(a.equals(&*b));
        b.put(RATE, 0.75).unwrap();
        assert!(!a.equals(&*b));
        assert!(!a.equals(&*kernel(1.0)));
    }

    #[test]
    fn test_parameter_hash() {
        let m = machine();
        let copy = m.clone_object(ParameterProperties::ALL).unwrap();
        assert_eq!(m.hash_parameters(), copy.hash_parameters());

        m.update_parameter_hash();
        assert!(!m.parameter_hash_changed());
        m.put(RATE, 0.1).unwrap();
        assert!(m.parameter_hash_changed());
        m.update_parameter_hash();
        assert!(!m.parameter_hash_changed());
    }

    #[test]
    fn test_views_and_introspection() {
        let m = machine();
        assert_eq!(
            m.model_selection_parameters().keys().collect::<Vec<_>>(),
            vec!["rate"]
        );
        assert!(m.gradient_parameters().is_empty());

        m.put("kernel", Some(kernel(2.0))).unwrap();
        let dict = m.gradient_parameter_dictionary();
        assert_eq!(dict.len(), 1);
        assert_eq!(dict[0].path, "kernel");
        assert_eq!(dict[0].name, "width");

        let mut ints = Vec::new();
        m.for_each_param_of_type::<i64>(|name, v| ints.push((name.to_string(), *v)));
        assert_eq!(
            ints,
            vec![("current_iteration".to_string(), 0), ("mode".to_string(), 0)]
        );

        let text = m.describe();
        assert!(text.starts_with("Machine("), "{}", text);
        assert!(text.contains("kernel=[GaussianKernel]"), "{}", text);
        assert!(!text.contains("double_rate"), "{}", text);
        assert_eq!(m.observable_names()["loss"], "Training loss");
    }

    #[test]
    fn test_observation_gating() {
        let m = machine();
        let value = Counted(vec![1.0, 2.0]);
        m.observe(0, "loss", "", &value).unwrap();
        assert_eq!(CLONES.load(Ordering::SeqCst), 0);

        let history = Arc::new(ParameterObserverHistory::new());
        let observer: Arc<dyn ParameterObserver> = history.clone();
        let index = m.subscribe(observer);
        assert_eq!(m.num_subscriptions(), 1);
        m.observe(0, "loss", "", &value).unwrap();
        assert_eq!(CLONES.load(Ordering::SeqCst), 1);

        m.unsubscribe_index(index).unwrap();
        assert!(m.unsubscribe_index(index).is_err());
        m.observe(1, "loss", "", &value).unwrap();
        assert_eq!(CLONES.load(Ordering::SeqCst), 1);
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn test_observed_snapshots_are_independent() {
        let m = machine();
        let history = Arc::new(ParameterObserverHistory::new());
        m.subscribe(history.clone());

        let mut weights = vec![1.0, 2.0];
        m.observe(m.step(), "weights", "Weights", &weights).unwrap();
        weights[0] = 10.0;

        m.put("kernel", Some(kernel(2.0))).unwrap();
        m.put("current_iteration", 4i64).unwrap();
        m.observe_parameter(m.step(), "kernel").unwrap();
        m.get_object("kernel").unwrap().put("width", 8.0).unwrap();

        let records = history.records();
        assert_eq!(records[0].get::<Vec<f64>>().unwrap(), vec![1.0, 2.0]);
        assert_eq!(records[0].step(), 0);
        let observed = records[1].get::<Option<ObjectRef>>().unwrap().unwrap();
        assert_eq!(observed.get::<f64>("width").unwrap(), 2.0);
        assert_eq!(records[1].step(), 4);
    }

    #[test]
    fn test_step_defaults() {
        assert_eq!(kernel(1.0).step(), -1);
    }
}
