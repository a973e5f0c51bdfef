//! Serialization boundary
//!
//! [`serialize`] and [`deserialize`] drive the parameter contract: run the
//! object's hooks and move every stored parameter through a
//! [`ParameterSink`] or [`ParameterSource`]. The byte format belongs to the
//! sink/source; [`JsonSink`] and [`JsonSource`] are the built-in pair.

mod json;

pub use json::{
    from_json_str, load_json, object_from_json, object_to_json, save_json, to_json_string,
    JsonSink, JsonSource,
};

use crate::any::TypedValue;
use crate::object::Object;
use crate::{ReflexError, Result};
use tracing::{debug, warn};

/// Receives parameters of one object
pub trait ParameterSink {
    /// Store `value` under `name`
    fn write(&mut self, name: &str, value: &TypedValue) -> Result<()>;
}

/// Provides parameters of one object
pub trait ParameterSource {
    /// Value stored under `name`, decoded to the type of `template`;
    /// `None` if the source has no such entry
    fn read(&mut self, name: &str, template: &TypedValue) -> Result<Option<TypedValue>>;
}

/// Save hooks around a write of every stored parameter
pub fn serialize(object: &dyn Object, sink: &mut dyn ParameterSink) -> Result<()> {
    object.save_serializable_pre()?;
    for (name, parameter) in object.base().params() {
        if parameter.value().is_computed() {
            continue;
        }
        sink.write(&name, parameter.value())?;
    }
    object.save_serializable_post()?;
    debug!(object = object.name(), "serialized");
    Ok(())
}

/// Load hooks around a checked read of every stored parameter.
///
/// Every registered parameter must be present in the source. Values keep
/// their metadata and must satisfy the parameter's constraint. Nothing is
/// stored unless every parameter decodes and validates.
pub fn deserialize(object: &dyn Object, source: &mut dyn ParameterSource) -> Result<()> {
    object.load_serializable_pre()?;
    let mut decoded = Vec::new();
    for (name, parameter) in object.base().params() {
        if parameter.value().is_computed() {
            continue;
        }
        let value = source
            .read(&name, parameter.value())?
            .ok_or_else(|| ReflexError::ParameterNotFound {
                object: object.name().to_string(),
                name: name.clone(),
            })?;
        if let Err(reason) = parameter.validate(&value) {
            warn!(object = object.name(), parameter = %name, %reason, "rejected stored value");
            return Err(ReflexError::ConstraintViolation {
                object: object.name().to_string(),
                name,
                reason,
            });
        }
        decoded.push((name, parameter.with_value(value)));
    }
    for (name, parameter) in decoded {
        object.base().replace_parameter(&name, parameter);
    }
    object.load_serializable_post()?;
    debug!(object = object.name(), "deserialized");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::{param, ObjectBase, ObjectExt, ObjectRef};
    use crate::parameter::Positive;
    use serde_json::json;

    #[derive(Debug)]
    struct Pair {
        base: ObjectBase,
    }

    impl Pair {
        fn create() -> ObjectRef {
            let base = ObjectBase::builder("Pair")
                .watch(param("a", 1i64))
                .watch(param("b", 2i64).constrain(Positive))
                .build()
                .unwrap();
            ObjectRef::new(Pair { base })
        }
    }

    impl Object for Pair {
        fn base(&self) -> &ObjectBase {
            &self.base
        }

        fn create_empty(&self) -> Result<ObjectRef> {
            Ok(Pair::create())
        }
    }

    fn source(value: serde_json::Value) -> JsonSource {
        match value {
            serde_json::Value::Object(map) => JsonSource::new(map),
            _ => JsonSource::default(),
        }
    }

    #[test]
    fn test_failed_load_leaves_object_unchanged() {
        let pair = Pair::create();

        let missing = deserialize(pair.as_object(), &mut source(json!({"a": 99})));
        assert!(matches!(
            missing,
            Err(ReflexError::ParameterNotFound { ref name, .. }) if name == "b"
        ));
        let rejected = deserialize(pair.as_object(), &mut source(json!({"a": 99, "b": -1})));
        assert!(matches!(rejected, Err(ReflexError::ConstraintViolation { .. })));
        let malformed = deserialize(pair.as_object(), &mut source(json!({"a": 99, "b": "two"})));
        assert!(malformed.is_err());

        assert_eq!(pair.get::<i64>("a").unwrap(), 1);
        assert_eq!(pair.get::<i64>("b").unwrap(), 2);
        assert!(!pair.base().lifecycle().load_post_called());

        deserialize(pair.as_object(), &mut source(json!({"a": 99, "b": 7}))).unwrap();
        assert_eq!(pair.get::<i64>("a").unwrap(), 99);
        assert_eq!(pair.get::<i64>("b").unwrap(), 7);
        assert!(pair.base().lifecycle().load_post_called());
    }
}
