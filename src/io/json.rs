//! JSON codec
//!
//! An object is encoded as
//! `{"class": <name>, "generic": <type or null>, "parameters": {<name>: <value>}}`.
//! Nested objects are encoded inline and rebuilt through the class factory.
//! Weak links are written as `null`; owners restore them in
//! `load_serializable_post`.

use super::{deserialize, serialize, ParameterSink, ParameterSource};
use crate::any::TypedValue;
use crate::object::{addr_of, create_object, Object, ObjectRef, PrimitiveType};
use crate::{ReflexError, Result};
use serde_json::{json, Map, Value};
use std::cell::RefCell;
use std::collections::HashSet;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

thread_local! {
    static ENCODING: RefCell<HashSet<usize>> = RefCell::new(HashSet::new());
}

/// Marks an object as being encoded on this thread until dropped
struct EncodingGuard(usize);

impl EncodingGuard {
    fn enter(object: &dyn Object) -> Result<Self> {
        let addr = addr_of(object);
        let fresh = ENCODING.with(|active| active.borrow_mut().insert(addr));
        if fresh {
            Ok(EncodingGuard(addr))
        } else {
            Err(ReflexError::Serialization(format!(
                "cycle through {} cannot be encoded",
                object.name()
            )))
        }
    }
}

impl Drop for EncodingGuard {
    fn drop(&mut self) {
        ENCODING.with(|active| {
            active.borrow_mut().remove(&self.0);
        });
    }
}

/// Collects parameters into a JSON map
#[derive(Debug, Default)]
pub struct JsonSink {
    parameters: Map<String, Value>,
}

impl JsonSink {
    /// Empty sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Collected parameters
    pub fn into_map(self) -> Map<String, Value> {
        self.parameters
    }
}

impl ParameterSink for JsonSink {
    fn write(&mut self, name: &str, value: &TypedValue) -> Result<()> {
        self.parameters.insert(name.to_string(), value.to_json()?);
        Ok(())
    }
}

/// Reads parameters from a JSON map
#[derive(Debug, Default)]
pub struct JsonSource {
    parameters: Map<String, Value>,
}

impl JsonSource {
    /// Source over `parameters`
    pub fn new(parameters: Map<String, Value>) -> Self {
        JsonSource { parameters }
    }
}

impl ParameterSource for JsonSource {
    fn read(&mut self, name: &str, template: &TypedValue) -> Result<Option<TypedValue>> {
        self.parameters
            .get(name)
            .map(|value| template.decode_json(value))
            .transpose()
    }
}

/// Encode an object and everything it owns
pub fn object_to_json(object: &dyn Object) -> Result<Value> {
    let _guard = EncodingGuard::enter(object)?;
    let mut sink = JsonSink::new();
    serialize(object, &mut sink)?;
    Ok(json!({
        "class": object.name(),
        "generic": object.base().generic(),
        "parameters": Value::Object(sink.into_map()),
    }))
}

/// Rebuild an object through the class factory
pub fn object_from_json(value: &Value) -> Result<ObjectRef> {
    let class = value
        .get("class")
        .and_then(Value::as_str)
        .ok_or_else(|| ReflexError::Serialization("object without class name".to_string()))?;
    let parameters = value
        .get("parameters")
        .and_then(Value::as_object)
        .ok_or_else(|| {
            ReflexError::Serialization(format!("object {} without parameters", class))
        })?;
    let generic: Option<PrimitiveType> = match value.get("generic") {
        Some(generic) => serde_json::from_value(generic.clone())?,
        None => None,
    };

    let object = create_object(class)?;
    object.base().set_generic_type(generic);
    deserialize(object.as_object(), &mut JsonSource::new(parameters.clone()))?;
    Ok(object)
}

/// Pretty-printed JSON text
pub fn to_json_string(object: &dyn Object) -> Result<String> {
    Ok(serde_json::to_string_pretty(&object_to_json(object)?)?)
}

/// Rebuild an object from JSON text
pub fn from_json_str(text: &str) -> Result<ObjectRef> {
    object_from_json(&serde_json::from_str(text)?)
}

/// Save object to JSON file
pub fn save_json(object: &dyn Object, path: impl AsRef<Path>) -> Result<()> {
    let json = to_json_string(object)?;
    let mut file = File::create(path)?;
    file.write_all(json.as_bytes())?;
    Ok(())
}

/// Load object from JSON file
pub fn load_json(path: impl AsRef<Path>) -> Result<ObjectRef> {
    let mut file = File::open(path)?;
    let mut contents = String::new();
    file.read_to_string(&mut contents)?;
    from_json_str(&contents)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CombinedKernel, DenseFeatures, GaussianKernel, Perceptron};
    use crate::object::{param, register_class, ObjectBase, ObjectExt};
    use ndarray::array;

    fn trained_perceptron() -> Perceptron {
        let p = Perceptron::new().unwrap();
        let x = array![[2.0, 1.0], [1.0, 3.0], [-1.0, -2.0], [-2.0, -1.0]];
        let features = ObjectRef::new(DenseFeatures::new(x).unwrap());
        p.set_training_data(features, array![1.0, 1.0, -1.0, -1.0]).unwrap();
        p.put_string("initialization", "random").unwrap();
        p.train().unwrap();
        p
    }

    #[test]
    fn test_round_trip_runs_hooks() {
        let p = trained_perceptron();
        let text = to_json_string(&p).unwrap();
        assert!(p.base().lifecycle().save_pre_called());
        assert!(p.base().lifecycle().save_post_called());
        assert!(!p.base().lifecycle().load_pre_called());

        let loaded = from_json_str(&text).unwrap();
        assert!(loaded.equals(&p));
        assert!(loaded.base().lifecycle().load_pre_called());
        assert!(loaded.base().lifecycle().load_post_called());
        assert_eq!(loaded.get_string("initialization").unwrap(), "random");

        let features = loaded.get_as::<DenseFeatures>("features").unwrap();
        assert_eq!(features.base().generic(), Some(PrimitiveType::F64));
    }

    #[test]
    fn test_nested_list_round_trip() {
        let combined = CombinedKernel::new().unwrap();
        combined
            .append(ObjectRef::new(GaussianKernel::with_width(2.5).unwrap()), 0.5)
            .unwrap();
        let value = object_to_json(&combined).unwrap();
        assert_eq!(value["class"], "CombinedKernel");
        assert_eq!(value["parameters"]["kernel_list"][0]["class"], "GaussianKernel");
        assert!(value["parameters"].get("num_subkernels").is_none());

        let loaded = object_from_json(&value).unwrap();
        assert!(loaded.equals(&combined));
    }

    #[test]
    fn test_file_round_trip() {
        let p = trained_perceptron();
        let path = std::env::temp_dir().join(format!("reflex-ml-{}.json", std::process::id()));
        save_json(&p, &path).unwrap();
        let loaded = load_json(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert!(loaded.equals(&p));
    }

    #[test]
    fn test_decode_errors() {
        assert!(matches!(
            from_json_str(r#"{"class": "Unknown", "parameters": {}}"#),
            Err(ReflexError::UnknownClass(_))
        ));
        assert!(matches!(
            from_json_str(r#"{"parameters": {}}"#),
            Err(ReflexError::Serialization(_))
        ));
        assert!(matches!(
            from_json_str(r#"{"class": "GaussianKernel", "parameters": {"width": 2.0}}"#),
            Err(ReflexError::ParameterNotFound { ref name, .. }) if name == "features"
        ));
        assert!(matches!(
            from_json_str(
                r#"{"class": "GaussianKernel", "parameters": {"width": -2.0, "features": null}}"#
            ),
            Err(ReflexError::ConstraintViolation { .. })
        ));
        assert!(matches!(
            from_json_str(
                r#"{"class": "GaussianKernel", "parameters": {"width": "wide", "features": null}}"#
            ),
            Err(ReflexError::Serialization(_))
        ));
    }

    #[derive(Debug)]
    struct Ring {
        base: ObjectBase,
    }

    impl Ring {
        fn create() -> Result<ObjectRef> {
            let base = ObjectBase::builder("Ring")
                .watch(param("next", None::<ObjectRef>))
                .build()?;
            Ok(ObjectRef::new(Ring { base }))
        }
    }

    impl Object for Ring {
        fn base(&self) -> &ObjectBase {
            &self.base
        }

        fn create_empty(&self) -> Result<ObjectRef> {
            Ring::create()
        }
    }

    #[test]
    fn test_registered_class_and_cycles() {
        register_class("Ring", Ring::create);
        assert!(crate::object::class_names().contains(&"Ring".to_string()));

        let a = Ring::create().unwrap();
        let b = Ring::create().unwrap();
        a.put("next", Some(b.clone())).unwrap();
        let loaded = from_json_str(&to_json_string(&*a).unwrap()).unwrap();
        assert!(loaded.equals(&*a));

        b.put("next", Some(a.clone())).unwrap();
        assert!(matches!(
            to_json_string(&*a),
            Err(ReflexError::Serialization(_))
        ));
        b.put("next", None::<ObjectRef>).unwrap();
        assert!(to_json_string(&*a).is_ok());
    }
}
