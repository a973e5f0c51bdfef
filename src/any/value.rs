//! Capabilities every storable parameter type provides

use super::{CloneContext, CompareContext, HashContext, TypedValue};
use crate::object::{Object, ObjectRef};
use crate::{ReflexError, Result};
use ndarray::{Array, Dimension};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::any::{type_name, Any, TypeId};
use std::fmt;
use std::hash::Hash;

/// A type that can live inside a [`TypedValue`].
///
/// `Clone` is the cheap handle copy used by typed getters (for nested objects
/// it shares the object); [`ParamValue::clone_value`] is the deep copy used
/// when an object graph is cloned.
pub trait ParamValue: Any + Clone + Send + Sync + fmt::Debug {
    /// Whether [`ParamValue::clone_value`] can succeed for this type
    fn cloneable() -> bool {
        true
    }

    /// Whether values of this type are computed from their owner on access
    fn computed() -> bool {
        false
    }

    /// Type a read produces; differs from `Self` only for computed values
    fn output_type_id() -> TypeId {
        TypeId::of::<Self>()
    }

    /// Independent deep copy
    fn clone_value(&self, ctx: &mut CloneContext) -> Result<Self>;

    /// Structural equality
    fn value_eq(&self, other: &Self, ctx: &mut CompareContext) -> bool;

    /// Feed the value's state into the context hasher
    fn value_hash(&self, ctx: &mut HashContext);

    /// Encode as JSON
    fn to_json(&self) -> Result<Value>;

    /// Decode from JSON
    fn from_json(value: &Value) -> Result<Self>;

    /// Visit every object handle reachable from this value
    fn visit_objects(&self, _visit: &mut dyn FnMut(&ObjectRef)) {}

    /// Evaluate a computed value against its owner
    fn invoke(&self, _owner: &dyn Object) -> Option<Result<TypedValue>> {
        None
    }
}

fn decode<T: DeserializeOwned>(value: &Value) -> Result<T> {
    serde_json::from_value(value.clone()).map_err(|e| {
        ReflexError::Serialization(format!("cannot decode {}: {}", type_name::<T>(), e))
    })
}

macro_rules! impl_exact_value {
    ($($t:ty),* $(,)?) => {$(
        impl ParamValue for $t {
            fn clone_value(&self, _ctx: &mut CloneContext) -> Result<Self> {
                Ok(self.clone())
            }

            fn value_eq(&self, other: &Self, _ctx: &mut CompareContext) -> bool {
                self == other
            }

            fn value_hash(&self, ctx: &mut HashContext) {
                self.hash(ctx.hasher());
            }

            fn to_json(&self) -> Result<Value> {
                Ok(serde_json::to_value(self)?)
            }

            fn from_json(value: &Value) -> Result<Self> {
                decode(value)
            }
        }
    )*};
}

impl_exact_value!(bool, i8, i16, i32, i64, u8, u16, u32, u64, usize, String);

// NaN compares equal to NaN and -0.0 hashes like 0.0 so that equal values
// always hash alike.
macro_rules! impl_float_value {
    ($($t:ty),* $(,)?) => {$(
        impl ParamValue for $t {
            fn clone_value(&self, _ctx: &mut CloneContext) -> Result<Self> {
                Ok(*self)
            }

            fn value_eq(&self, other: &Self, _ctx: &mut CompareContext) -> bool {
                self == other || (self.is_nan() && other.is_nan())
            }

            fn value_hash(&self, ctx: &mut HashContext) {
                let normalized: $t = if *self == 0.0 { 0.0 } else { *self };
                normalized.to_bits().hash(ctx.hasher());
            }

            fn to_json(&self) -> Result<Value> {
                Ok(serde_json::to_value(self)?)
            }

            fn from_json(value: &Value) -> Result<Self> {
                decode(value)
            }
        }

        impl<D> ParamValue for Array<$t, D>
        where
            D: Dimension + Serialize + DeserializeOwned + Send + Sync + 'static,
        {
            fn clone_value(&self, _ctx: &mut CloneContext) -> Result<Self> {
                Ok(self.clone())
            }

            fn value_eq(&self, other: &Self, _ctx: &mut CompareContext) -> bool {
                self.shape() == other.shape()
                    && self
                        .iter()
                        .zip(other.iter())
                        .all(|(a, b)| a == b || (a.is_nan() && b.is_nan()))
            }

            fn value_hash(&self, ctx: &mut HashContext) {
                self.shape().hash(ctx.hasher());
                for x in self.iter() {
                    let normalized: $t = if *x == 0.0 { 0.0 } else { *x };
                    normalized.to_bits().hash(ctx.hasher());
                }
            }

            fn to_json(&self) -> Result<Value> {
                Ok(serde_json::to_value(self)?)
            }

            fn from_json(value: &Value) -> Result<Self> {
                decode(value)
            }
        }
    )*};
}

impl_float_value!(f32, f64);

impl<T: ParamValue> ParamValue for Vec<T> {
    fn cloneable() -> bool {
        T::cloneable()
    }

    fn clone_value(&self, ctx: &mut CloneContext) -> Result<Self> {
        self.iter().map(|v| v.clone_value(ctx)).collect()
    }

    fn value_eq(&self, other: &Self, ctx: &mut CompareContext) -> bool {
        self.len() == other.len() && self.iter().zip(other).all(|(a, b)| a.value_eq(b, ctx))
    }

    fn value_hash(&self, ctx: &mut HashContext) {
        self.len().hash(ctx.hasher());
        for v in self {
            v.value_hash(ctx);
        }
    }

    fn to_json(&self) -> Result<Value> {
        let items = self.iter().map(ParamValue::to_json).collect::<Result<Vec<_>>>()?;
        Ok(Value::Array(items))
    }

    fn from_json(value: &Value) -> Result<Self> {
        value
            .as_array()
            .ok_or_else(|| {
                ReflexError::Serialization(format!("expected array for {}", type_name::<Self>()))
            })?
            .iter()
            .map(T::from_json)
            .collect()
    }

    fn visit_objects(&self, visit: &mut dyn FnMut(&ObjectRef)) {
        for v in self {
            v.visit_objects(visit);
        }
    }
}

impl<T: ParamValue> ParamValue for Option<T> {
    fn cloneable() -> bool {
        T::cloneable()
    }

    fn clone_value(&self, ctx: &mut CloneContext) -> Result<Self> {
        self.as_ref().map(|v| v.clone_value(ctx)).transpose()
    }

    fn value_eq(&self, other: &Self, ctx: &mut CompareContext) -> bool {
        match (self, other) {
            (Some(a), Some(b)) => a.value_eq(b, ctx),
            (None, None) => true,
            _ => false,
        }
    }

    fn value_hash(&self, ctx: &mut HashContext) {
        self.is_some().hash(ctx.hasher());
        if let Some(v) = self {
            v.value_hash(ctx);
        }
    }

    fn to_json(&self) -> Result<Value> {
        match self {
            Some(v) => v.to_json(),
            None => Ok(Value::Null),
        }
    }

    fn from_json(value: &Value) -> Result<Self> {
        if value.is_null() {
            Ok(None)
        } else {
            T::from_json(value).map(Some)
        }
    }

    fn visit_objects(&self, visit: &mut dyn FnMut(&ObjectRef)) {
        if let Some(v) = self {
            v.visit_objects(visit);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array2};

    #[test]
    fn test_float_equality_and_hash() {
        let mut cmp = CompareContext::new();
        assert!(f64::NAN.value_eq(&f64::NAN, &mut cmp));
        assert!(!1.0f64.value_eq(&1.5, &mut cmp));

        let mut a = HashContext::new();
        let mut b = HashContext::new();
        0.0f64.value_hash(&mut a);
        (-0.0f64).value_hash(&mut b);
        assert_eq!(a.finish(), b.finish());
    }

    #[test]
    fn test_matrix_shape_matters() {
        let a = Array2::<f64>::zeros((2, 3));
        let b = Array2::<f64>::zeros((3, 2));
        assert!(!a.value_eq(&b, &mut CompareContext::new()));
    }

    #[test]
    fn test_json_encoding() {
        let v = vec![Some(1i64), None, Some(3)];
        let json = v.to_json().unwrap();
        assert_eq!(json, serde_json::json!([1, null, 3]));
        assert_eq!(Vec::<Option<i64>>::from_json(&json).unwrap(), v);

        let m = array![[1.0, 2.0], [3.0, 4.0]];
        let decoded = Array2::<f64>::from_json(&m.to_json().unwrap()).unwrap();
        assert_eq!(decoded, m);

        assert!(String::from_json(&serde_json::json!(12)).is_err());
    }
}
