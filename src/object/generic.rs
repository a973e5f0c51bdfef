//! Element type marker for templated objects

use crate::any::ParamValue;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Primitive element types an object can be instantiated for
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[allow(missing_docs)]
pub enum PrimitiveType {
    Bool,
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
}

impl fmt::Display for PrimitiveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PrimitiveType::Bool => "bool",
            PrimitiveType::I8 => "i8",
            PrimitiveType::I16 => "i16",
            PrimitiveType::I32 => "i32",
            PrimitiveType::I64 => "i64",
            PrimitiveType::U8 => "u8",
            PrimitiveType::U16 => "u16",
            PrimitiveType::U32 => "u32",
            PrimitiveType::U64 => "u64",
            PrimitiveType::F32 => "f32",
            PrimitiveType::F64 => "f64",
        };
        f.write_str(name)
    }
}

/// Types usable as a generic marker
pub trait Primitive: ParamValue {
    /// Marker value for this type
    const PRIMITIVE: PrimitiveType;
}

macro_rules! impl_primitive {
    ($($t:ty => $v:ident),* $(,)?) => {$(
        impl Primitive for $t {
            const PRIMITIVE: PrimitiveType = PrimitiveType::$v;
        }
    )*};
}

impl_primitive!(
    bool => Bool,
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    u8 => U8,
    u16 => U16,
    u32 => U32,
    u64 => U64,
    f32 => F32,
    f64 => F64,
);
