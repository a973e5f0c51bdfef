//! Type-erased values with exact runtime type identity

mod context;
mod typed_value;
mod value;

pub use context::{CloneContext, CompareContext, HashContext};
pub use typed_value::TypedValue;
pub use value::ParamValue;
