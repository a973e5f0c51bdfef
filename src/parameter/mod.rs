//! Parameter descriptors, lookup keys, constraints and the registry

pub(crate) mod constraint;
mod auto_init;
mod descriptor;
mod properties;
mod registry;
mod tag;

pub use auto_init::{AutoInit, AutoValue};
pub use constraint::{
    predicate, Constrain, Constraint, ConstraintFn, GreaterThan, GreaterThanOrEqual, LessThan,
    LessThanOrEqual, NonNegative, Positive, Predicate, WithinRange,
};
pub use descriptor::{AnyParameter, PutCallback};
pub use properties::{AnyParameterProperties, ParameterProperties};
pub use registry::Registry;
pub(crate) use registry::check_update;
pub use tag::{BaseTag, Tag};
