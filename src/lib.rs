//! # Reflex-ML: a reflective object model for machine learning components
//!
//! Every algorithm built on this crate is an [`Object`]: a shared,
//! reference-counted value whose state lives in a runtime parameter registry.
//! The registry makes objects introspectable, cloneable, comparable,
//! serializable and observable without per-type boilerplate.
//!
//! ## Features
//!
//! - **Typed values**: a checked "any" container with exact runtime type identity
//! - **Parameter registry**: typed get/put, constraints, hyper/gradient tagging
//! - **Object graphs**: deep clone and structural equality that survive sharing and cycles
//! - **Observation**: synchronous publish/subscribe of parameter snapshots
//! - **Bindings**: string options mapped to integer codes, untyped accessors
//! - **Serialization**: hook-driven parameter persistence with a JSON codec

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Type-erased value container
pub mod any;

/// Parameter descriptors, tags, constraints and the registry
pub mod parameter;

/// Shared object model built on the registry
pub mod object;

/// Publish/subscribe of parameter snapshots
pub mod observe;

/// Serialization boundary and JSON codec
pub mod io;

/// Concrete objects built on the substrate
pub mod models;

// Re-export commonly used types
pub use any::{ParamValue, TypedValue};
pub use object::{Object, ObjectBase, ObjectExt, ObjectRef, WeakObjectRef};
pub use parameter::{AnyParameter, AnyParameterProperties, BaseTag, ParameterProperties, Tag};

/// Error types for the library
#[derive(Debug, thiserror::Error)]
pub enum ReflexError {
    /// Requested and stored (or source and target) types differ
    #[error("Type mismatch for {context}: expected {expected}, found {actual}")]
    TypeMismatch {
        /// What was being accessed, e.g. `parameter GaussianKernel::width`
        context: String,
        /// Requested type
        expected: String,
        /// Actual type
        actual: String,
    },

    /// Unknown parameter name
    #[error("Parameter {object}::{name} does not exist")]
    ParameterNotFound {
        /// Owning object type
        object: String,
        /// Parameter name
        name: String,
    },

    /// A constraint rejected the candidate value
    #[error("Cannot put parameter {object}::{name}: {reason}")]
    ConstraintViolation {
        /// Owning object type
        object: String,
        /// Parameter name
        name: String,
        /// Message produced by the constraint
        reason: String,
    },

    /// Deep copy of a value that cannot be duplicated
    #[error("Cannot clone {context} of type {type_name}")]
    NotCloneable {
        /// What was being cloned
        context: String,
        /// Stored type
        type_name: String,
    },

    /// Unrecognised enum option, or no options for a parameter
    #[error("Invalid option: {0}")]
    InvalidOption(String),

    /// A required argument or state is missing
    #[error("Precondition failed: {0}")]
    PreconditionFailure(String),

    /// A run-function executed and reported failure
    #[error("Failed to run function {object}::{name}")]
    FunctionFailed {
        /// Owning object type
        object: String,
        /// Function name
        name: String,
    },

    /// The class factory has no constructor for this name
    #[error("Class {0} is not registered")]
    UnknownClass(String),

    /// A value could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for the library
pub type Result<T> = std::result::Result<T, ReflexError>;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        any::{ParamValue, TypedValue},
        object::{create_object, param, Object, ObjectBase, ObjectExt, ObjectRef, WeakObjectRef},
        observe::{ObservedValue, ParameterObserver, ParameterObserverHistory},
        parameter::{
            AnyParameterProperties, BaseTag, Constraint, ParameterProperties, Positive, Tag,
        },
        ReflexError, Result,
    };
}
