//! Synchronous publish/subscribe of parameter snapshots
//!
//! An object emits [`ObservedValue`] records while it runs (typically once per
//! training iteration). Each record is delivered in subscription order to the
//! observers attached to the object. With no observers attached, emitting is
//! a no-op and the value is never copied.

mod channel;
mod observed_value;
mod observer;

pub use channel::ObservationChannel;
pub use observed_value::ObservedValue;
pub use observer::{ParameterObserver, ParameterObserverHistory, ParameterObserverLogger};
