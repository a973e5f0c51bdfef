//! Property flags attached to parameters

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// Bitset of parameter properties
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct ParameterProperties: u32 {
        /// Hyperparameter, visible to model selection
        const HYPER       = 1 << 0;
        /// Has a gradient
        const GRADIENT    = 1 << 1;
        /// Learned model state
        const MODEL       = 1 << 2;
        /// Value may be computed by an auto-initializer
        const AUTO        = 1 << 3;
        /// Writes are validated by a constraint
        const CONSTRAIN   = 1 << 4;
        /// Cannot be put
        const READONLY    = 1 << 5;
        /// Invokable through `run`
        const RUNFUNCTION = 1 << 6;
        /// Every property; as a filter it matches any parameter
        const ALL         = u32::MAX;
    }
}

impl ParameterProperties {
    /// No properties
    pub const NONE: Self = Self::empty();
}

impl Default for ParameterProperties {
    fn default() -> Self {
        Self::NONE
    }
}

/// Description and flags of one parameter
#[derive(Clone, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AnyParameterProperties {
    description: String,
    mask: ParameterProperties,
}

impl AnyParameterProperties {
    /// Create from a description and a mask
    pub fn new(description: impl Into<String>, mask: ParameterProperties) -> Self {
        AnyParameterProperties {
            description: description.into(),
            mask,
        }
    }

    /// User-facing description
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Property bitset
    pub fn mask(&self) -> ParameterProperties {
        self.mask
    }

    /// Whether every bit of `property` is set
    pub fn has_property(&self, property: ParameterProperties) -> bool {
        self.mask.contains(property)
    }

    /// Set a property
    pub fn set_property(&mut self, property: ParameterProperties) {
        self.mask.insert(property);
    }

    /// Clear a property
    pub fn remove_property(&mut self, property: ParameterProperties) {
        self.mask.remove(property);
    }

    /// Whether the parameter passes a clone/traversal filter
    pub fn matches(&self, filter: ParameterProperties) -> bool {
        filter == ParameterProperties::ALL || self.mask.intersects(filter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_algebra() {
        let mut p = ParameterProperties::HYPER | ParameterProperties::GRADIENT;
        assert!(p.contains(ParameterProperties::HYPER));
        assert!(!p.contains(ParameterProperties::HYPER | ParameterProperties::AUTO));
        p.remove(ParameterProperties::HYPER);
        assert_eq!(p, ParameterProperties::GRADIENT);
        assert!(format!("{:?}", p).contains("GRADIENT"));
        assert!(ParameterProperties::NONE.is_empty());
        assert_eq!(ParameterProperties::default(), ParameterProperties::NONE);

        let json = serde_json::to_string(&(ParameterProperties::HYPER | ParameterProperties::MODEL))
            .unwrap();
        let back: ParameterProperties = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ParameterProperties::HYPER | ParameterProperties::MODEL);
    }

    #[test]
    fn test_filter_matching() {
        let plain = AnyParameterProperties::new("plain", ParameterProperties::NONE);
        assert!(plain.matches(ParameterProperties::ALL));
        assert!(!plain.matches(ParameterProperties::HYPER));

        let hyper = AnyParameterProperties::new("hyper", ParameterProperties::HYPER);
        assert!(hyper.matches(ParameterProperties::HYPER | ParameterProperties::MODEL));
    }
}
