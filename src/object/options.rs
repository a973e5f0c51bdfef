//! String options mapped to integer codes

use crate::{ReflexError, Result};
use std::collections::BTreeMap;

/// Per-parameter table of option string to integer code.
///
/// Codes are unique within a parameter, so the reverse lookup is exact.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StringEnumMap {
    map: BTreeMap<String, BTreeMap<String, i64>>,
}

impl StringEnumMap {
    /// Empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `option` as `code` for parameter `param` of object `owner`
    pub fn add(&mut self, owner: &str, param: &str, option: &str, code: i64) -> Result<()> {
        let options = self.map.entry(param.to_string()).or_default();
        if options.contains_key(option) {
            return Err(ReflexError::PreconditionFailure(format!(
                "Option '{}' for parameter {}::{} is already registered",
                option, owner, param
            )));
        }
        if let Some((existing, _)) = options.iter().find(|(_, c)| **c == code) {
            return Err(ReflexError::PreconditionFailure(format!(
                "Code {} for parameter {}::{} is already used by option '{}'",
                code, owner, param, existing
            )));
        }
        options.insert(option.to_string(), code);
        Ok(())
    }

    /// Whether `param` has any options
    pub fn has_options(&self, param: &str) -> bool {
        self.map.contains_key(param)
    }

    /// Code for `option`
    pub fn code(&self, owner: &str, param: &str, option: &str) -> Result<i64> {
        let options = self
            .map
            .get(param)
            .ok_or_else(|| no_options(owner, param))?;
        options.get(option).copied().ok_or_else(|| {
            ReflexError::InvalidOption(format!(
                "Illegal option '{}' for parameter {}::{}",
                option, owner, param
            ))
        })
    }

    /// Option string registered for `code`
    pub fn option(&self, param: &str, code: i64) -> Option<&str> {
        self.map
            .get(param)?
            .iter()
            .find(|(_, c)| **c == code)
            .map(|(option, _)| option.as_str())
    }

    /// Options of one parameter
    pub fn options(&self, param: &str) -> Option<&BTreeMap<String, i64>> {
        self.map.get(param)
    }

    /// Copy of the whole table
    pub fn to_map(&self) -> BTreeMap<String, BTreeMap<String, i64>> {
        self.map.clone()
    }
}

pub(crate) fn no_options(owner: &str, param: &str) -> ReflexError {
    ReflexError::InvalidOption(format!(
        "There are no options for parameter {}::{}",
        owner, param
    ))
}
