//! Lookup keys for parameters

use std::borrow::Cow;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

/// Untyped parameter key
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BaseTag {
    name: Cow<'static, str>,
}

impl BaseTag {
    /// Key for `name`
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        BaseTag { name: name.into() }
    }

    /// Parameter name
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl From<&str> for BaseTag {
    fn from(name: &str) -> Self {
        BaseTag::new(name.to_string())
    }
}

impl From<String> for BaseTag {
    fn from(name: String) -> Self {
        BaseTag::new(name)
    }
}

impl fmt::Display for BaseTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Parameter key carrying the parameter's static type.
///
/// Declared once per parameter, typically as a constant next to the object
/// that registers it, so getters and setters infer `T`:
///
/// ```
/// use reflex_ml::Tag;
///
/// const WIDTH: Tag<f64> = Tag::new("width");
/// assert_eq!(WIDTH.name(), "width");
/// ```
pub struct Tag<T> {
    name: Cow<'static, str>,
    _type: PhantomData<fn() -> T>,
}

impl<T> Tag<T> {
    /// Key for a static name
    pub const fn new(name: &'static str) -> Self {
        Tag {
            name: Cow::Borrowed(name),
            _type: PhantomData,
        }
    }

    /// Key for a runtime name
    pub fn owned(name: impl Into<String>) -> Self {
        Tag {
            name: Cow::Owned(name.into()),
            _type: PhantomData,
        }
    }

    /// Parameter name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Drop the type
    pub fn base(&self) -> BaseTag {
        BaseTag::new(self.name.clone())
    }
}

// Manual impls: derives would require `T: Clone` etc.
impl<T> Clone for Tag<T> {
    fn clone(&self) -> Self {
        Tag {
            name: self.name.clone(),
            _type: PhantomData,
        }
    }
}

impl<T> PartialEq for Tag<T> {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl<T> Eq for Tag<T> {}

impl<T> Hash for Tag<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

impl<T> fmt::Debug for Tag<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Tag<{}>({})", std::any::type_name::<T>(), self.name)
    }
}

impl<T> From<&str> for Tag<T> {
    fn from(name: &str) -> Self {
        Tag::owned(name)
    }
}

impl<T> From<String> for Tag<T> {
    fn from(name: String) -> Self {
        Tag::owned(name)
    }
}

impl<T> From<&Tag<T>> for Tag<T> {
    fn from(tag: &Tag<T>) -> Self {
        tag.clone()
    }
}

impl<T> From<Tag<T>> for BaseTag {
    fn from(tag: Tag<T>) -> Self {
        BaseTag::new(tag.name)
    }
}
