//! Traversal state for deep clone, equality and hashing of object graphs
//!
//! Object parameters may point at shared or even cyclic sub-graphs. Each
//! traversal keys objects by the address of their shared allocation:
//!
//! - cloning memoises every copied object, so a sub-object reached twice is
//!   copied once and a cycle closes onto the copy under construction;
//! - equality records pairs under comparison and treats a revisited pair as
//!   equal;
//! - hashing visits each object at most once.

use crate::object::{self, ObjectRef};
use crate::Result;
use std::collections::hash_map::DefaultHasher;
use std::collections::{HashMap, HashSet};
use std::hash::{Hash, Hasher};

/// Memo table of objects already copied during one deep clone
#[derive(Default)]
pub struct CloneContext {
    clones: HashMap<usize, ObjectRef>,
}

impl CloneContext {
    /// Start a fresh clone traversal
    pub fn new() -> Self {
        Self::default()
    }

    /// Deep copy an object, reusing the copy if it was already made
    pub fn clone_object(&mut self, source: &ObjectRef) -> Result<ObjectRef> {
        if let Some(copy) = self.clones.get(&source.addr()) {
            return Ok(copy.clone());
        }
        object::deep_clone(source.as_object(), crate::ParameterProperties::ALL, self)
    }

    /// Copy made for the object at `addr`, if any
    pub fn lookup(&self, addr: usize) -> Option<&ObjectRef> {
        self.clones.get(&addr)
    }

    pub(crate) fn remember(&mut self, addr: usize, copy: ObjectRef) {
        self.clones.insert(addr, copy);
    }
}

/// Pairs of objects currently being compared
#[derive(Default)]
pub struct CompareContext {
    in_progress: HashSet<(usize, usize)>,
}

impl CompareContext {
    /// Start a fresh comparison
    pub fn new() -> Self {
        Self::default()
    }

    /// Structural equality of two objects
    pub fn compare_objects(&mut self, a: &ObjectRef, b: &ObjectRef) -> bool {
        a.ptr_eq(b) || object::objects_equal(a.as_object(), b.as_object(), self)
    }

    /// Mark a pair as under comparison; false if it already was
    pub(crate) fn enter(&mut self, a: usize, b: usize) -> bool {
        self.in_progress.insert((a, b))
    }
}

/// Hasher plus the set of objects already hashed
pub struct HashContext {
    hasher: DefaultHasher,
    visited: HashSet<usize>,
}

impl HashContext {
    /// Start a fresh hash
    pub fn new() -> Self {
        HashContext {
            hasher: DefaultHasher::new(),
            visited: HashSet::new(),
        }
    }

    /// Underlying hasher
    pub fn hasher(&mut self) -> &mut DefaultHasher {
        &mut self.hasher
    }

    /// Hash the parameters of an object, once per traversal
    pub fn hash_object(&mut self, obj: &ObjectRef) {
        if self.visited.insert(obj.addr()) {
            object::hash_object(obj.as_object(), self);
        } else {
            // revisit marker
            obj.name().hash(&mut self.hasher);
        }
    }

    pub(crate) fn enter(&mut self, addr: usize) -> bool {
        self.visited.insert(addr)
    }

    /// Current hash value
    pub fn finish(&self) -> u64 {
        self.hasher.finish()
    }
}

impl Default for HashContext {
    fn default() -> Self {
        Self::new()
    }
}
