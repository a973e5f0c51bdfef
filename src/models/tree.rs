//! Binary probability tree with weak parent links

use crate::object::{param, Object, ObjectBase, ObjectExt, ObjectRef, WeakObjectRef};
use crate::parameter::{Tag, WithinRange};
use crate::{ReflexError, Result};
use std::sync::{Arc, Weak};

const CHILDREN: Tag<Vec<ObjectRef>> = Tag::new("children");
const PARENT: Tag<WeakObjectRef> = Tag::new("parent");
const PROBABILITY: Tag<f64> = Tag::new("probability");
const LABEL: Tag<i64> = Tag::new("label");

/// Node of a binary tree whose inner nodes hold the probability of
/// descending to their right child.
///
/// Children are owned; the parent is a weak link, so dropping the root frees
/// the whole tree. The first child is the left one.
#[derive(Debug)]
pub struct TreeNode {
    base: ObjectBase,
    this: Weak<TreeNode>,
}

impl TreeNode {
    /// Inner node with right-branch probability `probability`
    pub fn create(probability: f64) -> Result<Arc<TreeNode>> {
        let base = ObjectBase::builder("TreeNode")
            .watch(param(CHILDREN, Vec::new()).description("Left and right child"))
            .watch(param(PARENT, WeakObjectRef::empty()).description("Parent node"))
            .watch(
                param(PROBABILITY, 0.5)
                    .description("Probability of the right branch")
                    .constrain(WithinRange { low: 0.0, high: 1.0 }),
            )
            .watch(param(LABEL, -1).description("Class of a leaf, -1 for inner nodes"))
            .build()?;
        let node = Arc::new_cyclic(|this| TreeNode {
            base,
            this: this.clone(),
        });
        node.put(PROBABILITY, probability)?;
        Ok(node)
    }

    /// Leaf for class `label`
    pub fn create_leaf(label: i64) -> Result<Arc<TreeNode>> {
        let node = Self::create(0.5)?;
        node.put(LABEL, label)?;
        Ok(node)
    }

    fn handle(&self) -> Result<ObjectRef> {
        self.this
            .upgrade()
            .map(ObjectRef::from_arc)
            .ok_or_else(|| ReflexError::PreconditionFailure("TreeNode is not shared".to_string()))
    }

    /// Attach `child` as the left, then the right child
    pub fn add_child(&self, child: &Arc<TreeNode>) -> Result<()> {
        let mut children = self.get(CHILDREN)?;
        if children.len() >= 2 {
            return Err(ReflexError::PreconditionFailure(
                "TreeNode already has two children".to_string(),
            ));
        }
        child.put(PARENT, self.handle()?.downgrade())?;
        children.push(ObjectRef::from_arc(Arc::clone(child)));
        self.put(CHILDREN, children)?;
        Ok(())
    }

    /// Child nodes, left first
    pub fn children(&self) -> Result<Vec<Arc<TreeNode>>> {
        self.get(CHILDREN)?
            .iter()
            .map(|c| c.downcast::<TreeNode>())
            .collect()
    }

    /// Parent node, if attached and alive
    pub fn parent(&self) -> Result<Option<Arc<TreeNode>>> {
        self.get(PARENT)?
            .upgrade()
            .map(|p| p.downcast::<TreeNode>())
            .transpose()
    }

    /// Probability of the right branch
    pub fn probability(&self) -> Result<f64> {
        self.get(PROBABILITY)
    }

    /// Class of a leaf
    pub fn label(&self) -> Result<i64> {
        self.get(LABEL)
    }

    /// No children
    pub fn is_leaf(&self) -> Result<bool> {
        Ok(self.get(CHILDREN)?.is_empty())
    }

    /// Probability of reaching this node from the root
    pub fn path_probability(&self) -> Result<f64> {
        let mut probability = 1.0;
        let mut node = match self.this.upgrade() {
            Some(node) => node,
            None => return Ok(probability),
        };
        while let Some(parent) = node.parent()? {
            let p = parent.probability()?;
            let is_left = parent
                .children()?
                .first()
                .map_or(false, |left| Arc::ptr_eq(left, &node));
            probability *= if is_left { 1.0 - p } else { p };
            node = parent;
        }
        Ok(probability)
    }

    /// `(label, probability)` of every leaf below this node
    pub fn leaf_probabilities(&self) -> Result<Vec<(i64, f64)>> {
        let mut leaves = Vec::new();
        self.collect_leaves(&mut leaves)?;
        Ok(leaves)
    }

    fn collect_leaves(&self, leaves: &mut Vec<(i64, f64)>) -> Result<()> {
        let children = self.children()?;
        if children.is_empty() {
            leaves.push((self.label()?, self.path_probability()?));
        }
        for child in children {
            child.collect_leaves(leaves)?;
        }
        Ok(())
    }
}

impl Object for TreeNode {
    fn base(&self) -> &ObjectBase {
        &self.base
    }

    fn create_empty(&self) -> Result<ObjectRef> {
        Ok(ObjectRef::from_arc(TreeNode::create(0.5)?))
    }

    // Parent links are not persisted; restore them from the children.
    fn load_serializable_post(&self) -> Result<()> {
        self.base.load_serializable_post()?;
        let this = self.handle()?.downgrade();
        for child in self.children()? {
            child.put(PARENT, this.clone())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::{from_json_str, to_json_string};
    use crate::parameter::ParameterProperties;

    //       root (0.7)
    //      /          \
    //   leaf 0     inner (0.4)
    //              /       \
    //          leaf 1     leaf 2
    fn tree() -> Arc<TreeNode> {
        let root = TreeNode::create(0.7).unwrap();
        let inner = TreeNode::create(0.4).unwrap();
        root.add_child(&TreeNode::create_leaf(0).unwrap()).unwrap();
        root.add_child(&inner).unwrap();
        inner.add_child(&TreeNode::create_leaf(1).unwrap()).unwrap();
        inner.add_child(&TreeNode::create_leaf(2).unwrap()).unwrap();
        root
    }

    fn assert_leaves(root: &TreeNode) {
        let leaves = root.leaf_probabilities().unwrap();
        let expected = [(0, 0.3), (1, 0.7 * 0.6), (2, 0.7 * 0.4)];
        assert_eq!(leaves.len(), expected.len());
        for ((label, p), (want_label, want_p)) in leaves.iter().zip(expected.iter()) {
            assert_eq!(label, want_label);
            assert!((p - want_p).abs() < 1e-12);
        }
    }

    #[test]
    fn test_leaf_probabilities() {
        let root = tree();
        assert_leaves(&root);
        let total: f64 = root.leaf_probabilities().unwrap().iter().map(|(_, p)| p).sum();
        assert!((total - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_parent_links_are_weak() {
        let root = tree();
        let inner = root.children().unwrap()[1].clone();
        assert!(Arc::ptr_eq(&inner.parent().unwrap().unwrap(), &root));

        drop(root);
        assert!(inner.parent().unwrap().is_none());
        assert_eq!(inner.path_probability().unwrap(), 1.0);
    }

    #[test]
    fn test_probability_range() {
        let node = TreeNode::create(0.5).unwrap();
        assert!(node.put(PROBABILITY, 1.5).is_err());
        assert!(TreeNode::create(-0.1).is_err());
        assert!(node.add_child(&TreeNode::create_leaf(0).unwrap()).is_ok());
        assert!(node.add_child(&TreeNode::create_leaf(1).unwrap()).is_ok());
        assert!(node.add_child(&TreeNode::create_leaf(2).unwrap()).is_err());
    }

    #[test]
    fn test_clone_relinks_parents() {
        let root = tree();
        let copy = root.clone_object(ParameterProperties::ALL).unwrap();
        assert!(copy.equals(&*root));

        let copy = copy.downcast::<TreeNode>().unwrap();
        let inner = copy.children().unwrap()[1].clone();
        assert!(Arc::ptr_eq(&inner.parent().unwrap().unwrap(), &copy));
        assert_leaves(&copy);

        inner.put(PROBABILITY, 0.9).unwrap();
        assert!(!copy.equals(&*root));
        assert_leaves(&root);
    }

    #[test]
    fn test_json_restores_parents() {
        let root = tree();
        let text = to_json_string(&*root).unwrap();
        let loaded = from_json_str(&text).unwrap();
        assert!(loaded.equals(&*root));

        let loaded = loaded.downcast::<TreeNode>().unwrap();
        let leaf = loaded.children().unwrap()[1].children().unwrap()[0].clone();
        assert!(leaf.parent().unwrap().is_some());
        assert_leaves(&loaded);
        assert!(loaded.base().lifecycle().load_post_called());
    }
}
