//! Concrete objects built on the substrate
//!
//! - [`DenseFeatures`]: a matrix of feature vectors
//! - [`GaussianKernel`], [`LinearKernel`], [`CombinedKernel`]: kernels with
//!   tagged hyperparameters
//! - [`Perceptron`]: a linear classifier whose training is observable
//! - [`TreeNode`]: probability tree with weak parent links

mod config;
mod features;
mod kernel;
mod perceptron;
mod tree;

pub use config::PerceptronConfig;
pub use features::DenseFeatures;
pub use kernel::{as_kernel, CombinedKernel, GaussianKernel, Kernel, LinearKernel};
pub use perceptron::Perceptron;
pub use tree::TreeNode;

use crate::object::{Constructor, ObjectRef};

/// Constructors the class factory starts with
pub(crate) fn builtin_classes() -> Vec<(&'static str, Constructor)> {
    let classes: [(&'static str, Constructor); 6] = [
        ("DenseFeatures", || Ok(ObjectRef::new(DenseFeatures::empty()?))),
        ("GaussianKernel", || Ok(ObjectRef::new(GaussianKernel::new()?))),
        ("LinearKernel", || Ok(ObjectRef::new(LinearKernel::new()?))),
        ("CombinedKernel", || Ok(ObjectRef::new(CombinedKernel::new()?))),
        ("Perceptron", || Ok(ObjectRef::new(Perceptron::new()?))),
        ("TreeNode", || Ok(ObjectRef::from_arc(TreeNode::create(0.5)?))),
    ];
    classes.to_vec()
}
