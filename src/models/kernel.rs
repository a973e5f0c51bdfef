//! Kernels over dense features

use super::DenseFeatures;
use crate::object::{param, Object, ObjectBase, ObjectExt, ObjectRef};
use crate::parameter::{AutoValue, Positive, Tag};
use crate::{ReflexError, Result};
use ndarray::{Array2, ArrayView1};

const WIDTH: Tag<f64> = Tag::new("width");
const FEATURES: Tag<Option<ObjectRef>> = Tag::new("features");
const KERNEL_LIST: Tag<Vec<ObjectRef>> = Tag::new("kernel_list");
const SUBKERNEL_WEIGHTS: Tag<Vec<f64>> = Tag::new("subkernel_weights");

/// A similarity function between feature vectors
pub trait Kernel: Object {
    /// Kernel value for one pair of vectors
    fn compute(&self, a: ArrayView1<'_, f64>, b: ArrayView1<'_, f64>) -> Result<f64>;

    /// Kernel matrix between the rows of `lhs` and `rhs`
    fn kernel_matrix(&self, lhs: &DenseFeatures, rhs: &DenseFeatures) -> Result<Array2<f64>> {
        let a = lhs.matrix()?;
        let b = rhs.matrix()?;
        if a.ncols() != b.ncols() {
            return Err(ReflexError::PreconditionFailure(format!(
                "{}: feature dimensions differ ({} vs {})",
                self.name(),
                a.ncols(),
                b.ncols()
            )));
        }
        let mut k = Array2::zeros((a.nrows(), b.nrows()));
        for (i, x) in a.rows().into_iter().enumerate() {
            for (j, y) in b.rows().into_iter().enumerate() {
                k[[i, j]] = self.compute(x, y)?;
            }
        }
        Ok(k)
    }
}

/// View any built-in kernel object through the [`Kernel`] trait
pub fn as_kernel(object: &dyn Object) -> Result<&dyn Kernel> {
    let any = object.as_any();
    if let Some(k) = any.downcast_ref::<GaussianKernel>() {
        return Ok(k);
    }
    if let Some(k) = any.downcast_ref::<LinearKernel>() {
        return Ok(k);
    }
    if let Some(k) = any.downcast_ref::<CombinedKernel>() {
        return Ok(k);
    }
    Err(ReflexError::TypeMismatch {
        context: "kernel dispatch".to_string(),
        expected: "kernel".to_string(),
        actual: object.name().to_string(),
    })
}

fn squared_distance(a: ArrayView1<'_, f64>, b: ArrayView1<'_, f64>) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y) * (x - y)).sum()
}

// Median of the pairwise squared distances of the attached features.
fn median_heuristic(owner: &dyn Object) -> Result<f64> {
    let features = owner.get_as::<DenseFeatures>(FEATURES.name())?;
    let x = features.matrix()?;
    let mut distances = Vec::new();
    for i in 0..x.nrows() {
        for j in (i + 1)..x.nrows() {
            distances.push(squared_distance(x.row(i), x.row(j)));
        }
    }
    if distances.is_empty() {
        return Err(ReflexError::PreconditionFailure(format!(
            "{}: median heuristic needs at least two feature vectors",
            owner.name()
        )));
    }
    distances.sort_by(|a, b| a.total_cmp(b));
    let mid = distances.len() / 2;
    let median = if distances.len() % 2 == 0 {
        (distances[mid - 1] + distances[mid]) / 2.0
    } else {
        distances[mid]
    };
    Ok(if median > 0.0 { median } else { 1.0 })
}

/// `k(x, y) = exp(-|x - y|^2 / width)`
#[derive(Debug)]
pub struct GaussianKernel {
    base: ObjectBase,
}

impl GaussianKernel {
    /// Kernel whose width is estimated from the features passed to [`init`](Self::init)
    pub fn new() -> Result<Self> {
        let base = ObjectBase::builder("GaussianKernel")
            .watch(
                param(WIDTH, 1.0)
                    .description("Kernel width")
                    .hyper()
                    .gradient()
                    .constrain(Positive)
                    .auto(AutoValue::new(
                        "median_heuristic",
                        "Median pairwise squared distance of the features",
                        median_heuristic,
                    )),
            )
            .watch(param(FEATURES, None).description("Features the width is estimated from"))
            .build()?;
        Ok(GaussianKernel { base })
    }

    /// Kernel with a fixed width
    pub fn with_width(width: f64) -> Result<Self> {
        let kernel = Self::new()?;
        kernel.put(WIDTH, width)?;
        Ok(kernel)
    }

    /// Current width
    pub fn width(&self) -> Result<f64> {
        self.get(WIDTH)
    }

    /// Attach features and estimate the width unless the user set one
    pub fn init(&self, features: ObjectRef) -> Result<()> {
        self.put(FEATURES, Some(features))?;
        self.init_auto_params()
    }
}

impl Object for GaussianKernel {
    fn base(&self) -> &ObjectBase {
        &self.base
    }

    fn create_empty(&self) -> Result<ObjectRef> {
        Ok(ObjectRef::new(GaussianKernel::new()?))
    }
}

impl Kernel for GaussianKernel {
    fn compute(&self, a: ArrayView1<'_, f64>, b: ArrayView1<'_, f64>) -> Result<f64> {
        let width = self.width()?;
        Ok((-squared_distance(a, b) / width).exp())
    }
}

/// `k(x, y) = x . y`
#[derive(Debug)]
pub struct LinearKernel {
    base: ObjectBase,
}

impl LinearKernel {
    /// Parameter-free linear kernel
    pub fn new() -> Result<Self> {
        Ok(LinearKernel {
            base: ObjectBase::new("LinearKernel"),
        })
    }
}

impl Object for LinearKernel {
    fn base(&self) -> &ObjectBase {
        &self.base
    }

    fn create_empty(&self) -> Result<ObjectRef> {
        Ok(ObjectRef::new(LinearKernel::new()?))
    }
}

impl Kernel for LinearKernel {
    fn compute(&self, a: ArrayView1<'_, f64>, b: ArrayView1<'_, f64>) -> Result<f64> {
        Ok(a.dot(&b))
    }
}

/// Weighted sum of sub-kernels; a sub-kernel without a weight counts once
#[derive(Debug)]
pub struct CombinedKernel {
    base: ObjectBase,
}

impl CombinedKernel {
    /// No sub-kernels
    pub fn new() -> Result<Self> {
        let base = ObjectBase::builder("CombinedKernel")
            .watch(param(KERNEL_LIST, Vec::new()).description("Sub-kernels"))
            .watch(
                param(SUBKERNEL_WEIGHTS, Vec::new())
                    .description("Weight of each sub-kernel")
                    .hyper(),
            )
            .method("num_subkernels", |o| Ok(o.get(KERNEL_LIST)?.len()))
            .build()?;
        Ok(CombinedKernel { base })
    }

    /// Append a sub-kernel with `weight`
    pub fn append(&self, kernel: ObjectRef, weight: f64) -> Result<()> {
        as_kernel(kernel.as_object())?;
        let mut weights = self.get(SUBKERNEL_WEIGHTS)?;
        let count = self.get(KERNEL_LIST)?.len();
        weights.resize(count, 1.0);
        weights.push(weight);
        self.add(KERNEL_LIST.name(), kernel)?;
        self.put(SUBKERNEL_WEIGHTS, weights)?;
        Ok(())
    }
}

impl Object for CombinedKernel {
    fn base(&self) -> &ObjectBase {
        &self.base
    }

    fn create_empty(&self) -> Result<ObjectRef> {
        Ok(ObjectRef::new(CombinedKernel::new()?))
    }
}

impl Kernel for CombinedKernel {
    fn compute(&self, a: ArrayView1<'_, f64>, b: ArrayView1<'_, f64>) -> Result<f64> {
        let kernels = self.get(KERNEL_LIST)?;
        let weights = self.get(SUBKERNEL_WEIGHTS)?;
        let mut sum = 0.0;
        for (i, kernel) in kernels.iter().enumerate() {
            let weight = weights.get(i).copied().unwrap_or(1.0);
            sum += weight * as_kernel(kernel.as_object())?.compute(a, b)?;
        }
        Ok(sum)
    }
}
