//! Dense feature matrix

use crate::object::{param, Object, ObjectBase, ObjectExt, ObjectRef};
use crate::parameter::Tag;
use crate::Result;
use ndarray::Array2;

const FEATURE_MATRIX: Tag<Array2<f64>> = Tag::new("feature_matrix");

/// Feature vectors stored as the rows of an f64 matrix
#[derive(Debug)]
pub struct DenseFeatures {
    base: ObjectBase,
}

impl DenseFeatures {
    /// Wrap `matrix`, one vector per row
    pub fn new(matrix: Array2<f64>) -> Result<Self> {
        let base = ObjectBase::builder("DenseFeatures")
            .watch(param(FEATURE_MATRIX, matrix).description("Feature vectors, one per row"))
            .method("num_vectors", |o| Ok(o.get(FEATURE_MATRIX)?.nrows()))
            .method("num_features", |o| Ok(o.get(FEATURE_MATRIX)?.ncols()))
            .generic::<f64>()
            .build()?;
        Ok(DenseFeatures { base })
    }

    /// No vectors
    pub fn empty() -> Result<Self> {
        Self::new(Array2::zeros((0, 0)))
    }

    /// Copy of the matrix
    pub fn matrix(&self) -> Result<Array2<f64>> {
        self.get(FEATURE_MATRIX)
    }

    /// Number of rows
    pub fn num_vectors(&self) -> Result<usize> {
        self.get("num_vectors")
    }

    /// Number of columns
    pub fn num_features(&self) -> Result<usize> {
        self.get("num_features")
    }
}

impl Object for DenseFeatures {
    fn base(&self) -> &ObjectBase {
        &self.base
    }

    fn create_empty(&self) -> Result<ObjectRef> {
        Ok(ObjectRef::new(DenseFeatures::empty()?))
    }
}
