//! Perceptron with observable training

use super::{DenseFeatures, PerceptronConfig};
use crate::object::{param, Object, ObjectBase, ObjectExt, ObjectRef};
use crate::parameter::{GreaterThan, Positive, Tag};
use crate::{ReflexError, Result};
use ndarray::Array1;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, warn};

const LEARN_RATE: Tag<f64> = Tag::new("learn_rate");
const MAX_ITERATIONS: Tag<usize> = Tag::new("max_iterations");
const INITIALIZATION: Tag<i64> = Tag::new("initialization");
const SEED: Tag<u64> = Tag::new("seed");
const FEATURES: Tag<Option<ObjectRef>> = Tag::new("features");
const LABELS: Tag<Array1<f64>> = Tag::new("labels");
const WEIGHTS: Tag<Array1<f64>> = Tag::new("weights");
const BIAS: Tag<f64> = Tag::new("bias");
const CURRENT_ITERATION: Tag<i64> = Tag::new("current_iteration");
const CONVERGED: Tag<bool> = Tag::new("converged");

/// Binary linear classifier trained with the perceptron rule.
///
/// Labels are +1 / -1. Training runs until every vector is classified
/// correctly or `max_iterations` passes are done, emitting `weights`, `bias`
/// and `training_error` after each pass.
#[derive(Debug)]
pub struct Perceptron {
    base: ObjectBase,
}

impl Perceptron {
    /// Untrained perceptron with default hyperparameters
    pub fn new() -> Result<Self> {
        Self::from_config(&PerceptronConfig::default())
    }

    /// Untrained perceptron configured from `config`
    pub fn from_config(config: &PerceptronConfig) -> Result<Self> {
        config
            .validate()
            .map_err(|e| ReflexError::PreconditionFailure(format!("Perceptron: {}", e)))?;

        let base = ObjectBase::builder("Perceptron")
            .watch(
                param(LEARN_RATE, config.learn_rate)
                    .description("Step size of weight updates")
                    .hyper()
                    .constrain(Positive),
            )
            .watch(
                param(MAX_ITERATIONS, config.max_iterations)
                    .description("Maximum passes over the data")
                    .hyper()
                    .constrain(GreaterThan(0usize)),
            )
            .watch(param(INITIALIZATION, 0).description("Weight initialisation"))
            .option(INITIALIZATION.name(), "zeros", 0)
            .option(INITIALIZATION.name(), "random", 1)
            .watch(param(SEED, config.seed).description("Seed for random initialisation"))
            .watch(param(FEATURES, None).description("Training features"))
            .watch(param(LABELS, Array1::zeros(0)).description("Training labels, +1 or -1"))
            .watch(param(WEIGHTS, Array1::zeros(0)).description("Weight vector").model())
            .watch(param(BIAS, 0.0).description("Bias").model())
            .watch(param(CURRENT_ITERATION, 0).description("Passes done so far"))
            .watch(param(CONVERGED, false).description("Whether training converged"))
            .run_function("train", train)
            .observable("weights", "Weight vector after each pass")
            .observable("bias", "Bias after each pass")
            .observable("training_error", "Fraction of misclassified vectors in each pass")
            .build()?;

        let perceptron = Perceptron { base };
        perceptron.put_string(INITIALIZATION.name(), &config.initialization)?;
        Ok(perceptron)
    }

    /// Current hyperparameters
    pub fn config(&self) -> Result<PerceptronConfig> {
        Ok(PerceptronConfig {
            learn_rate: self.get(LEARN_RATE)?,
            max_iterations: self.get(MAX_ITERATIONS)?,
            initialization: self.get_string(INITIALIZATION.name())?,
            seed: self.get(SEED)?,
        })
    }

    /// Attach training data
    pub fn set_training_data(&self, features: ObjectRef, labels: Array1<f64>) -> Result<()> {
        features.downcast::<DenseFeatures>()?;
        self.put(FEATURES, Some(features))?;
        self.put(LABELS, labels)?;
        Ok(())
    }

    /// Train on the attached data
    pub fn train(&self) -> Result<()> {
        self.run("train")
    }

    /// +1 / -1 predictions for the rows of `features`
    pub fn apply(&self, features: &DenseFeatures) -> Result<Array1<f64>> {
        let x = features.matrix()?;
        let w = self.get(WEIGHTS)?;
        if x.ncols() != w.len() {
            return Err(ReflexError::PreconditionFailure(format!(
                "Perceptron: {} features but {} weights",
                x.ncols(),
                w.len()
            )));
        }
        let b = self.get(BIAS)?;
        Ok(x.dot(&w).mapv(|v| if v + b >= 0.0 { 1.0 } else { -1.0 }))
    }
}

impl Object for Perceptron {
    fn base(&self) -> &ObjectBase {
        &self.base
    }

    fn create_empty(&self) -> Result<ObjectRef> {
        Ok(ObjectRef::new(Perceptron::new()?))
    }
}

fn train(owner: &dyn Object) -> Result<bool> {
    let features = owner.get_as::<DenseFeatures>(FEATURES.name())?;
    let x = features.matrix()?;
    let labels = owner.get(LABELS)?;
    if labels.len() != x.nrows() {
        return Err(ReflexError::PreconditionFailure(format!(
            "Perceptron: {} labels for {} vectors",
            labels.len(),
            x.nrows()
        )));
    }
    if x.nrows() == 0 {
        warn!("Perceptron: no training vectors");
        return Ok(false);
    }

    let learn_rate = owner.get(LEARN_RATE)?;
    let max_iterations = owner.get(MAX_ITERATIONS)?;
    let mut w = match owner.get_string(INITIALIZATION.name())?.as_str() {
        "random" => {
            let mut rng = StdRng::seed_from_u64(owner.get(SEED)?);
            Array1::from_shape_fn(x.ncols(), |_| rng.gen_range(-1.0..1.0))
        }
        _ => Array1::zeros(x.ncols()),
    };
    let mut b = 0.0;
    let mut converged = false;
    let mut iteration = 0;

    while !converged && iteration < max_iterations {
        converged = true;
        let mut errors = 0usize;
        for (xi, &yi) in x.rows().into_iter().zip(labels.iter()) {
            let prediction = if xi.dot(&w) + b >= 0.0 { 1.0 } else { -1.0 };
            if prediction != yi {
                converged = false;
                errors += 1;
                w.scaled_add(learn_rate * yi, &xi);
                b += learn_rate * yi;
            }
        }
        iteration += 1;

        owner.put(CURRENT_ITERATION, iteration as i64)?;
        let step = owner.step();
        owner.observe(step, "weights", "Weight vector", &w)?;
        owner.observe(step, "bias", "Bias", &b)?;
        let error = errors as f64 / x.nrows() as f64;
        owner.observe(step, "training_error", "Fraction misclassified", &error)?;
    }

    if converged {
        debug!(iterations = iteration, "Perceptron converged");
    } else {
        warn!(
            iterations = iteration,
            "Perceptron did not converge after {} iterations", iteration
        );
    }
    owner.put(WEIGHTS, w)?.put(BIAS, b)?.put(CONVERGED, converged)?;
    Ok(true)
}
