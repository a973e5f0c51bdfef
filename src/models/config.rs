//! Perceptron configuration

use serde::{Deserialize, Serialize};

/// Hyperparameters of a [`Perceptron`](super::Perceptron)
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PerceptronConfig {
    /// Step size of each weight update
    pub learn_rate: f64,
    /// Upper bound on passes over the data
    pub max_iterations: usize,
    /// Weight initialisation, "zeros" or "random"
    pub initialization: String,
    /// Seed for random initialisation
    pub seed: u64,
}

impl Default for PerceptronConfig {
    fn default() -> Self {
        PerceptronConfig {
            learn_rate: 0.1,
            max_iterations: 1000,
            initialization: "zeros".to_string(),
            seed: 42,
        }
    }
}

impl PerceptronConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if !(self.learn_rate > 0.0) {
            return Err("Learning rate must be positive".to_string());
        }

        if self.max_iterations == 0 {
            return Err("Maximum number of iterations must be positive".to_string());
        }

        if self.initialization != "zeros" && self.initialization != "random" {
            return Err(format!(
                "Unknown initialization '{}', expected zeros or random",
                self.initialization
            ));
        }

        Ok(())
    }
}
