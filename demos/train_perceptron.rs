use ndarray::array;
use reflex_ml::io::to_json_string;
use reflex_ml::models::{DenseFeatures, Perceptron, PerceptronConfig};
use reflex_ml::observe::{ParameterObserverHistory, ParameterObserverLogger};
use reflex_ml::prelude::*;
use std::sync::Arc;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);

    // Two linearly separable clusters
    let x = array![
        [2.0, 1.0],
        [1.5, 2.5],
        [3.0, 0.5],
        [-1.0, -2.0],
        [-2.0, -0.5],
        [-1.5, -1.5]
    ];
    let y = array![1.0, 1.0, 1.0, -1.0, -1.0, -1.0];
    let features = ObjectRef::new(DenseFeatures::new(x)?);

    let config = PerceptronConfig {
        learn_rate: 0.5,
        initialization: "random".to_string(),
        ..PerceptronConfig::default()
    };
    let perceptron = Perceptron::from_config(&config)?;
    perceptron.set_training_data(features.clone(), y)?;

    let history = Arc::new(ParameterObserverHistory::with_filter(["training_error"]));
    perceptron.subscribe(Arc::new(ParameterObserverLogger));
    perceptron.subscribe(history.clone());
    perceptron.train()?;

    for record in history.records() {
        println!("pass {}: error = {:.3}", record.step(), record.get::<f64>()?);
    }
    let dense = features.downcast::<DenseFeatures>()?;
    println!("predictions: {}", perceptron.apply(&dense)?);
    println!("{}", perceptron.describe());
    println!("{}", to_json_string(&perceptron)?);
    Ok(())
}
