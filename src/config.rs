//! Configuration structures for training
//!
//! This module provides the per-run training settings: the gradient-descent
//! step size and the seed used to initialize layer parameters.

use crate::utils::SimpleRng;
use serde::Deserialize;
use std::error::Error;
use std::fs;

fn default_learning_rate() -> f32 {
    0.005
}

/// Configuration for training.
///
/// This structure is used to parse training configuration from JSON files.
///
/// - **learning_rate**: Step size passed to every `backprop` call (default 0.005)
/// - **seed**: Optional RNG seed; when absent the RNG is seeded from the clock
///
/// # Example
///
/// ```json
/// {
///   "learning_rate": 0.005,
///   "seed": 42
/// }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct TrainingConfig {
    /// Gradient-descent step size
    #[serde(default = "default_learning_rate")]
    pub learning_rate: f32,

    /// Seed for parameter initialization
    pub seed: Option<u64>,
}

impl TrainingConfig {
    /// RNG for parameter initialization.
    ///
    /// Seeded from `seed` when present, so two runs build identical layers;
    /// otherwise reseeded from the current time.
    pub fn rng(&self) -> SimpleRng {
        match self.seed {
            Some(seed) => SimpleRng::new(seed),
            None => {
                let mut rng = SimpleRng::new(0);
                rng.reseed_from_time();
                rng
            }
        }
    }
}

/// Loads a training configuration from a JSON file.
///
/// Reads the file at `path` and deserializes its JSON contents into a `TrainingConfig`.
///
/// # Returns
///
/// `Ok(TrainingConfig)` on success, or an error if the file cannot be read, the JSON
/// is invalid, or the learning rate is not a positive finite number.
///
/// # Examples
///
/// ```no_run
/// use tiny_cnn::config::load_config;
///
/// let cfg = load_config("config/training.json").unwrap();
/// assert!(cfg.learning_rate > 0.0);
/// ```
pub fn load_config(path: &str) -> Result<TrainingConfig, Box<dyn Error>> {
    let contents = fs::read_to_string(path)?;
    let config: TrainingConfig = serde_json::from_str(&contents)?;
    validate_config(&config)?;
    Ok(config)
}

fn validate_config(config: &TrainingConfig) -> Result<(), Box<dyn Error>> {
    if !config.learning_rate.is_finite() || config.learning_rate <= 0.0 {
        return Err(Box::new(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!(
                "learning_rate must be a positive number, got {}",
                config.learning_rate
            ),
        )));
    }

    Ok(())
}
