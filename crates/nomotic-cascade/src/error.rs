use nomotic_types::ConfigError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CascadeError {
    #[error("allow threshold {allow} must be greater than deny threshold {deny}")]
    InvertedThresholds { allow: f64, deny: f64 },

    #[error("threshold {name} = {value} is outside [0.0, 1.0]")]
    ThresholdOutOfRange { name: &'static str, value: f64 },

    #[error(transparent)]
    Config(#[from] ConfigError),
}
