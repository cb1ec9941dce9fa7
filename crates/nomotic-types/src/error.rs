use thiserror::Error;

/// Rejected configuration. Fatal at startup or reload; never reaches evaluation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("configuration rejected with {} error(s): {}", .0.len(), .0.join("; "))]
    Invalid(Vec<String>),
}

impl ConfigError {
    pub fn errors(&self) -> &[String] {
        match self {
            ConfigError::Invalid(errors) => errors,
        }
    }
}
