use nomotic_types::AgentId;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TrustError {
    #[error("trust {value} for agent {agent} is outside [{floor}, {ceiling}]")]
    OutOfBounds {
        agent: AgentId,
        value: f64,
        floor: f64,
        ceiling: f64,
    },
}

pub type TrustResult<T> = Result<T, TrustError>;
