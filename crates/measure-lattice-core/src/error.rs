use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LatticeError {
    #[error("Invalid input: {field} — {reason}")]
    InvalidInput { field: String, reason: String },

    /// No-arbitrage condition d < e^(rΔt) < u does not hold.
    #[error(
        "Invalid model: risk-neutral probability {p_star} outside [0, 1] \
         (need d < e^(rΔt) < u, got d={d}, e^(rΔt)={growth_factor}, u={u})"
    )]
    ModelError {
        p_star: Decimal,
        growth_factor: Decimal,
        u: Decimal,
        d: Decimal,
    },

    #[error("Division by zero in {context}")]
    DivisionByZero { context: String },

    #[error("Limit exceeded: {what} = {requested} exceeds configured maximum {max}")]
    LimitExceeded {
        what: String,
        requested: u64,
        max: u64,
    },

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<serde_json::Error> for LatticeError {
    fn from(e: serde_json::Error) -> Self {
        LatticeError::SerializationError(e.to_string())
    }
}
