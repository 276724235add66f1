use thiserror::Error;

/// Raised by the strict parameter path and by `SimulationRequest::new`.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("missing required field '{field}'")]
    Missing { field: String },
    #[error("field '{field}' is not a number: {text:?}")]
    NotANumber { field: String, text: String },
    #[error("field '{field}' = {value} is out of range: {constraint}")]
    OutOfRange {
        field: String,
        value: f64,
        constraint: &'static str,
    },
    #[error("{0}")]
    Inconsistent(String),
}

/// The rate-ratio rumor lesson refuses to compute on partial input; the caller
/// keeps whatever it rendered last.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("insufficient input, missing: {}", .missing.join(", "))]
pub struct InsufficientInput {
    pub missing: Vec<String>,
}
