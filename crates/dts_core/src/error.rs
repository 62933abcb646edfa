use thiserror::Error;

/// Errors reported by models, integrators and interpolators.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DynamicsError {
    #[error("Unknown model: {0}")]
    UnknownModel(String),

    #[error("Unknown parameter: {0}")]
    UnknownParameter(String),

    #[error("Unknown coordinate: {0}")]
    UnknownCoordinate(String),

    #[error("Parameter {name} must be finite, got {value}")]
    InvalidParameterValue { name: String, value: f64 },

    #[error("Dimension mismatch. Expected {expected}, got {got}.")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("Step size must be finite and positive, got {0}")]
    InvalidStepSize(f64),

    /// A non-finite component appeared while stepping.
    #[error("Numerical divergence after {step} steps (component {component} = {value})")]
    NumericalDivergence {
        step: usize,
        component: usize,
        value: f64,
    },

    #[error("Invalid projection: {0}")]
    InvalidProjection(String),

    #[error("Invalid grid: {0}")]
    InvalidGrid(String),

    #[error("Point ({x}, {y}, {z}) lies outside the sampled grid")]
    OutOfGrid { x: f64, y: f64, z: f64 },

    #[error("Expression error: {0}")]
    Expression(String),
}

pub type Result<T> = std::result::Result<T, DynamicsError>;

/// Returns the index and value of the first non-finite component, if any.
pub(crate) fn first_non_finite(values: &[f64]) -> Option<(usize, f64)> {
    values
        .iter()
        .copied()
        .enumerate()
        .find(|(_, value)| !value.is_finite())
}

#[cfg(test)]
mod tests {
    use super::{first_non_finite, DynamicsError};

    #[test]
    fn first_non_finite_reports_index_and_value() {
        assert_eq!(first_non_finite(&[1.0, 2.0, 3.0]), None);
        let (index, value) = first_non_finite(&[1.0, f64::INFINITY, f64::NAN]).unwrap();
        assert_eq!(index, 1);
        assert!(value.is_infinite());
    }

    #[test]
    fn messages_name_the_offending_input() {
        let err = DynamicsError::UnknownParameter("sigma".to_string());
        assert!(err.to_string().contains("sigma"));
        let err = DynamicsError::DimensionMismatch {
            expected: 4,
            got: 3,
        };
        assert_eq!(err.to_string(), "Dimension mismatch. Expected 4, got 3.");
    }
}
