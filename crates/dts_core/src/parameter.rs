use crate::error::{DynamicsError, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// One axis of the phase space, with the range used for display and sliders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub name: String,
    pub default_value: f64,
    pub min_value: f64,
    pub max_value: f64,
}

impl Coordinate {
    pub fn new(name: &str, default_value: f64, min_value: f64, max_value: f64) -> Self {
        Self {
            name: name.to_string(),
            default_value,
            min_value,
            max_value,
        }
    }

    /// Midpoint of `[min, max]`, or the default value when the range is unbounded.
    pub fn midpoint(&self) -> f64 {
        let mid = self.min_value + (self.max_value - self.min_value) / 2.0;
        if mid.is_finite() {
            mid
        } else {
            self.default_value
        }
    }

    pub fn has_finite_range(&self) -> bool {
        self.min_value.is_finite() && self.max_value.is_finite() && self.max_value > self.min_value
    }
}

/// A tunable constant of the model's equations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub value: f64,
    pub min_value: f64,
    pub max_value: f64,
    pub default_value: f64,
    pub step_size: f64,
}

impl Parameter {
    pub fn new(
        name: &str,
        value: f64,
        min_value: f64,
        max_value: f64,
        default_value: f64,
        step_size: f64,
    ) -> Self {
        Self {
            name: name.to_string(),
            value,
            min_value,
            max_value,
            default_value,
            step_size,
        }
    }
}

/// Coordinates and parameters owned by a model, plus its version counter.
///
/// The sets are fixed after construction; only parameter values change.
/// Every accepted change bumps the version by one, and the version never
/// decreases for the lifetime of the registry.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ParameterRegistry {
    coordinates: Vec<Coordinate>,
    parameters: Vec<Parameter>,
    /// Parameter values in declaration order, kept in step with `parameters`.
    #[serde(skip)]
    values: Vec<f64>,
    version: u64,
}

impl ParameterRegistry {
    pub fn new(coordinates: Vec<Coordinate>, parameters: Vec<Parameter>) -> Self {
        let values = parameters.iter().map(|p| p.value).collect();
        Self {
            coordinates,
            parameters,
            values,
            version: 0,
        }
    }

    pub fn dimension(&self) -> usize {
        self.coordinates.len()
    }

    pub fn coordinates(&self) -> &[Coordinate] {
        &self.coordinates
    }

    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    pub fn coordinate(&self, name: &str) -> Option<&Coordinate> {
        self.coordinates.iter().find(|c| c.name == name)
    }

    pub fn parameter(&self, name: &str) -> Option<&Parameter> {
        self.parameters.iter().find(|p| p.name == name)
    }

    /// Current value of the parameter at `index`, in declaration order.
    ///
    /// Variants read their constants through this in `evaluate_into`.
    #[inline]
    pub fn value(&self, index: usize) -> f64 {
        self.values[index]
    }

    /// All parameter values in declaration order, without allocating.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn parameter_values(&self) -> Vec<f64> {
        self.values.clone()
    }

    pub fn default_point(&self) -> Vec<f64> {
        self.coordinates.iter().map(|c| c.default_value).collect()
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    /// Sets a parameter value, clamped to its `[min, max]` range.
    ///
    /// Returns the stored value. Unknown names and non-finite values are
    /// rejected without touching the registry or its version.
    pub fn set_value(&mut self, name: &str, value: f64) -> Result<f64> {
        let Some(index) = self.parameters.iter().position(|p| p.name == name) else {
            warn!(parameter = name, "ignoring value for unknown parameter");
            return Err(DynamicsError::UnknownParameter(name.to_string()));
        };
        if !value.is_finite() {
            return Err(DynamicsError::InvalidParameterValue {
                name: name.to_string(),
                value,
            });
        }

        let parameter = &mut self.parameters[index];
        let stored = clamp_to_range(value, parameter.min_value, parameter.max_value);
        parameter.value = stored;
        self.values[index] = stored;
        self.version += 1;
        debug!(
            parameter = name,
            value = stored,
            version = self.version,
            "parameter updated"
        );
        Ok(stored)
    }

    /// Restores every parameter to its default value as a single change.
    pub fn reset_to_defaults(&mut self) {
        for (parameter, value) in self.parameters.iter_mut().zip(&mut self.values) {
            parameter.value = parameter.default_value;
            *value = parameter.default_value;
        }
        self.version += 1;
    }
}

fn clamp_to_range(value: f64, min: f64, max: f64) -> f64 {
    if min <= max {
        value.clamp(min, max)
    } else {
        value
    }
}
