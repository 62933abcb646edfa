use crate::error::{DynamicsError, Result};
use crate::parameter::{Coordinate, Parameter, ParameterRegistry};
use nalgebra::{Point3, Vector3};

/// The right-hand side `f` of `dx/dt = f(x)`.
pub trait VectorField {
    /// Returns the dimension of the state space.
    fn dimension(&self) -> usize;

    /// Writes the derivative at `x` into `out`.
    /// Both slices have length `dimension()`.
    fn evaluate_into(&self, x: &[f64], out: &mut [f64]);

    /// Allocating form of [`VectorField::evaluate_into`].
    fn evaluate(&self, x: &[f64]) -> Vec<f64> {
        let mut out = vec![0.0; self.dimension()];
        self.evaluate_into(x, &mut out);
        out
    }
}

/// A named vector field whose constants live in a [`ParameterRegistry`].
///
/// Variants implement [`VectorField`] plus the two registry accessors; all
/// other methods are provided.
pub trait DynamicalModel: VectorField + Send + Sync {
    fn name(&self) -> &str;

    fn registry(&self) -> &ParameterRegistry;

    fn registry_mut(&mut self) -> &mut ParameterRegistry;

    /// Point the camera should be centered on when the model is selected.
    /// Defaults to the midpoint of the first three coordinate ranges.
    fn view_center(&self) -> Point3<f64> {
        range_center(self.coordinates())
    }

    fn coordinates(&self) -> &[Coordinate] {
        self.registry().coordinates()
    }

    fn parameters(&self) -> &[Parameter] {
        self.registry().parameters()
    }

    fn parameter_value(&self, name: &str) -> Option<f64> {
        self.registry().parameter(name).map(|p| p.value)
    }

    fn default_point(&self) -> Vec<f64> {
        self.registry().default_point()
    }

    fn version(&self) -> u64 {
        self.registry().version()
    }

    fn set_parameter_value(&mut self, name: &str, value: f64) -> Result<f64> {
        self.registry_mut().set_value(name, value)
    }

    fn reset_parameters(&mut self) {
        self.registry_mut().reset_to_defaults();
    }
}

/// Maps phase-space vectors to 3D display vectors and back.
pub trait Transform {
    fn name(&self) -> &str;

    /// Bumped whenever the mapping itself changes.
    fn version(&self) -> u64;

    /// Dimension of the phase-space side of the mapping.
    fn dimension(&self) -> usize;

    fn transform_into(&self, v: &[f64], out: &mut Vector3<f64>);

    fn inv_transform_into(&self, v: &Vector3<f64>, out: &mut [f64]);

    fn transform(&self, v: &[f64]) -> Vector3<f64> {
        let mut out = Vector3::zeros();
        self.transform_into(v, &mut out);
        out
    }

    fn inv_transform(&self, v: &Vector3<f64>) -> Vec<f64> {
        let mut out = vec![0.0; self.dimension()];
        self.inv_transform_into(v, &mut out);
        out
    }
}

/// Estimates a sampled field at an arbitrary point of the 3D lattice space.
pub trait Interpolator {
    fn interpolate(&self, p: &Point3<f64>) -> Result<Vec<f64>>;
}

/// Midpoint of the first three coordinate ranges; missing axes sit at 0.
pub(crate) fn range_center(coords: &[Coordinate]) -> Point3<f64> {
    let axis = |i: usize| coords.get(i).map(Coordinate::midpoint).unwrap_or(0.0);
    Point3::new(axis(0), axis(1), axis(2))
}

pub(crate) fn check_dimension(expected: usize, got: usize) -> Result<()> {
    if expected != got {
        return Err(DynamicsError::DimensionMismatch { expected, got });
    }
    Ok(())
}
