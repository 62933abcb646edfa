//! Projections from phase space to the 3D display space.
//!
//! Every transformer borrows its model. The inverse of a projection is only
//! exact for 3-dimensional models: components that are not shown are filled
//! with the midpoint of their coordinate range (or the coordinate default
//! when the range is unbounded).

use crate::error::{DynamicsError, Result};
use crate::traits::{DynamicalModel, Transform, VectorField};
use nalgebra::Vector3;

/// Identity projection onto components 0, 1 and 2.
#[derive(Debug)]
pub struct Transformer<'a, M: ?Sized> {
    model: &'a M,
    name: String,
    version: u64,
}

impl<'a, M: DynamicalModel + ?Sized> Transformer<'a, M> {
    pub fn new(model: &'a M) -> Self {
        Self {
            model,
            name: "transformer".to_string(),
            version: 0,
        }
    }

    pub fn set_name(&mut self, name: &str) {
        self.name = name.to_string();
    }
}

impl<M: DynamicalModel + ?Sized> Transform for Transformer<'_, M> {
    fn name(&self) -> &str {
        &self.name
    }

    fn version(&self) -> u64 {
        self.version
    }

    fn dimension(&self) -> usize {
        self.model.dimension()
    }

    fn transform_into(&self, v: &[f64], out: &mut Vector3<f64>) {
        out.copy_from_slice(&v[..3]);
    }

    fn inv_transform_into(&self, v: &Vector3<f64>, out: &mut [f64]) {
        out[..3].copy_from_slice(v.as_slice());
        fill_hidden(self.model, out, |i| i < 3);
    }
}

/// Displays a chosen triple of coordinates.
///
/// Changing the selection changes the meaning of every projected point, so
/// an accepted [`AxisTransformer::set_axes`] bumps the version.
#[derive(Debug)]
pub struct AxisTransformer<'a, M: ?Sized> {
    model: &'a M,
    axes: [usize; 3],
    version: u64,
}

impl<'a, M: DynamicalModel + ?Sized> AxisTransformer<'a, M> {
    pub fn new(model: &'a M) -> Self {
        Self {
            model,
            axes: [0, 1, 2],
            version: 0,
        }
    }

    pub fn axes(&self) -> [usize; 3] {
        self.axes
    }

    /// Selects the displayed coordinates by index. Indices must be distinct
    /// and within the model dimension.
    pub fn set_axes(&mut self, axes: [usize; 3]) -> Result<()> {
        let dim = self.model.dimension();
        if let Some(&bad) = axes.iter().find(|&&axis| axis >= dim) {
            return Err(DynamicsError::DimensionMismatch {
                expected: dim,
                got: bad + 1,
            });
        }
        if axes[0] == axes[1] || axes[0] == axes[2] || axes[1] == axes[2] {
            return Err(DynamicsError::InvalidProjection(format!(
                "display axes must be distinct, got {axes:?}"
            )));
        }
        if axes != self.axes {
            self.axes = axes;
            self.version += 1;
        }
        Ok(())
    }

    /// Selects the displayed coordinates by name.
    pub fn set_axes_by_name(&mut self, names: [&str; 3]) -> Result<()> {
        let coords = self.model.coordinates();
        let mut axes = [0; 3];
        for (slot, name) in axes.iter_mut().zip(names) {
            *slot = coords
                .iter()
                .position(|c| c.name == name)
                .ok_or_else(|| DynamicsError::UnknownCoordinate(name.to_string()))?;
        }
        self.set_axes(axes)
    }
}

impl<M: DynamicalModel + ?Sized> Transform for AxisTransformer<'_, M> {
    fn name(&self) -> &str {
        "axes"
    }

    fn version(&self) -> u64 {
        self.version
    }

    fn dimension(&self) -> usize {
        self.model.dimension()
    }

    fn transform_into(&self, v: &[f64], out: &mut Vector3<f64>) {
        for (slot, &axis) in out.iter_mut().zip(&self.axes) {
            *slot = v[axis];
        }
    }

    fn inv_transform_into(&self, v: &Vector3<f64>, out: &mut [f64]) {
        for (value, &axis) in v.iter().zip(&self.axes) {
            out[axis] = *value;
        }
        let axes = self.axes;
        fill_hidden(self.model, out, |i| axes.contains(&i));
    }
}

/// Reads components 0..2 as cylindrical `(r, theta, z)` and displays them
/// in Cartesian coordinates.
#[derive(Debug)]
pub struct CylindricalTransformer<'a, M: ?Sized> {
    model: &'a M,
}

impl<'a, M: DynamicalModel + ?Sized> CylindricalTransformer<'a, M> {
    pub fn new(model: &'a M) -> Self {
        Self { model }
    }
}

impl<M: DynamicalModel + ?Sized> Transform for CylindricalTransformer<'_, M> {
    fn name(&self) -> &str {
        "cylindrical"
    }

    fn version(&self) -> u64 {
        0
    }

    fn dimension(&self) -> usize {
        self.model.dimension()
    }

    fn transform_into(&self, v: &[f64], out: &mut Vector3<f64>) {
        let (r, theta, z) = (v[0], v[1], v[2]);
        *out = Vector3::new(r * theta.cos(), r * theta.sin(), z);
    }

    fn inv_transform_into(&self, v: &Vector3<f64>, out: &mut [f64]) {
        out[0] = v.x.hypot(v.y);
        out[1] = v.y.atan2(v.x);
        out[2] = v.z;
        fill_hidden(self.model, out, |i| i < 3);
    }
}

fn fill_hidden<M, F>(model: &M, out: &mut [f64], shown: F)
where
    M: DynamicalModel + ?Sized,
    F: Fn(usize) -> bool,
{
    for (i, coord) in model.coordinates().iter().enumerate() {
        if !shown(i) {
            out[i] = coord.midpoint();
        }
    }
}
