use crate::error::{DynamicsError, Result};
use crate::traits::{DynamicalModel, Interpolator, VectorField};
use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};

/// What to do with queries outside the sampled lattice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutOfGridPolicy {
    /// Clamp to the nearest lattice face: the result is the value on the edge.
    #[default]
    Clamp,
    /// Continue the nearest cell's trilinear blend beyond the edge.
    Extrapolate,
    /// Report [`DynamicsError::OutOfGrid`].
    Reject,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridSettings {
    /// Lattice nodes along each axis, at least 2.
    pub resolution: [usize; 3],
    pub policy: OutOfGridPolicy,
}

impl Default for GridSettings {
    fn default() -> Self {
        Self {
            resolution: [16, 16, 16],
            policy: OutOfGridPolicy::Clamp,
        }
    }
}

/// A vector field sampled on a regular 3D lattice.
///
/// Node `(i, j, k)` sits at `offset + (i, j, k) * spacing` and stores
/// `components` values.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldGrid {
    offset: Vector3<f64>,
    spacing: Vector3<f64>,
    counts: [usize; 3],
    components: usize,
    samples: Vec<f64>,
    source: Option<SampleSource>,
}

/// Identifies the model state a sampled grid was built from.
#[derive(Debug, Clone, PartialEq)]
struct SampleSource {
    model: String,
    version: u64,
}

impl FieldGrid {
    /// Builds a grid from explicit node values, laid out with `k` fastest.
    pub fn from_samples(
        offset: Vector3<f64>,
        spacing: Vector3<f64>,
        counts: [usize; 3],
        components: usize,
        samples: Vec<f64>,
    ) -> Result<Self> {
        if counts.iter().any(|&n| n < 2) {
            return Err(DynamicsError::InvalidGrid(format!(
                "each axis needs at least 2 nodes, got {counts:?}"
            )));
        }
        if spacing.iter().any(|&h| !h.is_finite() || h <= 0.0) {
            return Err(DynamicsError::InvalidGrid(
                "spacing must be finite and positive".to_string(),
            ));
        }
        if offset.iter().any(|o| !o.is_finite()) {
            return Err(DynamicsError::InvalidGrid("offset must be finite".to_string()));
        }
        if components == 0 {
            return Err(DynamicsError::InvalidGrid(
                "samples need at least one component".to_string(),
            ));
        }
        let expected = counts.iter().product::<usize>() * components;
        if samples.len() != expected {
            return Err(DynamicsError::DimensionMismatch {
                expected,
                got: samples.len(),
            });
        }
        Ok(Self {
            offset,
            spacing,
            counts,
            components,
            samples,
            source: None,
        })
    }

    /// Samples the model's derivative over the box spanned by its first three
    /// coordinate ranges. Extended components are taken from the default point.
    pub fn sample<M: DynamicalModel + ?Sized>(model: &M, settings: &GridSettings) -> Result<Self> {
        let coords = model.coordinates();
        let mut offset = Vector3::<f64>::zeros();
        let mut spacing = Vector3::<f64>::zeros();
        for axis in 0..3 {
            let coord = &coords[axis];
            if !coord.has_finite_range() {
                return Err(DynamicsError::InvalidGrid(format!(
                    "coordinate {} has no finite range to sample",
                    coord.name
                )));
            }
            let n = settings.resolution[axis];
            if n < 2 {
                return Err(DynamicsError::InvalidGrid(format!(
                    "each axis needs at least 2 nodes, got {:?}",
                    settings.resolution
                )));
            }
            offset[axis] = coord.min_value;
            spacing[axis] = (coord.max_value - coord.min_value) / (n - 1) as f64;
        }

        let [nx, ny, nz] = settings.resolution;
        let dim = model.dimension();
        let mut samples = Vec::with_capacity(nx * ny * nz * dim);
        let mut point = model.default_point();
        let mut value = vec![0.0; dim];
        for i in 0..nx {
            for j in 0..ny {
                for k in 0..nz {
                    point[0] = offset.x + i as f64 * spacing.x;
                    point[1] = offset.y + j as f64 * spacing.y;
                    point[2] = offset.z + k as f64 * spacing.z;
                    model.evaluate_into(&point, &mut value);
                    samples.extend_from_slice(&value);
                }
            }
        }

        let mut grid = Self::from_samples(offset, spacing, settings.resolution, dim, samples)?;
        grid.source = Some(SampleSource {
            model: model.name().to_string(),
            version: model.version(),
        });
        Ok(grid)
    }

    pub fn offset(&self) -> &Vector3<f64> {
        &self.offset
    }

    pub fn spacing(&self) -> &Vector3<f64> {
        &self.spacing
    }

    pub fn counts(&self) -> [usize; 3] {
        self.counts
    }

    pub fn components(&self) -> usize {
        self.components
    }

    /// Version of the model the samples came from; `None` for explicit data.
    pub fn model_version(&self) -> Option<u64> {
        self.source.as_ref().map(|source| source.version)
    }

    /// Name of the model the samples came from; `None` for explicit data.
    pub fn model_name(&self) -> Option<&str> {
        self.source.as_ref().map(|source| source.model.as_str())
    }

    /// Whether `model` no longer matches the samples: a different model, or
    /// the same model after a parameter change. Explicit grids are never stale.
    pub fn is_stale<M: DynamicalModel + ?Sized>(&self, model: &M) -> bool {
        match &self.source {
            None => false,
            Some(source) => {
                source.version != model.version()
                    || source.model != model.name()
                    || self.components != model.dimension()
            }
        }
    }

    /// Resamples from `model` if the grid is stale for it.
    /// Returns whether anything was recomputed; explicit grids are left alone.
    pub fn refresh<M: DynamicalModel + ?Sized>(&mut self, model: &M) -> Result<bool> {
        if !self.is_stale(model) {
            return Ok(false);
        }
        let settings = GridSettings {
            resolution: self.counts,
            ..GridSettings::default()
        };
        *self = Self::sample(model, &settings)?;
        Ok(true)
    }

    pub fn node_position(&self, i: usize, j: usize, k: usize) -> Point3<f64> {
        let index = Vector3::new(i as f64, j as f64, k as f64);
        Point3::from(self.offset + index.component_mul(&self.spacing))
    }

    pub fn value(&self, i: usize, j: usize, k: usize) -> &[f64] {
        let [_, ny, nz] = self.counts;
        let start = ((i * ny + j) * nz + k) * self.components;
        &self.samples[start..start + self.components]
    }

    fn contains(&self, rel: &Vector3<f64>) -> bool {
        (0..3).all(|axis| rel[axis] >= 0.0 && rel[axis] <= (self.counts[axis] - 1) as f64)
    }
}

/// Trilinear interpolation over a [`FieldGrid`].
#[derive(Debug, Clone, Copy)]
pub struct TrilinearInterpolator<'a> {
    grid: &'a FieldGrid,
    grid_spacing: Vector3<f64>,
    grid_offset: Vector3<f64>,
    policy: OutOfGridPolicy,
}

impl<'a> TrilinearInterpolator<'a> {
    pub fn new(grid: &'a FieldGrid) -> Self {
        Self::with_policy(grid, OutOfGridPolicy::default())
    }

    pub fn with_policy(grid: &'a FieldGrid, policy: OutOfGridPolicy) -> Self {
        Self {
            grid,
            grid_spacing: grid.spacing,
            grid_offset: grid.offset,
            policy,
        }
    }

    pub fn policy(&self) -> OutOfGridPolicy {
        self.policy
    }

    /// Cell index and fractional offset along one axis.
    fn locate(&self, rel: f64, axis: usize) -> (usize, f64) {
        let last_cell = self.grid.counts[axis] - 2;
        let cell = (rel.floor().max(0.0) as usize).min(last_cell);
        let t = rel - cell as f64;
        match self.policy {
            OutOfGridPolicy::Extrapolate => (cell, t),
            OutOfGridPolicy::Clamp | OutOfGridPolicy::Reject => (cell, t.clamp(0.0, 1.0)),
        }
    }
}

impl Interpolator for TrilinearInterpolator<'_> {
    fn interpolate(&self, p: &Point3<f64>) -> Result<Vec<f64>> {
        let rel = (p.coords - self.grid_offset).component_div(&self.grid_spacing);
        if self.policy == OutOfGridPolicy::Reject && !self.grid.contains(&rel) {
            return Err(DynamicsError::OutOfGrid {
                x: p.x,
                y: p.y,
                z: p.z,
            });
        }

        let (i, tx) = self.locate(rel.x, 0);
        let (j, ty) = self.locate(rel.y, 1);
        let (k, tz) = self.locate(rel.z, 2);

        let g = self.grid;
        let corners = [
            g.value(i, j, k),
            g.value(i + 1, j, k),
            g.value(i, j + 1, k),
            g.value(i + 1, j + 1, k),
            g.value(i, j, k + 1),
            g.value(i + 1, j, k + 1),
            g.value(i, j + 1, k + 1),
            g.value(i + 1, j + 1, k + 1),
        ];

        let out = (0..g.components)
            .map(|c| {
                // Axis 0: four edges.
                let e00 = lerp(corners[0][c], corners[1][c], tx);
                let e10 = lerp(corners[2][c], corners[3][c], tx);
                let e01 = lerp(corners[4][c], corners[5][c], tx);
                let e11 = lerp(corners[6][c], corners[7][c], tx);
                // Axis 1: two faces.
                let f0 = lerp(e00, e10, ty);
                let f1 = lerp(e01, e11, ty);
                // Axis 2.
                lerp(f0, f1, tz)
            })
            .collect();
        Ok(out)
    }
}

// Exact at both ends: t = 0 gives `near`, t = 1 gives `far`.
#[inline]
fn lerp(near: f64, far: f64, t: f64) -> f64 {
    (1.0 - t) * near + t * far
}
