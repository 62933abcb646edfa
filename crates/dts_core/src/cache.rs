//! Version-stamped trajectory storage.
//!
//! Renderers keep one [`TrajectoryCache`] per displayed orbit and call
//! [`TrajectoryCache::refresh`] every frame. The orbit is only recomputed
//! when a different model or transformer is passed in, when either one's
//! version moved, or when the seed or settings changed.

use crate::error::{first_non_finite, Result};
use crate::integrator::{Integrator, IntegratorSettings};
use crate::traits::{check_dimension, DynamicalModel, Transform, VectorField};
use nalgebra::Point3;
use tracing::{debug, warn};

/// What a computed orbit was built against.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Stamp {
    model: String,
    dimension: usize,
    model_version: u64,
    transform: String,
    transform_version: u64,
}

impl Stamp {
    fn new<M, T>(model: &M, transform: &T) -> Self
    where
        M: DynamicalModel + ?Sized,
        T: Transform + ?Sized,
    {
        Self {
            model: model.name().to_string(),
            dimension: model.dimension(),
            model_version: model.version(),
            transform: transform.name().to_string(),
            transform_version: transform.version(),
        }
    }

    fn matches<M, T>(&self, model: &M, transform: &T) -> bool
    where
        M: DynamicalModel + ?Sized,
        T: Transform + ?Sized,
    {
        self.model_version == model.version()
            && self.transform_version == transform.version()
            && self.dimension == model.dimension()
            && self.model == model.name()
            && self.transform == transform.name()
    }
}

#[derive(Debug, Clone)]
pub struct TrajectoryCache {
    settings: IntegratorSettings,
    seed: Option<Vec<f64>>,
    points: Vec<Vec<f64>>,
    display: Vec<Point3<f64>>,
    stamp: Option<Stamp>,
    diverged_at: Option<usize>,
}

impl TrajectoryCache {
    pub fn new(settings: IntegratorSettings) -> Self {
        Self {
            settings,
            seed: None,
            points: Vec::new(),
            display: Vec::new(),
            stamp: None,
            diverged_at: None,
        }
    }

    pub fn settings(&self) -> &IntegratorSettings {
        &self.settings
    }

    pub fn set_settings(&mut self, settings: IntegratorSettings) {
        if settings != self.settings {
            self.settings = settings;
            self.invalidate();
        }
    }

    /// Starts the orbit at `seed` instead of the model's default point.
    pub fn set_seed(&mut self, seed: Vec<f64>) {
        self.seed = Some(seed);
        self.invalidate();
    }

    pub fn clear_seed(&mut self) {
        self.seed = None;
        self.invalidate();
    }

    pub fn invalidate(&mut self) {
        self.stamp = None;
    }

    pub fn is_stale<M, T>(&self, model: &M, transform: &T) -> bool
    where
        M: DynamicalModel + ?Sized,
        T: Transform + ?Sized,
    {
        !self
            .stamp
            .as_ref()
            .is_some_and(|stamp| stamp.matches(model, transform))
    }

    /// Recomputes the orbit if anything it depends on changed.
    /// Returns whether a recomputation happened.
    ///
    /// A diverging orbit is truncated before the first non-finite point
    /// (when `check_finite` is set) rather than reported as an error.
    pub fn refresh<M, T>(&mut self, model: &M, transform: &T) -> Result<bool>
    where
        M: DynamicalModel + ?Sized,
        T: Transform + ?Sized,
    {
        if !self.is_stale(model, transform) {
            return Ok(false);
        }

        let integrator = Integrator::from_settings(model, &self.settings)?;
        let start = match &self.seed {
            Some(seed) => {
                check_dimension(model.dimension(), seed.len())?;
                seed.clone()
            }
            None => model.default_point(),
        };

        self.points.clear();
        self.diverged_at = None;
        for (n, point) in integrator.orbit(&start).take(self.settings.steps + 1).enumerate() {
            if self.settings.check_finite && first_non_finite(&point).is_some() {
                warn!(model = model.name(), step = n, "orbit diverged, truncating");
                self.diverged_at = Some(n);
                break;
            }
            self.points.push(point);
        }

        self.display = self
            .points
            .iter()
            .map(|p| Point3::from(transform.transform(p)))
            .collect();
        self.stamp = Some(Stamp::new(model, transform));
        debug!(
            model = model.name(),
            points = self.points.len(),
            "trajectory recomputed"
        );
        Ok(true)
    }

    /// Phase-space points of the last computed orbit.
    pub fn points(&self) -> &[Vec<f64>] {
        &self.points
    }

    /// The same points in display coordinates.
    pub fn display_points(&self) -> &[Point3<f64>] {
        &self.display
    }

    /// Index of the first non-finite point, if the last orbit diverged.
    pub fn diverged_at(&self) -> Option<usize> {
        self.diverged_at
    }
}

impl Default for TrajectoryCache {
    fn default() -> Self {
        Self::new(IntegratorSettings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::TrajectoryCache;
    use crate::error::DynamicsError;
    use crate::integrator::{Integrator, IntegratorSettings};
    use crate::models::{Lorenz, Rossler, Vallis};
    use crate::traits::DynamicalModel;
    use crate::transformer::{AxisTransformer, CylindricalTransformer, Transformer};

    fn settings(steps: usize) -> IntegratorSettings {
        IntegratorSettings {
            step_size: 0.01,
            steps,
            check_finite: true,
        }
    }

    #[test]
    fn refresh_only_recomputes_when_versions_change() {
        let mut model = Lorenz::default();
        let mut cache = TrajectoryCache::new(settings(50));

        {
            let transformer = Transformer::new(&model);
            assert!(cache.is_stale(&model, &transformer));
            assert_eq!(cache.refresh(&model, &transformer), Ok(true));
            assert_eq!(cache.refresh(&model, &transformer), Ok(false));
            assert_eq!(cache.points().len(), 51);
        }

        model.set_parameter_value("rho", 14.0).unwrap();
        let transformer = Transformer::new(&model);
        assert!(cache.is_stale(&model, &transformer));
        assert_eq!(cache.refresh(&model, &transformer), Ok(true));

        let expected = Integrator::new(&model, 0.01)
            .unwrap()
            .trajectory(&model.default_point(), 50, true)
            .unwrap();
        assert_eq!(cache.points(), expected.as_slice());
    }

    #[test]
    fn display_points_follow_the_transformer() {
        let model = Rossler::default();
        let mut cache = TrajectoryCache::new(settings(10));
        let mut transformer = AxisTransformer::new(&model);
        cache.refresh(&model, &transformer).unwrap();
        assert_eq!(cache.display_points()[0].coords.as_slice(), &[5.0, 5.0, 5.0]);

        transformer.set_axes([0, 1, 3]).unwrap();
        assert!(cache.is_stale(&model, &transformer));
        assert_eq!(cache.refresh(&model, &transformer), Ok(true));
        let last = cache.display_points().last().unwrap();
        assert!((last.z - 0.1).abs() < 1e-12);
    }

    #[test]
    fn seed_and_settings_changes_invalidate() {
        let model = Lorenz::default();
        let transformer = Transformer::new(&model);
        let mut cache = TrajectoryCache::default();
        cache.set_settings(settings(5));
        cache.refresh(&model, &transformer).unwrap();

        cache.set_seed(vec![2.0, 2.0, 2.0]);
        assert!(cache.is_stale(&model, &transformer));
        cache.refresh(&model, &transformer).unwrap();
        assert_eq!(cache.points()[0], vec![2.0, 2.0, 2.0]);

        cache.set_settings(settings(5));
        assert!(!cache.is_stale(&model, &transformer));
        cache.set_settings(settings(8));
        assert!(cache.is_stale(&model, &transformer));
        cache.refresh(&model, &transformer).unwrap();
        assert_eq!(cache.points().len(), 9);

        cache.clear_seed();
        cache.refresh(&model, &transformer).unwrap();
        assert_eq!(cache.points()[0], model.default_point());
    }

    #[test]
    fn bad_seed_or_step_size_is_reported() {
        let model = Lorenz::default();
        let transformer = Transformer::new(&model);
        let mut cache = TrajectoryCache::new(settings(5));
        cache.set_seed(vec![1.0]);
        assert!(matches!(
            cache.refresh(&model, &transformer),
            Err(DynamicsError::DimensionMismatch { .. })
        ));

        cache.clear_seed();
        cache.set_settings(IntegratorSettings {
            step_size: 0.0,
            ..settings(5)
        });
        assert!(matches!(
            cache.refresh(&model, &transformer),
            Err(DynamicsError::InvalidStepSize(_))
        ));
    }

    #[test]
    fn switching_models_recomputes_the_orbit() {
        let lorenz = Lorenz::default();
        let vallis = Vallis::default();
        let mut cache = TrajectoryCache::new(settings(20));
        cache.refresh(&lorenz, &Transformer::new(&lorenz)).unwrap();

        // Both models sit at version 0 with an identity transformer at version 0.
        let transformer = Transformer::new(&vallis);
        assert!(cache.is_stale(&vallis, &transformer));
        assert_eq!(cache.refresh(&vallis, &transformer), Ok(true));

        let expected = Integrator::new(&vallis, 0.01)
            .unwrap()
            .trajectory(&vallis.default_point(), 20, true)
            .unwrap();
        assert_eq!(cache.points(), expected.as_slice());
    }

    #[test]
    fn switching_transformers_recomputes_display_points() {
        let model = Lorenz::default();
        let mut cache = TrajectoryCache::new(settings(5));
        cache.refresh(&model, &Transformer::new(&model)).unwrap();

        let cylindrical = CylindricalTransformer::new(&model);
        assert!(cache.is_stale(&model, &cylindrical));
        assert_eq!(cache.refresh(&model, &cylindrical), Ok(true));
        let first = cache.display_points()[0];
        assert!((first.x - 1.0_f64.cos()).abs() < 1e-12);
    }

    #[test]
    fn diverging_orbit_is_truncated() {
        let model = Lorenz::default();
        let transformer = Transformer::new(&model);
        let mut cache = TrajectoryCache::new(IntegratorSettings {
            step_size: 10.0,
            steps: 200,
            check_finite: true,
        });
        cache.refresh(&model, &transformer).unwrap();
        let n = cache.diverged_at().expect("huge steps should diverge");
        assert_eq!(cache.points().len(), n);
        assert!(cache.points().iter().flatten().all(|v| v.is_finite()));
    }
}
