use crate::error::{first_non_finite, DynamicsError, Result};
use crate::traits::{check_dimension, DynamicalModel, VectorField};
use serde::{Deserialize, Serialize};
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntegratorSettings {
    pub step_size: f64,
    /// Number of steps in a computed trajectory.
    pub steps: usize,
    /// Stop trajectories at the first non-finite point.
    pub check_finite: bool,
}

impl Default for IntegratorSettings {
    fn default() -> Self {
        Self {
            step_size: 0.01,
            steps: 5000,
            check_finite: true,
        }
    }
}

/// Classic fixed-step Runge-Kutta 4th order integrator.
///
/// Borrows the model it steps, so it cannot outlive it, and the model's
/// parameters cannot change while an integrator is alive. Build a new one
/// after each parameter change; construction is free.
#[derive(Debug)]
pub struct Integrator<'a, M: ?Sized> {
    model: &'a M,
    step_size: f64,
}

impl<M: ?Sized> Clone for Integrator<'_, M> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<M: ?Sized> Copy for Integrator<'_, M> {}

impl<'a, M: VectorField + ?Sized> Integrator<'a, M> {
    pub fn new(model: &'a M, step_size: f64) -> Result<Self> {
        if !step_size.is_finite() || step_size <= 0.0 {
            return Err(DynamicsError::InvalidStepSize(step_size));
        }
        Ok(Self { model, step_size })
    }

    pub fn from_settings(model: &'a M, settings: &IntegratorSettings) -> Result<Self> {
        Self::new(model, settings.step_size)
    }

    pub fn model(&self) -> &'a M {
        self.model
    }

    pub fn step_size(&self) -> f64 {
        self.step_size
    }

    /// Advances `p` by one step.
    ///
    /// Non-finite values are not detected here; see [`Integrator::try_step`].
    pub fn step(&self, p: &[f64]) -> Vec<f64> {
        let h = self.step_size;
        let f = self.model;

        // k1 = f(p)
        let k1 = f.evaluate(p);

        // k2 = f(p + h/2 k1)
        let k2 = f.evaluate(&offset(p, &k1, 0.5 * h));

        // k3 = f(p + h/2 k2)
        let k3 = f.evaluate(&offset(p, &k2, 0.5 * h));

        // k4 = f(p + h k3)
        let k4 = f.evaluate(&offset(p, &k3, h));

        // p_next = p + h/6 (k1 + 2k2 + 2k3 + k4)
        let sixth = h / 6.0;
        p.iter()
            .enumerate()
            .map(|(i, &x)| x + sixth * (k1[i] + 2.0 * k2[i] + 2.0 * k3[i] + k4[i]))
            .collect()
    }

    /// Like [`Integrator::step`], but checks the input length and rejects
    /// non-finite results.
    pub fn try_step(&self, p: &[f64]) -> Result<Vec<f64>> {
        check_dimension(self.model.dimension(), p.len())?;
        let next = self.step(p);
        if let Some((component, value)) = first_non_finite(&next) {
            return Err(DynamicsError::NumericalDivergence {
                step: 1,
                component,
                value,
            });
        }
        Ok(next)
    }

    /// Endless sequence of points starting at `start` itself.
    pub fn orbit(&self, start: &[f64]) -> Orbit<'a, M> {
        Orbit {
            integrator: *self,
            start: start.to_vec(),
            last: None,
        }
    }

    /// Returns `start` followed by `steps` successive points.
    ///
    /// With `check_finite`, integration stops with
    /// [`DynamicsError::NumericalDivergence`] at the first non-finite point.
    pub fn trajectory(&self, start: &[f64], steps: usize, check_finite: bool) -> Result<Vec<Vec<f64>>> {
        check_dimension(self.model.dimension(), start.len())?;

        let mut points = Vec::with_capacity(steps + 1);
        for (n, point) in self.orbit(start).take(steps + 1).enumerate() {
            if check_finite {
                if let Some((component, value)) = first_non_finite(&point) {
                    warn!(step = n, component, value, "trajectory diverged");
                    return Err(DynamicsError::NumericalDivergence {
                        step: n,
                        component,
                        value,
                    });
                }
            }
            points.push(point);
        }
        Ok(points)
    }
}

/// Iterator over successive RK4 steps. See [`Integrator::orbit`].
#[derive(Debug)]
pub struct Orbit<'a, M: ?Sized> {
    integrator: Integrator<'a, M>,
    start: Vec<f64>,
    last: Option<Vec<f64>>,
}

impl<M: VectorField + ?Sized> Iterator for Orbit<'_, M> {
    type Item = Vec<f64>;

    fn next(&mut self) -> Option<Vec<f64>> {
        let next = match &self.last {
            None => self.start.clone(),
            Some(p) => self.integrator.step(p),
        };
        self.last = Some(next.clone());
        Some(next)
    }
}

impl<M: DynamicalModel + ?Sized> Integrator<'_, M> {
    /// Version of the bound model, for invalidating cached trajectories.
    pub fn model_version(&self) -> u64 {
        self.model.version()
    }
}

fn offset(p: &[f64], k: &[f64], scale: f64) -> Vec<f64> {
    p.iter().zip(k).map(|(x, dx)| x + scale * dx).collect()
}

#[cfg(test)]
mod tests {
    use super::{Integrator, IntegratorSettings};
    use crate::error::DynamicsError;
    use crate::models::{Lorenz, Rossler};
    use crate::parameter::{Coordinate, ParameterRegistry};
    use crate::traits::{DynamicalModel, VectorField};

    /// dx/dt = -x
    struct Decay;

    impl VectorField for Decay {
        fn dimension(&self) -> usize {
            1
        }

        fn evaluate_into(&self, x: &[f64], out: &mut [f64]) {
            out[0] = -x[0];
        }
    }

    /// dx/dt = x^2, blows up at t = 1 from x = 1.
    struct Blowup {
        registry: ParameterRegistry,
    }

    impl VectorField for Blowup {
        fn dimension(&self) -> usize {
            1
        }

        fn evaluate_into(&self, x: &[f64], out: &mut [f64]) {
            out[0] = x[0] * x[0];
        }
    }

    impl DynamicalModel for Blowup {
        fn name(&self) -> &str {
            "Blowup"
        }

        fn registry(&self) -> &ParameterRegistry {
            &self.registry
        }

        fn registry_mut(&mut self) -> &mut ParameterRegistry {
            &mut self.registry
        }
    }

    #[test]
    fn rejects_invalid_step_sizes() {
        for h in [0.0, -0.1, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                Integrator::new(&Decay, h),
                Err(DynamicsError::InvalidStepSize(_))
            ));
        }
    }

    #[test]
    fn rk4_tracks_exponential_decay() {
        let integrator = Integrator::new(&Decay, 0.01).unwrap();
        let mut x = vec![1.0];
        for _ in 0..100 {
            x = integrator.step(&x);
        }
        let expected = (-1.0_f64).exp();
        assert!(((x[0] - expected) / expected).abs() < 1e-4);
    }

    #[test]
    fn single_step_matches_taylor_series() {
        let h = 0.1_f64;
        let integrator = Integrator::new(&Decay, h).unwrap();
        let next = integrator.step(&[1.0]);
        let taylor = 1.0 - h + h * h / 2.0 - h.powi(3) / 6.0 + h.powi(4) / 24.0;
        assert!((next[0] - taylor).abs() < 1e-14);
    }

    #[test]
    fn step_is_deterministic() {
        let model = Lorenz::default();
        let integrator = Integrator::new(&model, 0.01).unwrap();
        let p = [1.0, 1.0, 1.0];
        let a = integrator.step(&p);
        let b = integrator.step(&p);
        assert_eq!(
            a.iter().map(|v| v.to_bits()).collect::<Vec<_>>(),
            b.iter().map(|v| v.to_bits()).collect::<Vec<_>>()
        );
    }

    #[test]
    fn time_component_advances_by_step_size() {
        let model = Rossler::default();
        let integrator = Integrator::new(&model, 0.01).unwrap();
        let points = integrator.trajectory(&model.default_point(), 100, true).unwrap();
        assert_eq!(points.len(), 101);
        assert!((points[100][3] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn model_version_follows_parameter_changes() {
        let mut model = Lorenz::default();
        assert_eq!(Integrator::new(&model, 0.01).unwrap().model_version(), 0);
        model.set_parameter_value("rho", 20.0).unwrap();
        let integrator = Integrator::from_settings(&model, &IntegratorSettings::default()).unwrap();
        assert_eq!(integrator.model_version(), 1);
    }

    #[test]
    fn trajectory_reports_divergence() {
        let model = Blowup {
            registry: ParameterRegistry::new(vec![Coordinate::new("x", 1.0, 0.0, 10.0)], vec![]),
        };
        let integrator = Integrator::new(&model, 0.5).unwrap();
        match integrator.trajectory(&[1.0], 50, true) {
            Err(DynamicsError::NumericalDivergence { step, component, .. }) => {
                assert!(step > 1);
                assert_eq!(component, 0);
            }
            other => panic!("expected divergence, got {other:?}"),
        }

        // Without the check, non-finite values propagate silently.
        let points = integrator.trajectory(&[1.0], 50, false).unwrap();
        assert!(!points[50][0].is_finite());
        assert!(integrator.try_step(&points[50]).is_err());
    }

    #[test]
    fn orbit_matches_repeated_steps() {
        let model = Lorenz::default();
        let integrator = Integrator::new(&model, 0.01).unwrap();
        let start = model.default_point();
        let orbit: Vec<Vec<f64>> = integrator.orbit(&start).take(3).collect();
        let one = integrator.step(&start);
        let two = integrator.step(&one);
        assert_eq!(orbit, vec![start, one, two]);
    }

    #[test]
    fn trajectory_checks_start_dimension() {
        let model = Lorenz::default();
        let integrator = Integrator::new(&model, 0.01).unwrap();
        assert_eq!(
            integrator.trajectory(&[1.0, 2.0], 10, true),
            Err(DynamicsError::DimensionMismatch {
                expected: 3,
                got: 2
            })
        );
    }
}
