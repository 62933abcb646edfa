use crate::parameter::{Coordinate, Parameter, ParameterRegistry};
use crate::traits::{DynamicalModel, VectorField};

/// The Lorenz convection model.
#[derive(Debug, Clone)]
pub struct Lorenz {
    registry: ParameterRegistry,
}

impl Lorenz {
    pub fn new(sigma: f64, rho: f64, beta: f64) -> Self {
        let registry = ParameterRegistry::new(
            vec![
                Coordinate::new("x", 1.0, -25.0, 25.0),
                Coordinate::new("y", 1.0, -30.0, 30.0),
                Coordinate::new("z", 1.0, 0.0, 55.0),
            ],
            vec![
                Parameter::new("sigma", sigma, 0.0, 30.0, 10.0, 0.1),
                Parameter::new("rho", rho, 0.0, 100.0, 28.0, 0.1),
                Parameter::new("beta", beta, 0.0, 10.0, 8.0 / 3.0, 0.01),
            ],
        );
        Self { registry }
    }
}

impl Default for Lorenz {
    fn default() -> Self {
        Self::new(10.0, 28.0, 8.0 / 3.0)
    }
}

impl VectorField for Lorenz {
    fn dimension(&self) -> usize {
        self.registry.dimension()
    }

    fn evaluate_into(&self, p: &[f64], out: &mut [f64]) {
        let sigma = self.registry.value(0);
        let rho = self.registry.value(1);
        let beta = self.registry.value(2);

        out[0] = sigma * (p[1] - p[0]);
        out[1] = p[0] * (rho - p[2]) - p[1];
        out[2] = p[0] * p[1] - beta * p[2];
    }
}

impl DynamicalModel for Lorenz {
    fn name(&self) -> &str {
        "Lorenz"
    }

    fn registry(&self) -> &ParameterRegistry {
        &self.registry
    }

    fn registry_mut(&mut self) -> &mut ParameterRegistry {
        &mut self.registry
    }
}

#[cfg(test)]
mod tests {
    use super::Lorenz;
    use crate::traits::{DynamicalModel, VectorField};

    #[test]
    fn origin_is_an_equilibrium() {
        let model = Lorenz::default();
        assert_eq!(model.evaluate(&[0.0, 0.0, 0.0]), vec![0.0, 0.0, 0.0]);
    }

    #[test]
    fn derivative_tracks_parameters() {
        let mut model = Lorenz::default();
        let p = [1.0, 2.0, 3.0];
        let out = model.evaluate(&p);
        assert_eq!(out[0], 10.0);
        assert_eq!(out[1], 23.0);
        assert!((out[2] + 6.0).abs() < 1e-12);

        model.set_parameter_value("sigma", 5.0).unwrap();
        assert_eq!(model.evaluate(&p)[0], 5.0);
        assert_eq!(model.version(), 1);
    }
}
