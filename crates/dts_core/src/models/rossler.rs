use crate::parameter::{Coordinate, Parameter, ParameterRegistry};
use crate::traits::{DynamicalModel, VectorField};

/// The Rössler attractor, augmented with time as a fourth coordinate.
///
/// The time component of the field is fixed at 1 so that `t` integrates
/// alongside the autonomous state.
#[derive(Debug, Clone)]
pub struct Rossler {
    registry: ParameterRegistry,
}

impl Rossler {
    pub fn new(a: f64, b: f64, c: f64) -> Self {
        let registry = ParameterRegistry::new(
            vec![
                Coordinate::new("x", 5.0, -15.0, 15.0),
                Coordinate::new("y", 5.0, -15.0, 15.0),
                Coordinate::new("z", 5.0, -1.0, 30.0),
                Coordinate::new("t", 0.0, 0.0, f64::INFINITY),
            ],
            vec![
                Parameter::new("a", a, -0.5, 0.5, 0.2, 0.01),
                Parameter::new("b", b, -0.5, 0.5, 0.2, 0.01),
                Parameter::new("c", c, 0.0, 10.0, 5.7, 0.01),
            ],
        );
        Self { registry }
    }
}

impl Default for Rossler {
    fn default() -> Self {
        Self::new(0.2, 0.2, 5.7)
    }
}

impl VectorField for Rossler {
    fn dimension(&self) -> usize {
        self.registry.dimension()
    }

    fn evaluate_into(&self, p: &[f64], out: &mut [f64]) {
        let a = self.registry.value(0);
        let b = self.registry.value(1);
        let c = self.registry.value(2);

        out[0] = -p[1] - p[2];
        out[1] = p[0] + a * p[1];
        out[2] = b + p[2] * (p[0] - c);
        out[3] = 1.0;
    }
}

impl DynamicalModel for Rossler {
    fn name(&self) -> &str {
        "Rossler"
    }

    fn registry(&self) -> &ParameterRegistry {
        &self.registry
    }

    fn registry_mut(&mut self) -> &mut ParameterRegistry {
        &mut self.registry
    }
}
