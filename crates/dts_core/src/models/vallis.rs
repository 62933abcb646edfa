use crate::parameter::{Coordinate, Parameter, ParameterRegistry};
use crate::traits::{DynamicalModel, VectorField};
use nalgebra::Point3;

/// Vallis' model of El Niño ocean-atmosphere coupling.
#[derive(Debug, Clone)]
pub struct Vallis {
    registry: ParameterRegistry,
}

impl Vallis {
    pub fn new(u: f64, a: f64) -> Self {
        let registry = ParameterRegistry::new(
            vec![
                Coordinate::new("x", 1.0, -15.0, 15.0),
                Coordinate::new("y", 1.0, -20.0, 20.0),
                Coordinate::new("z", 1.0, -20.0, 20.0),
            ],
            vec![
                Parameter::new("u", u, 0.0, 20.0, 12.0, 0.1),
                Parameter::new("a", a, 0.0, 1.0, 0.3, 0.01),
            ],
        );
        Self { registry }
    }
}

impl Default for Vallis {
    fn default() -> Self {
        Self::new(12.0, 0.3)
    }
}

impl VectorField for Vallis {
    fn dimension(&self) -> usize {
        self.registry.dimension()
    }

    fn evaluate_into(&self, p: &[f64], out: &mut [f64]) {
        let u = self.registry.value(0);
        let a = self.registry.value(1);

        out[0] = u * p[1] - a * p[0];
        out[1] = p[0] * p[2] - p[1];
        out[2] = 1.0 - p[0] * p[1] - p[2];
    }
}

impl DynamicalModel for Vallis {
    fn name(&self) -> &str {
        "Vallis"
    }

    fn registry(&self) -> &ParameterRegistry {
        &self.registry
    }

    fn registry_mut(&mut self) -> &mut ParameterRegistry {
        &mut self.registry
    }

    fn view_center(&self) -> Point3<f64> {
        Point3::origin()
    }
}
