//! Models described as data rather than code.
//!
//! A [`ModelDefinition`] lists coordinates, parameters and one equation per
//! coordinate. [`ExpressionModel`] compiles the equations once and evaluates
//! them with the bytecode [`VM`].

use crate::equation_engine::{Bytecode, Compiler, VM};
use crate::error::Result as DynamicsResult;
use crate::parameter::{Coordinate, Parameter, ParameterRegistry};
use crate::traits::{range_center, DynamicalModel, VectorField};
use anyhow::{bail, Context, Result};
use nalgebra::Point3;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoordinateDefinition {
    pub name: String,
    #[serde(default)]
    pub default: f64,
    /// Missing bounds mean the axis is unbounded on that side.
    #[serde(default)]
    pub min: Option<f64>,
    #[serde(default)]
    pub max: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterDefinition {
    pub name: String,
    pub default: f64,
    pub min: f64,
    pub max: f64,
    #[serde(default = "default_parameter_step")]
    pub step: f64,
}

fn default_parameter_step() -> f64 {
    0.01
}

/// Declarative description of a dynamical model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelDefinition {
    pub name: String,
    pub coordinates: Vec<CoordinateDefinition>,
    #[serde(default)]
    pub parameters: Vec<ParameterDefinition>,
    /// `equations[i]` is the right-hand side for `coordinates[i]`.
    pub equations: Vec<String>,
    #[serde(default)]
    pub center: Option<[f64; 3]>,
}

impl ModelDefinition {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Failed to parse model definition")
    }

    /// Reads either a single definition or an array of definitions.
    pub fn list_from_json(json: &str) -> Result<Vec<Self>> {
        let value: serde_json::Value =
            serde_json::from_str(json).context("Failed to parse model definitions")?;
        if value.is_array() {
            serde_json::from_value(value).context("Failed to parse model definition list")
        } else {
            Ok(vec![serde_json::from_value(value)
                .context("Failed to parse model definition")?])
        }
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Vec<Self>> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::list_from_json(&json).with_context(|| format!("In {}", path.display()))
    }

    fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            bail!("Model name must not be empty.");
        }
        if self.coordinates.len() < 3 {
            bail!(
                "Model {} needs at least 3 coordinates, got {}.",
                self.name,
                self.coordinates.len()
            );
        }
        if self.equations.len() != self.coordinates.len() {
            bail!(
                "Model {} has {} coordinates but {} equations.",
                self.name,
                self.coordinates.len(),
                self.equations.len()
            );
        }
        let mut names = HashSet::new();
        let symbols = self
            .coordinates
            .iter()
            .map(|c| &c.name)
            .chain(self.parameters.iter().map(|p| &p.name));
        for name in symbols {
            if !names.insert(name.as_str()) {
                bail!(
                    "Model {} declares {} more than once; coordinate and parameter names must be unique.",
                    self.name,
                    name
                );
            }
        }
        for param in &self.parameters {
            if !(param.min <= param.default && param.default <= param.max) {
                bail!(
                    "Parameter {} default {} lies outside [{}, {}].",
                    param.name,
                    param.default,
                    param.min,
                    param.max
                );
            }
        }
        Ok(())
    }
}

/// A model whose field is evaluated from compiled expressions.
#[derive(Debug, Clone)]
pub struct ExpressionModel {
    name: String,
    registry: ParameterRegistry,
    equations: Vec<Bytecode>,
    center: Option<Point3<f64>>,
}

impl ExpressionModel {
    pub fn from_definition(definition: &ModelDefinition) -> Result<Self> {
        definition.validate()?;

        let var_names: Vec<String> = definition.coordinates.iter().map(|c| c.name.clone()).collect();
        let param_names: Vec<String> = definition.parameters.iter().map(|p| p.name.clone()).collect();
        let compiler = Compiler::new(&var_names, &param_names);
        let equations = definition
            .equations
            .iter()
            .zip(&var_names)
            .map(|(source, var)| {
                compiler
                    .compile_str(source)
                    .with_context(|| format!("Equation for d{var}/dt in {}", definition.name))
            })
            .collect::<Result<Vec<_>>>()?;

        let coordinates = definition
            .coordinates
            .iter()
            .map(|c| {
                Coordinate::new(
                    &c.name,
                    c.default,
                    c.min.unwrap_or(f64::NEG_INFINITY),
                    c.max.unwrap_or(f64::INFINITY),
                )
            })
            .collect();
        let parameters = definition
            .parameters
            .iter()
            .map(|p| Parameter::new(&p.name, p.default, p.min, p.max, p.default, p.step))
            .collect();

        Ok(Self {
            name: definition.name.clone(),
            registry: ParameterRegistry::new(coordinates, parameters),
            equations,
            center: definition.center.map(|[x, y, z]| Point3::new(x, y, z)),
        })
    }
}

impl VectorField for ExpressionModel {
    fn dimension(&self) -> usize {
        self.registry.dimension()
    }

    fn evaluate_into(&self, x: &[f64], out: &mut [f64]) {
        let params = self.registry.values();
        let mut stack = Vec::with_capacity(16);
        for (slot, eq) in out.iter_mut().zip(&self.equations) {
            *slot = VM::execute(eq, x, params, &mut stack);
        }
    }
}

impl DynamicalModel for ExpressionModel {
    fn name(&self) -> &str {
        &self.name
    }

    fn registry(&self) -> &ParameterRegistry {
        &self.registry
    }

    fn registry_mut(&mut self) -> &mut ParameterRegistry {
        &mut self.registry
    }

    fn view_center(&self) -> Point3<f64> {
        self.center.unwrap_or_else(|| range_center(self.coordinates()))
    }
}

/// Shorthand used by the factory: compile a definition into a boxed model.
pub(crate) fn boxed_model(definition: &ModelDefinition) -> DynamicsResult<Box<dyn DynamicalModel>> {
    ExpressionModel::from_definition(definition)
        .map(|model| Box::new(model) as Box<dyn DynamicalModel>)
        .map_err(|err| crate::error::DynamicsError::Expression(format!("{err:#}")))
}

#[cfg(test)]
mod tests {
    use super::{ExpressionModel, ModelDefinition};
    use crate::models::Rossler;
    use crate::traits::{DynamicalModel, VectorField};

    const ROSSLER_JSON: &str = r#"{
        "name": "Rossler (declarative)",
        "coordinates": [
            {"name": "x", "default": 5, "min": -15, "max": 15},
            {"name": "y", "default": 5, "min": -15, "max": 15},
            {"name": "z", "default": 5, "min": -1, "max": 30},
            {"name": "t", "default": 0, "min": 0}
        ],
        "parameters": [
            {"name": "a", "default": 0.2, "min": -0.5, "max": 0.5},
            {"name": "b", "default": 0.2, "min": -0.5, "max": 0.5},
            {"name": "c", "default": 5.7, "min": 0, "max": 10}
        ],
        "equations": ["-y - z", "x + a*y", "b + z*(x - c)", "1"]
    }"#;

    fn assert_err_contains<T: std::fmt::Debug>(result: anyhow::Result<T>, needle: &str) {
        let err = result.expect_err("expected error");
        let message = format!("{err:#}");
        assert!(
            message.contains(needle),
            "expected error to contain \"{needle}\", got \"{message}\""
        );
    }

    #[test]
    fn declarative_rossler_matches_builtin() {
        let definition = ModelDefinition::from_json(ROSSLER_JSON).expect("valid json");
        let model = ExpressionModel::from_definition(&definition).expect("should compile");
        let builtin = Rossler::default();

        assert_eq!(model.dimension(), 4);
        assert_eq!(model.default_point(), builtin.default_point());
        assert_eq!(model.coordinates()[3].max_value, f64::INFINITY);
        for point in [[1.0, 1.0, 1.0, 0.0], [-3.0, 2.5, 7.0, 1.0]] {
            let a = model.evaluate(&point);
            let b = builtin.evaluate(&point);
            for (x, y) in a.iter().zip(&b) {
                assert!((x - y).abs() < 1e-12, "{a:?} vs {b:?}");
            }
        }
    }

    #[test]
    fn parameter_changes_flow_into_equations() {
        let definition = ModelDefinition::from_json(ROSSLER_JSON).unwrap();
        let mut model = ExpressionModel::from_definition(&definition).unwrap();
        model.set_parameter_value("a", 0.0).unwrap();
        assert_eq!(model.evaluate(&[1.0, 1.0, 1.0, 0.0])[1], 1.0);
        assert_eq!(model.version(), 1);
    }

    #[test]
    fn rejects_inconsistent_definitions() {
        let mut definition = ModelDefinition::from_json(ROSSLER_JSON).unwrap();
        definition.equations.pop();
        assert_err_contains(ExpressionModel::from_definition(&definition), "3 equations");

        let mut definition = ModelDefinition::from_json(ROSSLER_JSON).unwrap();
        definition.equations[1] = "x + q*y".to_string();
        assert_err_contains(
            ExpressionModel::from_definition(&definition),
            "Unknown variable or parameter: q",
        );

        let mut definition = ModelDefinition::from_json(ROSSLER_JSON).unwrap();
        definition.parameters[0].default = 3.0;
        assert_err_contains(ExpressionModel::from_definition(&definition), "outside");

        let mut definition = ModelDefinition::from_json(ROSSLER_JSON).unwrap();
        definition.parameters[1].name = "a".to_string();
        assert_err_contains(
            ExpressionModel::from_definition(&definition),
            "declares a more than once",
        );

        let mut definition = ModelDefinition::from_json(ROSSLER_JSON).unwrap();
        definition.coordinates[3].name = "x".to_string();
        assert_err_contains(
            ExpressionModel::from_definition(&definition),
            "declares x more than once",
        );

        // A parameter may not hide behind a coordinate of the same name.
        let mut definition = ModelDefinition::from_json(ROSSLER_JSON).unwrap();
        definition.parameters[2].name = "z".to_string();
        assert_err_contains(
            ExpressionModel::from_definition(&definition),
            "declares z more than once",
        );
    }

    #[test]
    fn list_from_json_accepts_single_or_array() {
        let single = ModelDefinition::list_from_json(ROSSLER_JSON).unwrap();
        assert_eq!(single.len(), 1);
        let array = ModelDefinition::list_from_json(&format!("[{ROSSLER_JSON}, {ROSSLER_JSON}]"))
            .unwrap();
        assert_eq!(array.len(), 2);
        assert_err_contains(ModelDefinition::list_from_json("{"), "Failed to parse");
    }

    #[test]
    fn view_center_prefers_explicit_center() {
        let mut definition = ModelDefinition::from_json(ROSSLER_JSON).unwrap();
        let model = ExpressionModel::from_definition(&definition).unwrap();
        assert_eq!(model.view_center(), nalgebra::Point3::new(0.0, 0.0, 14.5));

        definition.center = Some([1.0, 2.0, 3.0]);
        let model = ExpressionModel::from_definition(&definition).unwrap();
        assert_eq!(model.view_center(), nalgebra::Point3::new(1.0, 2.0, 3.0));
    }
}
