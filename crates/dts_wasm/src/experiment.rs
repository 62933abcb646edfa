//! One displayed model together with its view and cached visual state.

use dts_core::cache::TrajectoryCache;
use dts_core::definition::{ExpressionModel, ModelDefinition};
use dts_core::integrator::{Integrator, IntegratorSettings};
use dts_core::interpolator::{FieldGrid, GridSettings, OutOfGridPolicy, TrilinearInterpolator};
use dts_core::transformer::AxisTransformer;
use dts_core::{DynamicalModel, DynamicsError, Interpolator, ModelFactory, Result as DynamicsResult};
use nalgebra::Point3;
use serde_wasm_bindgen::{from_value, to_value};
use wasm_bindgen::prelude::*;

fn js_error(err: DynamicsError) -> JsValue {
    JsValue::from_str(&err.to_string())
}

#[wasm_bindgen]
pub struct WasmExperiment {
    model: Box<dyn DynamicalModel>,
    axes: [usize; 3],
    trajectory: TrajectoryCache,
    grid_settings: GridSettings,
    grid: Option<FieldGrid>,
}

#[wasm_bindgen]
impl WasmExperiment {
    #[wasm_bindgen(constructor)]
    pub fn new(model_name: &str) -> Result<WasmExperiment, JsValue> {
        console_error_panic_hook::set_once();
        Self::create(&ModelFactory::with_builtin_models(), model_name).map_err(js_error)
    }

    /// Builds an experiment from a JSON model definition.
    pub fn from_definition_json(json: &str) -> Result<WasmExperiment, JsValue> {
        console_error_panic_hook::set_once();
        let model = ModelDefinition::from_json(json)
            .and_then(|definition| ExpressionModel::from_definition(&definition))
            .map_err(|e| JsValue::from_str(&format!("{e:#}")))?;
        Ok(Self::with_model(Box::new(model)))
    }

    pub fn name(&self) -> String {
        self.model.name().to_string()
    }

    pub fn dimension(&self) -> usize {
        self.model.dimension()
    }

    pub fn coordinates(&self) -> Result<JsValue, JsValue> {
        to_value(&self.model.coordinates())
            .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
    }

    pub fn parameters(&self) -> Result<JsValue, JsValue> {
        to_value(&self.model.parameters())
            .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
    }

    pub fn default_point(&self) -> Vec<f64> {
        self.model.default_point()
    }

    pub fn view_center(&self) -> Vec<f64> {
        self.model.view_center().coords.as_slice().to_vec()
    }

    /// Returns the stored (clamped) value.
    pub fn set_parameter(&mut self, name: &str, value: f64) -> Result<f64, JsValue> {
        self.model.set_parameter_value(name, value).map_err(js_error)
    }

    pub fn reset_parameters(&mut self) {
        self.model.reset_parameters();
    }

    pub fn version(&self) -> u64 {
        self.model.version()
    }

    pub fn set_axes(&mut self, axes: Vec<usize>) -> Result<(), JsValue> {
        let axes: [usize; 3] = axes
            .try_into()
            .map_err(|_| JsValue::from_str("Exactly three display axes are required."))?;
        self.select_axes(axes).map_err(js_error)
    }

    pub fn set_seed(&mut self, seed: Vec<f64>) {
        self.trajectory.set_seed(seed);
    }

    pub fn set_integrator_settings(&mut self, settings_val: JsValue) -> Result<(), JsValue> {
        let settings: IntegratorSettings = from_value(settings_val)
            .map_err(|e| JsValue::from_str(&format!("Invalid integrator settings: {}", e)))?;
        self.trajectory.set_settings(settings);
        Ok(())
    }

    pub fn set_grid_resolution(&mut self, nx: usize, ny: usize, nz: usize) {
        self.grid_settings.resolution = [nx, ny, nz];
        self.grid = None;
    }

    /// One of `clamp`, `extrapolate` or `reject`.
    pub fn set_out_of_grid_policy(&mut self, policy: &str) -> Result<(), JsValue> {
        self.grid_settings.policy = parse_policy(policy)
            .ok_or_else(|| JsValue::from_str(&format!("Unknown out-of-grid policy: {policy}")))?;
        Ok(())
    }

    /// Advances `state` by one RK4 step of size `dt`.
    pub fn step(&self, state: Vec<f64>, dt: f64) -> Result<Vec<f64>, JsValue> {
        self.step_state(&state, dt).map_err(js_error)
    }

    /// Display-space trajectory as a flat `[x0, y0, z0, x1, ...]` buffer.
    pub fn trajectory(&mut self) -> Result<Vec<f64>, JsValue> {
        self.display_trajectory().map_err(js_error)
    }

    pub fn interpolate(&mut self, x: f64, y: f64, z: f64) -> Result<Vec<f64>, JsValue> {
        self.interpolate_at(Point3::new(x, y, z)).map_err(js_error)
    }
}

impl WasmExperiment {
    pub(crate) fn create(factory: &ModelFactory, model_name: &str) -> DynamicsResult<Self> {
        Ok(Self::with_model(factory.create(model_name)?))
    }

    pub(crate) fn with_model(model: Box<dyn DynamicalModel>) -> Self {
        Self {
            model,
            axes: [0, 1, 2],
            trajectory: TrajectoryCache::default(),
            grid_settings: GridSettings::default(),
            grid: None,
        }
    }

    pub(crate) fn select_axes(&mut self, axes: [usize; 3]) -> DynamicsResult<()> {
        AxisTransformer::new(self.model.as_ref()).set_axes(axes)?;
        if axes != self.axes {
            self.axes = axes;
            self.trajectory.invalidate();
        }
        Ok(())
    }

    pub(crate) fn step_state(&self, state: &[f64], dt: f64) -> DynamicsResult<Vec<f64>> {
        Integrator::new(self.model.as_ref(), dt)?.try_step(state)
    }

    pub(crate) fn display_trajectory(&mut self) -> DynamicsResult<Vec<f64>> {
        let mut transformer = AxisTransformer::new(self.model.as_ref());
        transformer.set_axes(self.axes)?;
        self.trajectory.refresh(self.model.as_ref(), &transformer)?;
        Ok(self
            .trajectory
            .display_points()
            .iter()
            .flat_map(|p| [p.x, p.y, p.z])
            .collect())
    }

    pub(crate) fn interpolate_at(&mut self, p: Point3<f64>) -> DynamicsResult<Vec<f64>> {
        let grid = match self.grid.take() {
            Some(mut grid) if grid.counts() == self.grid_settings.resolution => {
                grid.refresh(self.model.as_ref())?;
                grid
            }
            _ => FieldGrid::sample(self.model.as_ref(), &self.grid_settings)?,
        };
        let grid = self.grid.insert(grid);
        TrilinearInterpolator::with_policy(grid, self.grid_settings.policy).interpolate(&p)
    }
}

fn parse_policy(policy: &str) -> Option<OutOfGridPolicy> {
    match policy {
        "clamp" => Some(OutOfGridPolicy::Clamp),
        "extrapolate" => Some(OutOfGridPolicy::Extrapolate),
        "reject" => Some(OutOfGridPolicy::Reject),
        _ => None,
    }
}
