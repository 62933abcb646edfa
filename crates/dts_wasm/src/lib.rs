//! WASM bindings for the dynamics viewer core.
//!
//! The JS renderer creates one [`WasmExperiment`] per displayed model and
//! polls it each frame; heavy state is recomputed only when versions change.

mod experiment;

pub use experiment::WasmExperiment;

use dts_core::ModelFactory;
use wasm_bindgen::prelude::*;

/// Names of the built-in models, sorted.
#[wasm_bindgen]
pub fn model_names() -> js_sys::Array {
    ModelFactory::with_builtin_models()
        .names()
        .into_iter()
        .map(JsValue::from)
        .collect()
}

/// Model selected when the viewer starts.
#[wasm_bindgen]
pub fn default_model() -> String {
    ModelFactory::DEFAULT_MODEL.to_string()
}
