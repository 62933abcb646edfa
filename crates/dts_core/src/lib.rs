pub mod cache;
pub mod definition;
pub mod equation_engine;
pub mod error;
pub mod factory;
pub mod integrator;
pub mod interpolator;
pub mod models;
pub mod parameter;
/// The `dts_core` crate is the numerical engine behind the 3D dynamics viewer.
/// Everything is `f64`; phase-space points are plain slices whose length is the
/// model dimension.
///
/// Key components:
/// - **Traits**: `VectorField`, `DynamicalModel` (parameterized fields with a version counter),
///   `Transform` (phase space to display space), `Interpolator`.
/// - **Models**: built-in Lorenz, Rössler and Vallis systems, plus models compiled from
///   JSON definitions by the equation engine.
/// - **Integrator**: fixed-step RK4 and trajectory generation.
/// - **Interpolator**: trilinear interpolation of a sampled vector field.
/// - **Cache**: trajectories recomputed only when a model or transformer version changes.
pub mod traits;
pub mod transformer;

pub use error::{DynamicsError, Result};
pub use factory::ModelFactory;
pub use traits::{DynamicalModel, Interpolator, Transform, VectorField};
