//! Built-in dynamical systems.
//!
//! Each variant owns its [`ParameterRegistry`](crate::parameter::ParameterRegistry)
//! and supplies a closed-form vector field. New variants are added by
//! registering a constructor with [`ModelFactory`](crate::factory::ModelFactory);
//! nothing here needs to change.

mod lorenz;
mod rossler;
mod vallis;

pub use lorenz::Lorenz;
pub use rossler::Rossler;
pub use vallis::Vallis;
