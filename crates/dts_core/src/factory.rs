use crate::definition::{boxed_model, ModelDefinition};
use crate::error::{DynamicsError, Result};
use crate::models::{Lorenz, Rossler, Vallis};
use crate::traits::DynamicalModel;
use std::collections::BTreeMap;
use std::fmt;
use tracing::{info, warn};

type Constructor = Box<dyn Fn() -> Result<Box<dyn DynamicalModel>> + Send + Sync>;

/// Maps model names to constructors.
///
/// The application owns one of these; there is no global registry. Names are
/// kept in a `BTreeMap`, so [`ModelFactory::names`] is already sorted.
#[derive(Default)]
pub struct ModelFactory {
    constructors: BTreeMap<String, Constructor>,
}

impl ModelFactory {
    /// Model selected when the application starts.
    pub const DEFAULT_MODEL: &'static str = "Lorenz";

    pub fn new() -> Self {
        Self::default()
    }

    /// A factory preloaded with the compiled-in models.
    pub fn with_builtin_models() -> Self {
        let mut factory = Self::new();
        factory.register("Lorenz", || Box::new(Lorenz::default()));
        factory.register("Rossler", || Box::new(Rossler::default()));
        factory.register("Vallis", || Box::new(Vallis::default()));
        factory
    }

    /// Registers a constructor, replacing any previous one with the same name.
    pub fn register<F>(&mut self, name: &str, constructor: F)
    where
        F: Fn() -> Box<dyn DynamicalModel> + Send + Sync + 'static,
    {
        self.insert(name, Box::new(move || Ok(constructor())));
    }

    /// Registers a declarative model after checking that it compiles.
    pub fn register_definition(&mut self, definition: ModelDefinition) -> Result<()> {
        boxed_model(&definition)?;
        let name = definition.name.clone();
        self.insert(&name, Box::new(move || boxed_model(&definition)));
        Ok(())
    }

    fn insert(&mut self, name: &str, constructor: Constructor) {
        if self.constructors.insert(name.to_string(), constructor).is_some() {
            warn!(model = name, "replacing previously registered model");
        } else {
            info!(model = name, "registered model");
        }
    }

    pub fn create(&self, name: &str) -> Result<Box<dyn DynamicalModel>> {
        let constructor = self
            .constructors
            .get(name)
            .ok_or_else(|| DynamicsError::UnknownModel(name.to_string()))?;
        constructor()
    }

    pub fn create_default(&self) -> Result<Box<dyn DynamicalModel>> {
        self.create(Self::DEFAULT_MODEL)
    }

    /// Registered names in lexicographic order.
    pub fn names(&self) -> Vec<String> {
        self.constructors.keys().cloned().collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.constructors.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.constructors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constructors.is_empty()
    }
}

impl fmt::Debug for ModelFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelFactory")
            .field("models", &self.names())
            .finish()
    }
}
