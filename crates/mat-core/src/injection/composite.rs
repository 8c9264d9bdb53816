//! `CompositeInjector`: aplica una secuencia de `ParamInjector` de forma
//! determinista y devuelve los params resultantes.

use crate::model::ExecutionContext;
use serde_json::Value;

use super::merge::merge_json;
use super::param_injector::ParamInjector;

/// Aplica una serie de inyectores en orden. El orden de merge es fijo:
/// base -> injectors (en orden).
#[derive(Debug, Default)]
pub struct CompositeInjector {
    pub injectors: Vec<Box<dyn ParamInjector>>,
}

impl CompositeInjector {
    pub fn new() -> Self {
        Self { injectors: vec![] }
    }

    pub fn with_injectors(injectors: Vec<Box<dyn ParamInjector>>) -> Self {
        Self { injectors }
    }

    /// Aplica los inyectores sobre `base` y devuelve los params resultantes.
    pub fn apply(&self, base: &Value, ctx: &ExecutionContext) -> Value {
        Self::apply_injectors(&self.injectors, base, ctx)
    }

    /// Versión estática que aplica un slice de inyectores sin tomar
    /// ownership (útil para callers que los mantienen en el runner).
    pub fn apply_injectors(
        injectors: &[Box<dyn ParamInjector>],
        base: &Value,
        ctx: &ExecutionContext,
    ) -> Value {
        let mut accumulated = base.clone();
        for injector in injectors.iter() {
            let v = injector.inject(&accumulated, ctx);
            accumulated = merge_json(&accumulated, &v);
        }
        accumulated
    }
}
