use crate::error::{EngineError, Result};
use crate::models::baseline::WeeklyNaiveTrend;
use crate::models::method::ForecastMethod;
use crate::models::ridge::RidgeRegression;
use crate::models::smoothing::{HoltLinear, HoltWinters, SimpleExponential};
use indexmap::IndexMap;

//single source of truth mapping stable method keys to implementations
#[derive(Debug, Clone, Default)]
pub struct ModelRegistry {
    methods: IndexMap<String, ForecastMethod>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        ModelRegistry::default()
    }

    //registry with every built-in method
    pub fn standard() -> Self {
        let mut registry = ModelRegistry::new();

        //baselines
        registry.register("BASELINE_OLS", ForecastMethod::direct(WeeklyNaiveTrend::default()));
        registry.register("BASELINE_EXPON", ForecastMethod::direct(SimpleExponential));
        registry.register("BASELINE_HOLT", ForecastMethod::direct(HoltLinear));
        registry.register(
            "BASELINE_HOLT_WINTERS",
            ForecastMethod::direct(HoltWinters::default()),
        );

        //learned
        registry.register("RIDGE_DIRECT", ForecastMethod::direct(RidgeRegression::default()));
        registry.register(
            "RIDGE_RECURSIVE",
            ForecastMethod::recursive(RidgeRegression::default()),
        );

        registry
    }

    //registers (or replaces) a method under `key`
    pub fn register(&mut self, key: impl Into<String>, method: ForecastMethod) -> &mut Self {
        self.methods.insert(key.into(), method);
        self
    }

    pub fn get(&self, key: &str) -> Result<&ForecastMethod> {
        self.methods
            .get(key)
            .ok_or_else(|| EngineError::UnknownModel(key.to_string()))
    }

    //resolves every key up front; the first unknown key fails the whole list
    pub fn resolve_all<'a>(&'a self, keys: &'a [String]) -> Result<Vec<(&'a str, &'a ForecastMethod)>> {
        keys.iter()
            .map(|key| self.get(key).map(|method| (key.as_str(), method)))
            .collect()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.methods.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Flavor;

    #[test]
    fn test_standard_registry() {
        let registry = ModelRegistry::standard();
        assert_eq!(registry.len(), 6);
        assert_eq!(registry.keys().next(), Some("BASELINE_OLS"));
        assert_eq!(
            registry.get("RIDGE_RECURSIVE").unwrap().flavor(),
            Flavor::Recursive
        );
    }

    #[test]
    fn test_unknown_key_fails() {
        let registry = ModelRegistry::standard();
        let err = registry.get("CATBOOST_DIRECT").unwrap_err();
        assert!(matches!(err, EngineError::UnknownModel(ref k) if k == "CATBOOST_DIRECT"));

        let keys = vec!["BASELINE_OLS".to_string(), "NOPE".to_string()];
        assert!(registry.resolve_all(&keys).is_err());
    }
}
