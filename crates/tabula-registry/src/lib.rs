//! Dataset registry: leaf collection providers looked up by name

mod loader;
mod memory;

pub use loader::{load_dir, load_file};
pub use memory::MemDataset;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tabula_algebra::{AlgebraError, Catalog, Collection};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Dataset not found: {0}")]
    UnknownDataset(String),

    #[error("Section not found: {dataset}.{section}")]
    UnknownSection { dataset: String, section: String },

    #[error("Failed to read dataset file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid dataset {dataset}: {reason}")]
    Invalid { dataset: String, reason: String },

    #[error(transparent)]
    Algebra(#[from] AlgebraError),
}

/// A named provider of collections, one per section.
pub trait Dataset: fmt::Debug + Send + Sync {
    fn name(&self) -> &str;

    fn title(&self) -> Option<&str> {
        None
    }

    fn sections(&self) -> Vec<String>;

    fn collection(&self, section: &str) -> Result<Arc<dyn Collection>, RegistryError>;
}

#[derive(Debug, Default, Clone)]
pub struct DatasetRegistry {
    datasets: BTreeMap<String, Arc<dyn Dataset>>,
}

impl DatasetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a dataset, replacing any previous one with the same name.
    pub fn register(&mut self, dataset: Arc<dyn Dataset>) {
        self.datasets.insert(dataset.name().to_string(), dataset);
    }

    pub fn get(&self, name: &str) -> Result<&Arc<dyn Dataset>, RegistryError> {
        self.datasets
            .get(name)
            .ok_or_else(|| RegistryError::UnknownDataset(name.to_string()))
    }

    pub fn datasets(&self) -> impl Iterator<Item = &Arc<dyn Dataset>> {
        self.datasets.values()
    }

    pub fn len(&self) -> usize {
        self.datasets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.datasets.is_empty()
    }
}

impl Catalog for DatasetRegistry {
    fn has_dataset(&self, name: &str) -> bool {
        self.datasets.contains_key(name)
    }

    fn collection(&self, dataset: &str, section: &str) -> tabula_algebra::Result<Arc<dyn Collection>> {
        self.get(dataset)
            .and_then(|d| d.collection(section))
            .map_err(|e| match e {
                RegistryError::Algebra(inner) => inner,
                RegistryError::UnknownDataset(_) | RegistryError::UnknownSection { .. } => {
                    AlgebraError::UnknownCollection(format!("{}.{}", dataset, section))
                }
                other => AlgebraError::Provider(other.to_string()),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tabula_algebra::MemCollection;

    fn registry() -> DatasetRegistry {
        let cities = MemCollection::dict("geo.cities", vec![("par", json!({"name": "Paris"}))]).unwrap();
        let mut registry = DatasetRegistry::new();
        registry.register(Arc::new(MemDataset::new("geo").with_section("cities", cities)));
        registry
    }

    #[test]
    fn test_catalog_lookup() {
        let registry = registry();
        assert!(registry.has_dataset("geo"));
        assert!(!registry.has_dataset("nope"));

        let c = registry.collection("geo", "cities").unwrap();
        assert_eq!(c.id(), "geo.cities");
    }

    #[test]
    fn test_unknown_section() {
        let err = registry().collection("geo", "rivers").unwrap_err();
        assert_eq!(err, AlgebraError::UnknownCollection("geo.rivers".to_string()));
    }
}
