use indexmap::IndexMap;
use std::sync::Arc;
use tabula_algebra::{Collection, MemCollection};

use crate::{Dataset, RegistryError};

/// Dataset whose sections are in-memory collections.
#[derive(Debug, Clone)]
pub struct MemDataset {
    name: String,
    title: Option<String>,
    sections: IndexMap<String, Arc<MemCollection>>,
}

impl MemDataset {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            title: None,
            sections: IndexMap::new(),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_section(mut self, section: impl Into<String>, collection: MemCollection) -> Self {
        self.sections.insert(section.into(), Arc::new(collection));
        self
    }
}

impl Dataset for MemDataset {
    fn name(&self) -> &str {
        &self.name
    }

    fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    fn sections(&self) -> Vec<String> {
        self.sections.keys().cloned().collect()
    }

    fn collection(&self, section: &str) -> Result<Arc<dyn Collection>, RegistryError> {
        self.sections
            .get(section)
            .map(|c| c.clone() as Arc<dyn Collection>)
            .ok_or_else(|| RegistryError::UnknownSection {
                dataset: self.name.clone(),
                section: section.to_string(),
            })
    }
}
