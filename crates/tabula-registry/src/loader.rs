//! Load datasets from JSON or YAML files.
//!
//! Each file is one dataset named after its file stem:
//!
//! ```yaml
//! title: Geography
//! sections:
//!   cities:
//!     kind: DictOfTuples
//!     properties: { name: string, pop: integer }   # optional, inferred otherwise
//!     indexes: [name]                              # optional
//!     items:
//!       par: { name: Paris, pop: 2100000 }
//! ```
//!
//! Dict kinds take an object of items, list kinds an array.

use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use tabula_algebra::{Key, Kind, MemCollection, Properties};
use tracing::{debug, info, warn};

use crate::{DatasetRegistry, MemDataset, RegistryError};

#[derive(Debug, Deserialize)]
struct DatasetFile {
    #[serde(default)]
    title: Option<String>,
    sections: IndexMap<String, SectionFile>,
}

#[derive(Debug, Deserialize)]
struct SectionFile {
    kind: Kind,
    #[serde(default)]
    properties: Option<Properties>,
    #[serde(default)]
    indexes: Vec<String>,
    items: Value,
}

/// Load one dataset file. The format follows the file extension.
pub fn load_file<P: AsRef<Path>>(path: P) -> Result<MemDataset, RegistryError> {
    let path = path.as_ref();
    let name = path
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| RegistryError::Invalid {
            dataset: path.display().to_string(),
            reason: "file name is not valid UTF-8".to_string(),
        })?
        .to_string();

    let contents = std::fs::read_to_string(path)?;
    let file: DatasetFile = match path.extension().and_then(|e| e.to_str()) {
        Some("json") => serde_json::from_str(&contents)?,
        _ => serde_yaml::from_str(&contents)?,
    };

    let mut dataset = MemDataset::new(&name);
    if let Some(title) = file.title {
        dataset = dataset.with_title(title);
    }
    for (section, source) in file.sections {
        let collection = build_section(&name, &section, source)?;
        debug!(dataset = %name, section = %section, rows = collection.len(), "loaded section");
        dataset = dataset.with_section(section, collection);
    }
    Ok(dataset)
}

fn build_section(dataset: &str, section: &str, source: SectionFile) -> Result<MemCollection, RegistryError> {
    let id = format!("{}.{}", dataset, section);
    let items: Vec<(Key, Value)> = match (source.kind.is_dict(), source.items) {
        (true, Value::Object(map)) => map.into_iter().map(|(k, v)| (Key::Name(k), v)).collect(),
        (false, Value::Array(values)) => values
            .into_iter()
            .enumerate()
            .map(|(i, v)| (Key::from(i), v))
            .collect(),
        (is_dict, _) => {
            return Err(RegistryError::Invalid {
                dataset: id,
                reason: format!(
                    "{} items must be an {}",
                    source.kind,
                    if is_dict { "object" } else { "array" }
                ),
            })
        }
    };

    let mut collection = MemCollection::new(id, source.kind, items)?;
    if let Some(properties) = source.properties {
        collection = collection.with_properties(properties);
    }
    for field in &source.indexes {
        collection = collection.with_index(field)?;
    }
    Ok(collection)
}

/// Load every `*.json`, `*.yaml` and `*.yml` file of a directory.
pub fn load_dir<P: AsRef<Path>>(dir: P) -> Result<DatasetRegistry, RegistryError> {
    let dir = dir.as_ref();
    let mut paths: Vec<_> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| {
            matches!(
                p.extension().and_then(|e| e.to_str()),
                Some("json") | Some("yaml") | Some("yml")
            )
        })
        .collect();
    paths.sort();

    let mut registry = DatasetRegistry::new();
    for path in paths {
        match load_file(&path) {
            Ok(dataset) => registry.register(Arc::new(dataset)),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "skipping dataset file");
            }
        }
    }
    info!(directory = %dir.display(), datasets = registry.len(), "datasets loaded");
    Ok(registry)
}
