//! In-memory leaf collection with optional hash indexes.

use serde_json::Value;
use std::collections::HashMap;

use crate::collection::{field_or_null, scan_on_value, skip_rows, Collection, FilterKind, Filters, ItemIter, Kind};
use crate::error::{AlgebraError, Result};
use crate::key::Key;
use crate::properties::{infer_properties, Properties};
use crate::value::{as_tuple, equality_token};

const NATIVE_FILTERS: &[FilterKind] = &[FilterKind::Skip, FilterKind::Predicate];

#[derive(Debug, Clone)]
pub struct MemCollection {
    id: String,
    kind: Kind,
    properties: Properties,
    items: Vec<(Key, Value)>,
    positions: HashMap<Key, usize>,
    /// field -> equality token -> item positions
    indexes: HashMap<String, HashMap<String, Vec<usize>>>,
}

impl MemCollection {
    /// Build a collection; properties of tuple kinds are inferred from the items.
    pub fn new(id: impl Into<String>, kind: Kind, items: Vec<(Key, Value)>) -> Result<Self> {
        if kind.has_tuples() {
            for (_, value) in &items {
                as_tuple(value)?;
            }
        }
        let properties = if kind.has_tuples() {
            infer_properties(items.iter().filter_map(|(_, v)| v.as_object()))
        } else {
            Properties::new()
        };
        let positions = items
            .iter()
            .enumerate()
            .map(|(i, (key, _))| (key.clone(), i))
            .collect();
        Ok(Self {
            id: id.into(),
            kind,
            properties,
            items,
            positions,
            indexes: HashMap::new(),
        })
    }

    /// Keyed collection from `(key, tuple)` pairs.
    pub fn dict<K: Into<Key>>(id: impl Into<String>, rows: impl IntoIterator<Item = (K, Value)>) -> Result<Self> {
        let items = rows.into_iter().map(|(k, v)| (k.into(), v)).collect();
        Self::new(id, Kind::DictOfTuples, items)
    }

    /// List collection keyed by position.
    pub fn list(id: impl Into<String>, kind: Kind, values: impl IntoIterator<Item = Value>) -> Result<Self> {
        let items = values
            .into_iter()
            .enumerate()
            .map(|(i, v)| (Key::from(i), v))
            .collect();
        Self::new(id, kind, items)
    }

    /// Replace the inferred properties with declared ones.
    pub fn with_properties(mut self, properties: Properties) -> Self {
        self.properties = properties;
        self
    }

    /// Index `field` for value lookups.
    pub fn with_index(mut self, field: &str) -> Result<Self> {
        if !self.kind.has_tuples() {
            return Err(AlgebraError::IncompatibleKind {
                op: "index",
                kind: self.kind,
            });
        }
        let mut index: HashMap<String, Vec<usize>> = HashMap::new();
        for (i, (_, value)) in self.items.iter().enumerate() {
            index
                .entry(equality_token(field_or_null(value, field)))
                .or_default()
                .push(i);
        }
        self.indexes.insert(field.to_string(), index);
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn indexed_fields(&self) -> impl Iterator<Item = &str> {
        self.indexes.keys().map(String::as_str)
    }
}

impl Collection for MemCollection {
    fn id(&self) -> String {
        self.id.clone()
    }

    fn kind(&self) -> Kind {
        self.kind
    }

    fn properties(&self) -> &Properties {
        &self.properties
    }

    fn implemented_filters(&self) -> &[FilterKind] {
        NATIVE_FILTERS
    }

    fn items(&self, filters: &Filters) -> Result<ItemIter<'_>> {
        let rows = self.items.iter();
        let matching: ItemIter<'_> = match filters.predicate.clone() {
            None => Box::new(rows.map(|(k, v)| Ok((k.clone(), v.clone())))),
            Some(predicate) => Box::new(rows.filter_map(move |(k, v)| {
                match as_tuple(v).and_then(|t| predicate.evaluate(t)) {
                    Ok(true) => Some(Ok((k.clone(), v.clone()))),
                    Ok(false) => None,
                    Err(e) => Some(Err(e)),
                }
            })),
        };
        Ok(skip_rows(matching, filters.skip.unwrap_or(0)))
    }

    fn item(&self, key: &Key) -> Result<Option<Value>> {
        Ok(self
            .positions
            .get(key)
            .map(|&i| self.items[i].1.clone()))
    }

    fn items_on_value(&self, field: &str, value: &Value) -> Result<ItemIter<'_>> {
        match self.indexes.get(field) {
            Some(index) => {
                let hits = index.get(&equality_token(value)).cloned().unwrap_or_default();
                Ok(Box::new(hits.into_iter().map(move |i| {
                    let (k, v) = &self.items[i];
                    Ok((k.clone(), v.clone()))
                })))
            }
            None => Ok(scan_on_value(self.items(&Filters::default())?, field, value)),
        }
    }
}
