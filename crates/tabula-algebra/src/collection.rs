//! The collection contract shared by leaf datasets and derived operators.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fmt;
use std::sync::Arc;

use crate::error::Result;
use crate::key::Key;
use crate::predicate::Predicate;
use crate::properties::Properties;
use crate::value::values_equal;

/// Shape of a collection, fixed at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Kind {
    DictOfTuples,
    DictOfValues,
    ListOfTuples,
    ListOfValues,
}

impl Kind {
    /// Whether items are tuples, as opposed to bare values.
    pub fn has_tuples(self) -> bool {
        matches!(self, Kind::DictOfTuples | Kind::ListOfTuples)
    }

    pub fn is_dict(self) -> bool {
        matches!(self, Kind::DictOfTuples | Kind::DictOfValues)
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Kind::DictOfTuples => "DictOfTuples",
            Kind::DictOfValues => "DictOfValues",
            Kind::ListOfTuples => "ListOfTuples",
            Kind::ListOfValues => "ListOfValues",
        };
        f.write_str(name)
    }
}

/// Filters a collection may apply natively during iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterKind {
    Skip,
    Predicate,
}

/// Filters passed to [`Collection::items`]. A collection only has to honor
/// the kinds it lists in [`Collection::implemented_filters`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filters {
    /// Number of leading rows to discard.
    pub skip: Option<usize>,
    pub predicate: Option<Predicate>,
}

impl Filters {
    pub fn with_skip(mut self, skip: usize) -> Self {
        self.skip = Some(skip);
        self
    }

    pub fn with_predicate(mut self, predicate: Predicate) -> Self {
        self.predicate = Some(predicate);
        self
    }

    /// Drop the filters the given capability list does not cover.
    pub fn restricted_to(&self, supported: &[FilterKind]) -> Filters {
        Filters {
            skip: self.skip.filter(|_| supported.contains(&FilterKind::Skip)),
            predicate: self
                .predicate
                .clone()
                .filter(|_| supported.contains(&FilterKind::Predicate)),
        }
    }
}

pub type Item = (Key, Value);

/// Lazy sequence of items. Dropping it stops pulling from every input.
pub type ItemIter<'a> = Box<dyn Iterator<Item = Result<Item>> + 'a>;

pub trait Collection: fmt::Debug + Send + Sync {
    /// Canonical id, re-parseable by the query language.
    fn id(&self) -> String;

    fn kind(&self) -> Kind;

    fn properties(&self) -> &Properties;

    fn implemented_filters(&self) -> &[FilterKind] {
        &[]
    }

    fn items(&self, filters: &Filters) -> Result<ItemIter<'_>>;

    /// Point lookup by key.
    fn item(&self, key: &Key) -> Result<Option<Value>>;

    /// Items whose `field` equals `value`. A tuple without the field compares
    /// as `null`.
    fn items_on_value(&self, field: &str, value: &Value) -> Result<ItemIter<'_>> {
        Ok(scan_on_value(self.items(&Filters::default())?, field, value))
    }
}

/// Linear value lookup over an item sequence.
pub fn scan_on_value<'a>(items: ItemIter<'a>, field: &str, value: &Value) -> ItemIter<'a> {
    let field = field.to_string();
    let value = value.clone();
    Box::new(items.filter(move |item| match item {
        Ok((_, row)) => values_equal(field_or_null(row, &field), &value),
        Err(_) => true,
    }))
}

static NULL: Value = Value::Null;

pub(crate) fn field_or_null<'v>(row: &'v Value, field: &str) -> &'v Value {
    row.get(field).unwrap_or(&NULL)
}

/// Drop the first `skip` rows. Errors are not counted as rows and are
/// passed through, so a failure inside the skipped range still surfaces.
pub(crate) fn skip_rows(items: ItemIter<'_>, skip: usize) -> ItemIter<'_> {
    if skip == 0 {
        return items;
    }
    let mut remaining = skip;
    Box::new(items.filter(move |row| {
        if remaining > 0 && row.is_ok() {
            remaining -= 1;
            false
        } else {
            true
        }
    }))
}

/// Iterate from row `skip` onwards, natively when the collection supports it.
/// Row errors are never skipped over.
pub fn paginate<C: Collection + ?Sized>(collection: &C, skip: usize) -> Result<ItemIter<'_>> {
    if skip == 0 {
        return collection.items(&Filters::default());
    }
    if collection.implemented_filters().contains(&FilterKind::Skip) {
        collection.items(&Filters::default().with_skip(skip))
    } else {
        Ok(skip_rows(collection.items(&Filters::default())?, skip))
    }
}

/// SHA-256 of a canonical id. Clients key page caches on it.
pub fn fingerprint(id: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(id.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Resolves dataset names to leaf collections.
pub trait Catalog {
    fn has_dataset(&self, name: &str) -> bool;

    fn collection(&self, dataset: &str, section: &str) -> Result<Arc<dyn Collection>>;
}
