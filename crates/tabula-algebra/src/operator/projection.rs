use itertools::Itertools;
use serde_json::Value;
use std::sync::Arc;

use super::{require_tuples, Operator, SKIP_ONLY};
use crate::collection::{Collection, FilterKind, Filters, ItemIter, Kind};
use crate::error::{AlgebraError, Result};
use crate::key::Key;
use crate::properties::{PropType, Properties};
use crate::value::{as_tuple, Tuple};

/// Copies `input[from]` to `to` for each declared pair, in declared order.
#[derive(Debug, Clone)]
pub struct Projection {
    input: Arc<Operator>,
    pairs: Vec<(String, String)>,
    properties: Properties,
}

impl Projection {
    pub fn new(input: Arc<Operator>, pairs: Vec<(String, String)>) -> Result<Self> {
        require_tuples("proj", &input)?;
        let properties = pairs
            .iter()
            .map(|(from, to)| {
                let tag = input.properties().get(from).cloned().unwrap_or(PropType::Unknown);
                (to.clone(), tag)
            })
            .collect();
        Ok(Self {
            input,
            pairs,
            properties,
        })
    }

    pub fn input(&self) -> &Operator {
        &self.input
    }

    pub fn pairs(&self) -> &[(String, String)] {
        &self.pairs
    }

    pub fn id(&self) -> String {
        let pairs = self
            .pairs
            .iter()
            .format_with(",", |(from, to), f| f(&format_args!("{}>{}", from, to)));
        format!("proj({},[{}])", self.input.id(), pairs)
    }

    pub fn kind(&self) -> Kind {
        self.input.kind()
    }

    pub fn properties(&self) -> &Properties {
        &self.properties
    }

    /// One output row per input row, so a native skip passes straight through.
    pub fn implemented_filters(&self) -> &[FilterKind] {
        if self.input.implemented_filters().contains(&FilterKind::Skip) {
            SKIP_ONLY
        } else {
            &[]
        }
    }

    pub fn items<'a>(&'a self, filters: &Filters) -> Result<ItemIter<'a>> {
        let passed = Filters {
            skip: filters.skip,
            predicate: None,
        }
        .restricted_to(self.implemented_filters());
        let rows = self.input.items(&passed)?;
        Ok(Box::new(rows.map(move |row| {
            let (key, value) = row?;
            Ok((key, self.project(&value)?))
        })))
    }

    pub fn item(&self, key: &Key) -> Result<Option<Value>> {
        self.input
            .item(key)?
            .map(|value| self.project(&value))
            .transpose()
    }

    fn project(&self, value: &Value) -> Result<Value> {
        let tuple = as_tuple(value)?;
        let mut out = Tuple::new();
        for (from, to) in &self.pairs {
            let v = tuple
                .get(from)
                .ok_or_else(|| AlgebraError::MissingField(from.clone()))?;
            out.insert(to.clone(), v.clone());
        }
        Ok(Value::Object(out))
    }
}
