use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use super::{once_err, require_tuples, Operator};
use crate::collection::{field_or_null, skip_rows, Collection, Filters, Item, ItemIter};
use crate::error::{AlgebraError, Result};
use crate::key::{concat, decat, Key};
use crate::properties::{ProductProperties, Properties};
use crate::value::{as_tuple, into_tuple, values_equal, Tuple};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JoinType {
    Inner,
    Left,
    /// Left rows with no match, unchanged.
    Diff,
}

impl JoinType {
    pub fn name(self) -> &'static str {
        match self {
            JoinType::Inner => "inner-join",
            JoinType::Left => "left-join",
            JoinType::Diff => "diff-join",
        }
    }
}

impl FromStr for JoinType {
    type Err = AlgebraError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "inner-join" => Ok(JoinType::Inner),
            "left-join" => Ok(JoinType::Left),
            "diff-join" => Ok(JoinType::Diff),
            other => Err(AlgebraError::NotImplemented(other.to_string())),
        }
    }
}

impl fmt::Display for JoinType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Equi-join on `left.left_field = right.right_field`, probing the right
/// input with [`Collection::items_on_value`] for each left row.
///
/// Unmatched left rows are keyed `concat(k1, "")`: `left-join` yields them
/// merged with a null right side, `diff-join` yields them unchanged.
#[derive(Debug, Clone)]
pub struct FieldJoin {
    join_type: JoinType,
    left: Arc<Operator>,
    left_field: String,
    right: Arc<Operator>,
    right_field: String,
    merger: ProductProperties,
    properties: Properties,
}

impl FieldJoin {
    pub fn new(
        join_type: JoinType,
        left: Arc<Operator>,
        left_field: impl Into<String>,
        right: Arc<Operator>,
        right_field: impl Into<String>,
    ) -> Result<Self> {
        let name = join_type.name();
        require_tuples(name, &left)?;
        require_tuples(name, &right)?;
        let merger = ProductProperties::from_sources(&[left.properties(), right.properties()])?;
        let properties = match join_type {
            JoinType::Diff => left.properties().clone(),
            JoinType::Inner | JoinType::Left => merger.properties(),
        };
        Ok(Self {
            join_type,
            left,
            left_field: left_field.into(),
            right,
            right_field: right_field.into(),
            merger,
            properties,
        })
    }

    pub fn join_type(&self) -> JoinType {
        self.join_type
    }

    pub fn fields(&self) -> (&str, &str) {
        (&self.left_field, &self.right_field)
    }

    pub fn id(&self) -> String {
        format!(
            "{}({},{},{},{})",
            self.join_type,
            self.left.id(),
            self.left_field,
            self.right.id(),
            self.right_field
        )
    }

    pub fn properties(&self) -> &Properties {
        &self.properties
    }

    /// Skip counts produced rows, after match expansion. Keys are not
    /// renumbered.
    pub fn items<'a>(&'a self, filters: &Filters) -> Result<ItemIter<'a>> {
        let rows = self
            .left
            .items(&Filters::default())?
            .flat_map(move |row| self.expand(row));
        Ok(skip_rows(Box::new(rows), filters.skip.unwrap_or(0)))
    }

    fn expand<'a>(&'a self, row: Result<Item>) -> ItemIter<'a> {
        let (k1, t1) = match row.and_then(|(k, v)| Ok((k, into_tuple(v)?))) {
            Ok(pair) => pair,
            Err(e) => return once_err(e),
        };
        let probe = t1.get(&self.left_field).cloned().unwrap_or(Value::Null);
        let mut matches = match self.right.items_on_value(&self.right_field, &probe) {
            Ok(matches) => matches.peekable(),
            Err(e) => return once_err(e),
        };

        if matches.peek().is_none() {
            return match self.join_type {
                JoinType::Inner => Box::new(std::iter::empty()),
                JoinType::Left | JoinType::Diff => {
                    let row = self.unmatched(t1);
                    Box::new(std::iter::once(Ok((concat(&k1, &Key::empty()), row))))
                }
            };
        }

        match self.join_type {
            JoinType::Diff => match matches.next() {
                Some(Err(e)) => once_err(e),
                _ => Box::new(std::iter::empty()),
            },
            JoinType::Inner | JoinType::Left => Box::new(matches.map(move |row| {
                let (k2, v2) = row?;
                let merged = self.merger.merge_tuples(&t1, Some(as_tuple(&v2)?));
                Ok((concat(&k1, &k2), Value::Object(merged)))
            })),
        }
    }

    fn unmatched(&self, t1: Tuple) -> Value {
        match self.join_type {
            JoinType::Diff => Value::Object(t1),
            JoinType::Inner | JoinType::Left => Value::Object(self.merger.merge_tuples(&t1, None)),
        }
    }

    pub fn item(&self, key: &Key) -> Result<Option<Value>> {
        let (k1, k2) = decat(key)?;
        let Some(v1) = self.left.item(&k1)? else {
            return Ok(None);
        };
        let t1 = into_tuple(v1)?;
        let probe = t1.get(&self.left_field).cloned().unwrap_or(Value::Null);

        if k2.is_empty() {
            if self.join_type == JoinType::Inner {
                return Ok(None);
            }
            if let Some(first) = self.right.items_on_value(&self.right_field, &probe)?.next() {
                first?;
                return Ok(None);
            }
            return Ok(Some(self.unmatched(t1)));
        }

        if self.join_type == JoinType::Diff {
            return Ok(None);
        }
        let Some(v2) = self.right.item(&k2)? else {
            return Ok(None);
        };
        if !values_equal(&probe, field_or_null(&v2, &self.right_field)) {
            return Ok(None);
        }
        let merged = self.merger.merge_tuples(&t1, Some(as_tuple(&v2)?));
        Ok(Some(Value::Object(merged)))
    }
}
