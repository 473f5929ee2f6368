use serde_json::Value;
use std::sync::Arc;

use super::{once_err, require_tuples, Operator};
use crate::collection::{Collection, Filters, ItemIter};
use crate::error::Result;
use crate::key::{concat, decat, Key};
use crate::properties::{ProductProperties, Properties};
use crate::value::{as_tuple, into_tuple};

/// Every pairing of a left row with a right row. The right input is
/// re-iterated once per left row.
#[derive(Debug, Clone)]
pub struct CartesianProduct {
    left: Arc<Operator>,
    right: Arc<Operator>,
    merger: ProductProperties,
    properties: Properties,
}

impl CartesianProduct {
    pub fn new(left: Arc<Operator>, right: Arc<Operator>) -> Result<Self> {
        require_tuples("product", &left)?;
        require_tuples("product", &right)?;
        let merger = ProductProperties::from_sources(&[left.properties(), right.properties()])?;
        let properties = merger.properties();
        Ok(Self {
            left,
            right,
            merger,
            properties,
        })
    }

    pub fn left(&self) -> &Operator {
        &self.left
    }

    pub fn right(&self) -> &Operator {
        &self.right
    }

    pub fn merger(&self) -> &ProductProperties {
        &self.merger
    }

    pub fn id(&self) -> String {
        format!("product({},{})", self.left.id(), self.right.id())
    }

    pub fn properties(&self) -> &Properties {
        &self.properties
    }

    pub fn items<'a>(&'a self) -> Result<ItemIter<'a>> {
        let left = self.left.items(&Filters::default())?;
        Ok(Box::new(left.flat_map(move |row| -> ItemIter<'a> {
            let (k1, t1) = match row.and_then(|(k, v)| Ok((k, into_tuple(v)?))) {
                Ok(pair) => pair,
                Err(e) => return once_err(e),
            };
            let right = match self.right.items(&Filters::default()) {
                Ok(right) => right,
                Err(e) => return once_err(e),
            };
            Box::new(right.map(move |row| {
                let (k2, v2) = row?;
                let merged = self.merger.merge_tuples(&t1, Some(as_tuple(&v2)?));
                Ok((concat(&k1, &k2), Value::Object(merged)))
            }))
        })))
    }

    pub fn item(&self, key: &Key) -> Result<Option<Value>> {
        let (k1, k2) = decat(key)?;
        let (Some(v1), Some(v2)) = (self.left.item(&k1)?, self.right.item(&k2)?) else {
            return Ok(None);
        };
        let merged = self.merger.merge_tuples(as_tuple(&v1)?, Some(as_tuple(&v2)?));
        Ok(Some(Value::Object(merged)))
    }
}
