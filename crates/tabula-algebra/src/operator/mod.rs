//! Derived collections.
//!
//! Every operator is itself a collection, so trees of operators compose
//! freely. Iteration is pull-based: asking an operator for its next row pulls
//! only what it needs from its inputs, and dropping the iterator stops there.

mod join;
mod predicate_join;
mod product;
mod projection;
mod selection;

pub use join::{FieldJoin, JoinType};
pub use predicate_join::PredicateJoin;
pub use product::CartesianProduct;
pub use projection::Projection;
pub use selection::Selection;

use serde_json::Value;
use std::fmt;
use std::sync::Arc;

use crate::collection::{fingerprint, Collection, FilterKind, Filters, ItemIter, Kind};
use crate::error::{AlgebraError, Result};
use crate::key::Key;
use crate::properties::Properties;

const SKIP_ONLY: &[FilterKind] = &[FilterKind::Skip];

#[derive(Debug, Clone)]
pub enum Operator {
    Leaf(Arc<dyn Collection>),
    Projection(Projection),
    Selection(Selection),
    Product(CartesianProduct),
    FieldJoin(FieldJoin),
    PredicateJoin(PredicateJoin),
}

impl Operator {
    pub fn leaf(collection: Arc<dyn Collection>) -> Self {
        Operator::Leaf(collection)
    }

    pub fn fingerprint(&self) -> String {
        fingerprint(&self.id())
    }
}

impl Collection for Operator {
    fn id(&self) -> String {
        match self {
            Operator::Leaf(c) => c.id(),
            Operator::Projection(op) => op.id(),
            Operator::Selection(op) => op.id(),
            Operator::Product(op) => op.id(),
            Operator::FieldJoin(op) => op.id(),
            Operator::PredicateJoin(op) => op.id(),
        }
    }

    fn kind(&self) -> Kind {
        match self {
            Operator::Leaf(c) => c.kind(),
            Operator::Projection(op) => op.kind(),
            Operator::Selection(op) => op.kind(),
            Operator::Product(_) | Operator::FieldJoin(_) => Kind::DictOfTuples,
            Operator::PredicateJoin(op) => op.kind(),
        }
    }

    fn properties(&self) -> &Properties {
        match self {
            Operator::Leaf(c) => c.properties(),
            Operator::Projection(op) => op.properties(),
            Operator::Selection(op) => op.properties(),
            Operator::Product(op) => op.properties(),
            Operator::FieldJoin(op) => op.properties(),
            Operator::PredicateJoin(op) => op.properties(),
        }
    }

    fn implemented_filters(&self) -> &[FilterKind] {
        match self {
            Operator::Leaf(c) => c.implemented_filters(),
            Operator::Projection(op) => op.implemented_filters(),
            Operator::Selection(op) => op.implemented_filters(),
            Operator::Product(_) => &[],
            Operator::FieldJoin(_) => SKIP_ONLY,
            Operator::PredicateJoin(op) => op.implemented_filters(),
        }
    }

    fn items(&self, filters: &Filters) -> Result<ItemIter<'_>> {
        match self {
            Operator::Leaf(c) => c.items(filters),
            Operator::Projection(op) => op.items(filters),
            Operator::Selection(op) => op.items(filters),
            Operator::Product(op) => op.items(),
            Operator::FieldJoin(op) => op.items(filters),
            Operator::PredicateJoin(op) => op.items(filters),
        }
    }

    fn item(&self, key: &Key) -> Result<Option<Value>> {
        match self {
            Operator::Leaf(c) => c.item(key),
            Operator::Projection(op) => op.item(key),
            Operator::Selection(op) => op.item(key),
            Operator::Product(op) => op.item(key),
            Operator::FieldJoin(op) => op.item(key),
            Operator::PredicateJoin(op) => op.item(key),
        }
    }

    fn items_on_value(&self, field: &str, value: &Value) -> Result<ItemIter<'_>> {
        match self {
            // leaves may answer from an index
            Operator::Leaf(c) => c.items_on_value(field, value),
            _ => Ok(crate::collection::scan_on_value(
                self.items(&Filters::default())?,
                field,
                value,
            )),
        }
    }
}

/// Operators compare by canonical id.
impl PartialEq for Operator {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id())
    }
}

impl From<Arc<dyn Collection>> for Operator {
    fn from(collection: Arc<dyn Collection>) -> Self {
        Operator::Leaf(collection)
    }
}

fn require_tuples(op: &'static str, input: &Operator) -> Result<()> {
    let kind = input.kind();
    if kind.has_tuples() {
        Ok(())
    } else {
        Err(AlgebraError::IncompatibleKind { op, kind })
    }
}

fn once_err<'a>(err: AlgebraError) -> ItemIter<'a> {
    Box::new(std::iter::once(Err(err)))
}
