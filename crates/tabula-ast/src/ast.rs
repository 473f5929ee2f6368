//! AST types for the query language
//!
//! One node per grammar production. `Display` renders the canonical id of
//! the collection a node builds, which parses back to the same node.

use serde::{Deserialize, Serialize};
use std::fmt;
use tabula_algebra::{JoinType, Predicate};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Program {
    /// `display(expTable)`: iterate and print.
    Display(TableExpr),
    /// `draw(dataset)`: map rendering, not available in this layer.
    Draw { dataset: String },
    /// A bare expression, returned to the caller as a collection.
    Table(TableExpr),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TableExpr {
    Collection {
        dataset: String,
        section: String,
    },
    FieldJoin {
        join_type: JoinType,
        left: Box<TableExpr>,
        left_field: String,
        right: Box<TableExpr>,
        right_field: String,
    },
    PredicateJoin {
        join_type: JoinType,
        left: Box<TableExpr>,
        right: Box<TableExpr>,
        predicate: Predicate,
    },
    SpatialJoin {
        left: Box<TableExpr>,
        right: Box<TableExpr>,
    },
    Union {
        left: Box<TableExpr>,
        right: Box<TableExpr>,
    },
    Product {
        left: Box<TableExpr>,
        right: Box<TableExpr>,
    },
    Projection {
        input: Box<TableExpr>,
        pairs: Vec<(String, String)>,
    },
    Selection {
        predicate: Predicate,
        input: Box<TableExpr>,
    },
}

impl fmt::Display for TableExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TableExpr::Collection { dataset, section } => write!(f, "{}.{}", dataset, section),
            TableExpr::FieldJoin {
                join_type,
                left,
                left_field,
                right,
                right_field,
            } => write!(f, "{}({},{},{},{})", join_type, left, left_field, right, right_field),
            TableExpr::PredicateJoin {
                join_type,
                left,
                right,
                predicate,
            } => write!(f, "{}({},{},{})", join_type, left, right, predicate),
            TableExpr::SpatialJoin { left, right } => write!(f, "spatial-join({},{})", left, right),
            TableExpr::Union { left, right } => write!(f, "union({},{})", left, right),
            TableExpr::Product { left, right } => write!(f, "product({},{})", left, right),
            TableExpr::Projection { input, pairs } => {
                write!(f, "proj({},[", input)?;
                for (i, (from, to)) in pairs.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{}>{}", from, to)?;
                }
                f.write_str("])")
            }
            TableExpr::Selection { predicate, input } => write!(f, "select({},{})", predicate, input),
        }
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Program::Display(table) => write!(f, "display({})", table),
            Program::Draw { dataset } => write!(f, "draw({})", dataset),
            Program::Table(table) => write!(f, "{}", table),
        }
    }
}
