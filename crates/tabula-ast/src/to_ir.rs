//! Build operator trees from parsed expressions.

use std::sync::Arc;
use tabula_algebra::{
    AlgebraError, CartesianProduct, Catalog, FieldJoin, Operator, PredicateJoin, Projection, Result,
    Selection,
};

use crate::ast::TableExpr;

impl TableExpr {
    /// Resolve collections through `catalog` and construct the operators,
    /// children first. Construction never iterates any collection.
    pub fn to_ir(&self, catalog: &dyn Catalog) -> Result<Operator> {
        let op = match self {
            TableExpr::Collection { dataset, section } => Operator::leaf(catalog.collection(dataset, section)?),
            TableExpr::FieldJoin {
                join_type,
                left,
                left_field,
                right,
                right_field,
            } => Operator::FieldJoin(FieldJoin::new(
                *join_type,
                Arc::new(left.to_ir(catalog)?),
                left_field.as_str(),
                Arc::new(right.to_ir(catalog)?),
                right_field.as_str(),
            )?),
            TableExpr::PredicateJoin {
                join_type,
                left,
                right,
                predicate,
            } => Operator::PredicateJoin(PredicateJoin::new(
                *join_type,
                Arc::new(left.to_ir(catalog)?),
                Arc::new(right.to_ir(catalog)?),
                predicate.clone(),
            )?),
            TableExpr::SpatialJoin { .. } => {
                return Err(AlgebraError::NotImplemented("spatial-join".to_string()))
            }
            TableExpr::Union { .. } => return Err(AlgebraError::NotImplemented("union".to_string())),
            TableExpr::Product { left, right } => Operator::Product(CartesianProduct::new(
                Arc::new(left.to_ir(catalog)?),
                Arc::new(right.to_ir(catalog)?),
            )?),
            TableExpr::Projection { input, pairs } => {
                Operator::Projection(Projection::new(Arc::new(input.to_ir(catalog)?), pairs.clone())?)
            }
            TableExpr::Selection { predicate, input } => {
                Operator::Selection(Selection::new(predicate.clone(), Arc::new(input.to_ir(catalog)?))?)
            }
        };
        Ok(op)
    }
}
