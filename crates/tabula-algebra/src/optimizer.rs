//! Execution strategy for predicate joins.
//!
//! A single equality between a field of each operand is rewritten into an
//! indexed [`FieldJoin`]; every other predicate runs as a cartesian product
//! followed by a selection. The rewrite never changes the produced rows.

use std::sync::Arc;
use tracing::debug;

use crate::collection::Collection;
use crate::error::{AlgebraError, Result};
use crate::operator::{CartesianProduct, FieldJoin, JoinType, Operator, Selection};
use crate::predicate::{CmpOp, Predicate};
use crate::properties::{MergedProperty, ProductProperties, Side};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinStrategy {
    /// Probe the right operand by value. Field names are the operands'
    /// original names.
    FieldJoin { left_field: String, right_field: String },
    ProductThenFilter,
}

/// Decide how a predicate over the merged schema can be executed.
pub fn choose_strategy(merger: &ProductProperties, predicate: &Predicate) -> Result<JoinStrategy> {
    if predicate.op != CmpOp::Eq {
        return Ok(JoinStrategy::ProductThenFilter);
    }
    let (field1, field2) = predicate.fields();
    let first = resolve(merger, field1)?;
    let Some(field2) = field2 else {
        return Ok(JoinStrategy::ProductThenFilter);
    };
    let second = resolve(merger, field2)?;

    if first.source == second.source {
        return Ok(JoinStrategy::ProductThenFilter);
    }
    let (left, right) = match first.source {
        Side::S1 => (first, second),
        Side::S2 => (second, first),
    };
    Ok(JoinStrategy::FieldJoin {
        left_field: left.original_name.clone(),
        right_field: right.original_name.clone(),
    })
}

fn resolve<'m>(merger: &'m ProductProperties, name: &str) -> Result<&'m MergedProperty> {
    merger
        .resolve(name)
        .ok_or_else(|| AlgebraError::UnknownField(name.to_string()))
}

/// Build the operator tree for `left ⋈ right on predicate`.
pub fn plan_join(
    left: Arc<Operator>,
    right: Arc<Operator>,
    predicate: &Predicate,
) -> Result<(JoinStrategy, Operator)> {
    let merger = ProductProperties::from_sources(&[left.properties(), right.properties()])?;
    let strategy = choose_strategy(&merger, predicate)?;
    debug!(
        left = %left,
        right = %right,
        predicate = %predicate,
        strategy = ?strategy,
        "planned predicate join"
    );

    let plan = match &strategy {
        JoinStrategy::FieldJoin {
            left_field,
            right_field,
        } => Operator::FieldJoin(FieldJoin::new(
            JoinType::Inner,
            left,
            left_field.clone(),
            right,
            right_field.clone(),
        )?),
        JoinStrategy::ProductThenFilter => {
            let product = Operator::Product(CartesianProduct::new(left, right)?);
            Operator::Selection(Selection::new(predicate.clone(), Arc::new(product))?)
        }
    };
    Ok((strategy, plan))
}
