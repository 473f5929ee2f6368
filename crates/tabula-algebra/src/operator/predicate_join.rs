use serde_json::Value;
use std::sync::Arc;

use super::{JoinType, Operator};
use crate::collection::{Collection, FilterKind, Filters, ItemIter, Kind};
use crate::error::{AlgebraError, Result};
use crate::key::Key;
use crate::optimizer::{plan_join, JoinStrategy};
use crate::predicate::Predicate;
use crate::properties::Properties;

/// Join expressed by a predicate over the merged schema. The execution plan
/// is chosen once, at construction.
#[derive(Debug, Clone)]
pub struct PredicateJoin {
    join_type: JoinType,
    left: Arc<Operator>,
    right: Arc<Operator>,
    predicate: Predicate,
    strategy: JoinStrategy,
    plan: Box<Operator>,
}

impl PredicateJoin {
    pub fn new(
        join_type: JoinType,
        left: Arc<Operator>,
        right: Arc<Operator>,
        predicate: Predicate,
    ) -> Result<Self> {
        if join_type != JoinType::Inner {
            return Err(AlgebraError::NotImplemented(format!(
                "{} with a predicate",
                join_type
            )));
        }
        let (strategy, plan) = plan_join(left.clone(), right.clone(), &predicate)?;
        Ok(Self {
            join_type,
            left,
            right,
            predicate,
            strategy,
            plan: Box::new(plan),
        })
    }

    pub fn strategy(&self) -> &JoinStrategy {
        &self.strategy
    }

    /// The operator tree that actually runs.
    pub fn plan(&self) -> &Operator {
        &self.plan
    }

    pub fn id(&self) -> String {
        format!(
            "{}({},{},{})",
            self.join_type,
            self.left.id(),
            self.right.id(),
            self.predicate
        )
    }

    pub fn kind(&self) -> Kind {
        self.plan.kind()
    }

    pub fn properties(&self) -> &Properties {
        self.plan.properties()
    }

    pub fn implemented_filters(&self) -> &[FilterKind] {
        self.plan.implemented_filters()
    }

    pub fn items<'a>(&'a self, filters: &Filters) -> Result<ItemIter<'a>> {
        self.plan.items(filters)
    }

    pub fn item(&self, key: &Key) -> Result<Option<Value>> {
        self.plan.item(key)
    }
}
