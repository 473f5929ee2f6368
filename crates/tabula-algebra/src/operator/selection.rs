use serde_json::Value;
use std::sync::Arc;
use tracing::trace;

use super::{require_tuples, Operator, SKIP_ONLY};
use crate::collection::{Collection, FilterKind, Filters, ItemIter, Kind};
use crate::error::Result;
use crate::key::Key;
use crate::predicate::Predicate;
use crate::properties::Properties;
use crate::value::as_tuple;

/// Keeps the rows satisfying a predicate.
///
/// When the input evaluates predicates natively the predicate is handed to
/// it instead of filtering here.
#[derive(Debug, Clone)]
pub struct Selection {
    predicate: Predicate,
    input: Arc<Operator>,
    pushdown: bool,
}

impl Selection {
    pub fn new(predicate: Predicate, input: Arc<Operator>) -> Result<Self> {
        require_tuples("select", &input)?;
        let pushdown = input
            .implemented_filters()
            .contains(&FilterKind::Predicate);
        Ok(Self {
            predicate,
            input,
            pushdown,
        })
    }

    pub fn predicate(&self) -> &Predicate {
        &self.predicate
    }

    pub fn input(&self) -> &Operator {
        &self.input
    }

    pub fn pushes_down(&self) -> bool {
        self.pushdown
    }

    pub fn id(&self) -> String {
        format!("select({},{})", self.predicate, self.input.id())
    }

    pub fn kind(&self) -> Kind {
        self.input.kind()
    }

    pub fn properties(&self) -> &Properties {
        self.input.properties()
    }

    pub fn implemented_filters(&self) -> &[FilterKind] {
        if self.pushdown && self.input.implemented_filters().contains(&FilterKind::Skip) {
            SKIP_ONLY
        } else {
            &[]
        }
    }

    pub fn items<'a>(&'a self, filters: &Filters) -> Result<ItemIter<'a>> {
        if self.pushdown {
            trace!(predicate = %self.predicate, input = %self.input, "pushing predicate down");
            let pushed = Filters {
                skip: filters.skip,
                predicate: Some(self.predicate.clone()),
            }
            .restricted_to(self.input.implemented_filters());
            return self.input.items(&pushed);
        }

        let rows = self.input.items(&Filters::default())?;
        Ok(Box::new(rows.filter_map(move |row| {
            let keep = match &row {
                Ok((_, value)) => as_tuple(value).and_then(|t| self.predicate.evaluate(t)),
                Err(_) => return Some(row),
            };
            match keep {
                Ok(true) => Some(row),
                Ok(false) => None,
                Err(e) => Some(Err(e)),
            }
        })))
    }

    pub fn item(&self, key: &Key) -> Result<Option<Value>> {
        let Some(value) = self.input.item(key)? else {
            return Ok(None);
        };
        let keep = self.predicate.evaluate(as_tuple(&value)?)?;
        Ok(keep.then_some(value))
    }
}
