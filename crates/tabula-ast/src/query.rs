use serde_json::json;
use std::io::Write;
use tabula_algebra::{AlgebraError, Catalog, Collection, Filters, Operator};
use thiserror::Error;
use tracing::info;

use crate::ast::Program;
use crate::parser::{parse, ParseFailure};

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("parse error: {0}")]
    Parse(#[from] ParseFailure),

    #[error(transparent)]
    Algebra(#[from] AlgebraError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A compiled program, ready to run.
#[derive(Debug, Clone)]
pub enum Query {
    Display(Operator),
    Draw(String),
    /// A bare expression: the collection itself is the result.
    Table(Operator),
}

impl Query {
    /// The collection this query reads, if any.
    pub fn collection(&self) -> Option<&Operator> {
        match self {
            Query::Display(op) | Query::Table(op) => Some(op),
            Query::Draw(_) => None,
        }
    }

    /// Execute a `display` or a bare expression by writing one JSON line per
    /// item: `{"key": ..., "tuple": ...}`. Returns the number of items written.
    pub fn run<W: Write>(&self, out: &mut W) -> Result<usize, QueryError> {
        let op = match self {
            Query::Display(op) | Query::Table(op) => op,
            Query::Draw(dataset) => {
                return Err(AlgebraError::NotImplemented(format!("draw({})", dataset)).into())
            }
        };

        let mut written = 0;
        for item in op.items(&Filters::default())? {
            let (key, tuple) = item?;
            serde_json::to_writer(&mut *out, &json!({ "key": key, "tuple": tuple }))
                .map_err(std::io::Error::from)?;
            out.write_all(b"\n")?;
            written += 1;
        }
        info!(collection = %op.id(), items = written, "query displayed");
        Ok(written)
    }
}

/// Parse `source` and build its operator tree.
pub fn compile(source: &str, catalog: &dyn Catalog) -> Result<Query, QueryError> {
    let query = match parse(source, catalog)? {
        Program::Display(table) => Query::Display(table.to_ir(catalog)?),
        Program::Draw { dataset } => Query::Draw(dataset),
        Program::Table(table) => Query::Table(table.to_ir(catalog)?),
    };
    Ok(query)
}
