//! Tabula query language: parser, AST and operator construction

pub mod ast;
mod lexer;
mod parser;
mod query;
mod to_ir;

pub use ast::*;
pub use parser::{parse, ParseFailure, Trace, TraceEntry};
pub use query::{compile, Query, QueryError};
