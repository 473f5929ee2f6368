//! Recursive-descent parser with backtracking and a diagnostic trace
//!
//! Grammar:
//!
//! ```text
//! program    ::= 'display' '(' expTable ')'
//!              | 'draw' '(' expDataset ')'
//!              | expTable
//! expDataset ::= name
//! expTable   ::= expDataset '.' name
//!              | joinName '(' expTable ',' joinOn
//!              | 'spatial-join' '(' expTable ',' expTable ')'
//!              | 'union' '(' expTable ',' expTable ')'
//!              | 'product' '(' expTable ',' expTable ')'
//!              | 'proj' '(' expTable ',' '[' fieldPairs ']' ')'
//!              | 'select' '(' predicate ',' expTable ')'
//! joinOn     ::= name ',' expTable ',' name ')'
//!              | expTable ',' predicate ')'
//! fieldPairs ::= namePair ',' fieldPairs | namePair
//! namePair   ::= name '>' name
//! predicate  ::= name op (name | string | number)
//! joinName   ::= 'inner-join' | 'left-join' | 'diff-join'
//! ```
//!
//! Every rule is a function from the remaining tokens to an optional node
//! and the tokens left after it. Alternatives are tried in order, each on
//! the same input, and every attempt is recorded in the trace.

use serde::Serialize;
use serde_json::Value;
use std::fmt;
use tabula_algebra::{Catalog, CmpOp, JoinType, Operand, Predicate};
use thiserror::Error;
use tracing::{debug, trace};

use crate::ast::{Program, TableExpr};
use crate::lexer::{tokenize, Token, TokenKind};

type Input<'t> = &'t [Token];
type Parsed<'t, T> = Option<(T, Input<'t>)>;

/// What follows the left operand of a join.
enum JoinOn {
    Fields {
        left_field: String,
        right: TableExpr,
        right_field: String,
    },
    Predicate {
        right: TableExpr,
        predicate: Predicate,
    },
}

/// One rule attempt.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TraceEntry {
    /// Rules from the root down to this one, `/`-separated. Alternatives
    /// of a rule are named after a `:`.
    pub path: String,
    /// Input text when the rule was entered.
    pub before: String,
    /// Input text left after the rule, if it matched.
    pub after: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl TraceEntry {
    pub fn succeeded(&self) -> bool {
        self.after.is_some()
    }
}

/// Append-only log of rule attempts, in the order they were entered.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Trace {
    entries: Vec<TraceEntry>,
}

impl Trace {
    pub fn entries(&self) -> &[TraceEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Shortest input left by any successful attempt, i.e. how far parsing got.
    pub fn furthest_remaining(&self) -> Option<&str> {
        self.entries
            .iter()
            .filter_map(|e| e.after.as_deref())
            .min_by_key(|rest| rest.len())
    }

    fn begin(&mut self, path: String, before: String) -> usize {
        self.entries.push(TraceEntry {
            path,
            before,
            after: None,
            note: None,
        });
        self.entries.len() - 1
    }
}

impl fmt::Display for Trace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for entry in &self.entries {
            let outcome = if entry.succeeded() { "ok  " } else { "fail" };
            write!(f, "{}  {}  before=<{}>", entry.path, outcome, entry.before)?;
            if let Some(after) = &entry.after {
                write!(f, "  after=<{}>", after)?;
            }
            if let Some(note) = &entry.note {
                write!(f, "  ({})", note)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[error("{message}")]
pub struct ParseFailure {
    pub message: String,
    pub trace: Trace,
}

/// Parse a query. Dataset names are checked against `catalog` while parsing.
pub fn parse(source: &str, catalog: &dyn Catalog) -> Result<Program, ParseFailure> {
    let tokens = tokenize(source).map_err(|e| ParseFailure {
        message: format!("{} at offset {}", e.message, e.offset),
        trace: Trace::default(),
    })?;

    let mut parser = Parser {
        source,
        catalog,
        trace: Trace::default(),
        note: None,
    };
    let program = parser.program(&tokens);
    for entry in parser.trace.entries() {
        trace!(path = %entry.path, ok = entry.succeeded(), before = %entry.before, "rule attempt");
    }

    match program {
        Some(program) => {
            debug!(query = source, attempts = parser.trace.entries.len(), "parsed query");
            Ok(program)
        }
        None => {
            let message = match parser.trace.furthest_remaining() {
                Some("") => "unexpected end of query".to_string(),
                Some(rest) => format!("could not parse query from `{}`", rest),
                None => "could not parse query".to_string(),
            };
            debug!(query = source, %message, "parse failed");
            Err(ParseFailure {
                message,
                trace: parser.trace,
            })
        }
    }
}

struct Parser<'s, 'c> {
    source: &'s str,
    catalog: &'c dyn Catalog,
    trace: Trace,
    /// Diagnostic attached to the entry of the rule currently finishing.
    note: Option<String>,
}

impl<'s, 'c> Parser<'s, 'c> {
    fn text(&self, input: Input<'_>) -> String {
        input
            .first()
            .map(|t| self.source[t.offset..].to_string())
            .unwrap_or_default()
    }

    /// Run `rule` on `input`, recording the attempt under `path`.
    fn attempt<'t, T, F>(&mut self, path: String, input: Input<'t>, rule: F) -> Parsed<'t, T>
    where
        F: FnOnce(&mut Self, &str, Input<'t>) -> Parsed<'t, T>,
    {
        let before = self.text(input);
        let index = self.trace.begin(path.clone(), before);
        let result = rule(self, &path, input);
        let after = result.as_ref().map(|(_, rest)| self.text(rest));
        let entry = &mut self.trace.entries[index];
        entry.after = after;
        entry.note = self.note.take();
        result
    }

    fn program<'t>(&mut self, input: Input<'t>) -> Option<Program> {
        type Rule<'s, 'c, 't> = fn(&mut Parser<'s, 'c>, &str, Input<'t>) -> Parsed<'t, Program>;
        let alternatives: [(&str, Rule<'s, 'c, 't>); 3] = [
            ("display", Self::program_display),
            ("draw", Self::program_draw),
            ("table", Self::program_table),
        ];
        for (label, rule) in alternatives {
            let parsed = self.attempt(format!("program:{}", label), input, |p, path, input| {
                // the whole input must be consumed
                match rule(p, path, input) {
                    Some((program, rest)) if rest.is_empty() => Some((program, rest)),
                    Some((_, rest)) => {
                        p.note = Some(format!("trailing input `{}`", p.text(rest)));
                        None
                    }
                    None => None,
                }
            });
            if let Some((program, _)) = parsed {
                return Some(program);
            }
        }
        None
    }

    fn program_display<'t>(&mut self, path: &str, input: Input<'t>) -> Parsed<'t, Program> {
        let rest = keyword(input, "display")?;
        let rest = punct(rest, &TokenKind::LParen)?;
        let (table, rest) = self.exp_table(path, rest)?;
        let rest = punct(rest, &TokenKind::RParen)?;
        Some((Program::Display(table), rest))
    }

    fn program_draw<'t>(&mut self, path: &str, input: Input<'t>) -> Parsed<'t, Program> {
        let rest = keyword(input, "draw")?;
        let rest = punct(rest, &TokenKind::LParen)?;
        let (dataset, rest) = self.exp_dataset(path, rest)?;
        let rest = punct(rest, &TokenKind::RParen)?;
        Some((Program::Draw { dataset }, rest))
    }

    fn program_table<'t>(&mut self, path: &str, input: Input<'t>) -> Parsed<'t, Program> {
        let (table, rest) = self.exp_table(path, input)?;
        Some((Program::Table(table), rest))
    }

    /// A registered dataset name. An unknown name fails this rule only.
    fn exp_dataset<'t>(&mut self, parent: &str, input: Input<'t>) -> Parsed<'t, String> {
        self.attempt(format!("{}/expDataset", parent), input, |p, _, input| {
            let (name, rest) = name(input)?;
            if p.catalog.has_dataset(&name) {
                Some((name, rest))
            } else {
                p.note = Some(format!("unknown dataset `{}`", name));
                None
            }
        })
    }

    fn exp_table<'t>(&mut self, parent: &str, input: Input<'t>) -> Parsed<'t, TableExpr> {
        type Rule<'s, 'c, 't> = fn(&mut Parser<'s, 'c>, &str, Input<'t>) -> Parsed<'t, TableExpr>;
        let alternatives: [(&str, Rule<'s, 'c, 't>); 7] = [
            ("collection", Self::table_collection),
            ("join", Self::table_join),
            ("spatialJoin", Self::table_spatial_join),
            ("union", Self::table_union),
            ("product", Self::table_product),
            ("proj", Self::table_proj),
            ("select", Self::table_select),
        ];
        for (label, rule) in alternatives {
            let parsed = self.attempt(format!("{}/expTable:{}", parent, label), input, rule);
            if parsed.is_some() {
                return parsed;
            }
        }
        None
    }

    fn table_collection<'t>(&mut self, path: &str, input: Input<'t>) -> Parsed<'t, TableExpr> {
        let (dataset, rest) = self.exp_dataset(path, input)?;
        let rest = punct(rest, &TokenKind::Dot)?;
        let (section, rest) = name(rest)?;
        Some((TableExpr::Collection { dataset, section }, rest))
    }

    /// Field and predicate joins share `joinName '(' expTable ','`, which is
    /// parsed once before the two tails are tried.
    fn table_join<'t>(&mut self, path: &str, input: Input<'t>) -> Parsed<'t, TableExpr> {
        let (join_type, rest) = join_name(input)?;
        let rest = punct(rest, &TokenKind::LParen)?;
        let (left, rest) = self.exp_table(path, rest)?;
        let rest = punct(rest, &TokenKind::Comma)?;

        let on_fields = self.attempt(format!("{}/joinOn:fields", path), rest, |p, path, input| {
            let (left_field, rest) = name(input)?;
            let rest = punct(rest, &TokenKind::Comma)?;
            let (right, rest) = p.exp_table(path, rest)?;
            let rest = punct(rest, &TokenKind::Comma)?;
            let (right_field, rest) = name(rest)?;
            let rest = punct(rest, &TokenKind::RParen)?;
            Some((JoinOn::Fields { left_field, right, right_field }, rest))
        });
        let (on, rest) = match on_fields {
            Some(parsed) => parsed,
            None => self.attempt(format!("{}/joinOn:predicate", path), rest, |p, path, input| {
                let (right, rest) = p.exp_table(path, input)?;
                let rest = punct(rest, &TokenKind::Comma)?;
                let (predicate, rest) = p.predicate(path, rest)?;
                let rest = punct(rest, &TokenKind::RParen)?;
                Some((JoinOn::Predicate { right, predicate }, rest))
            })?,
        };

        let left = Box::new(left);
        let node = match on {
            JoinOn::Fields {
                left_field,
                right,
                right_field,
            } => TableExpr::FieldJoin {
                join_type,
                left,
                left_field,
                right: Box::new(right),
                right_field,
            },
            JoinOn::Predicate { right, predicate } => TableExpr::PredicateJoin {
                join_type,
                left,
                right: Box::new(right),
                predicate,
            },
        };
        Some((node, rest))
    }

    /// `kw '(' expTable ',' expTable ')'`
    fn binary<'t>(&mut self, kw: &str, path: &str, input: Input<'t>) -> Parsed<'t, (TableExpr, TableExpr)> {
        let rest = keyword(input, kw)?;
        let rest = punct(rest, &TokenKind::LParen)?;
        let (left, rest) = self.exp_table(path, rest)?;
        let rest = punct(rest, &TokenKind::Comma)?;
        let (right, rest) = self.exp_table(path, rest)?;
        let rest = punct(rest, &TokenKind::RParen)?;
        Some(((left, right), rest))
    }

    fn table_spatial_join<'t>(&mut self, path: &str, input: Input<'t>) -> Parsed<'t, TableExpr> {
        let ((left, right), rest) = self.binary("spatial-join", path, input)?;
        let node = TableExpr::SpatialJoin {
            left: Box::new(left),
            right: Box::new(right),
        };
        Some((node, rest))
    }

    fn table_union<'t>(&mut self, path: &str, input: Input<'t>) -> Parsed<'t, TableExpr> {
        let ((left, right), rest) = self.binary("union", path, input)?;
        let node = TableExpr::Union {
            left: Box::new(left),
            right: Box::new(right),
        };
        Some((node, rest))
    }

    fn table_product<'t>(&mut self, path: &str, input: Input<'t>) -> Parsed<'t, TableExpr> {
        let ((left, right), rest) = self.binary("product", path, input)?;
        let node = TableExpr::Product {
            left: Box::new(left),
            right: Box::new(right),
        };
        Some((node, rest))
    }

    fn table_proj<'t>(&mut self, path: &str, input: Input<'t>) -> Parsed<'t, TableExpr> {
        let rest = keyword(input, "proj")?;
        let rest = punct(rest, &TokenKind::LParen)?;
        let (table, rest) = self.exp_table(path, rest)?;
        let rest = punct(rest, &TokenKind::Comma)?;
        let rest = punct(rest, &TokenKind::LBracket)?;
        let (pairs, rest) = self.field_pairs(path, rest)?;
        let rest = punct(rest, &TokenKind::RBracket)?;
        let rest = punct(rest, &TokenKind::RParen)?;
        let node = TableExpr::Projection {
            input: Box::new(table),
            pairs,
        };
        Some((node, rest))
    }

    fn table_select<'t>(&mut self, path: &str, input: Input<'t>) -> Parsed<'t, TableExpr> {
        let rest = keyword(input, "select")?;
        let rest = punct(rest, &TokenKind::LParen)?;
        let (predicate, rest) = self.predicate(path, rest)?;
        let rest = punct(rest, &TokenKind::Comma)?;
        let (table, rest) = self.exp_table(path, rest)?;
        let rest = punct(rest, &TokenKind::RParen)?;
        let node = TableExpr::Selection {
            predicate,
            input: Box::new(table),
        };
        Some((node, rest))
    }

    fn field_pairs<'t>(&mut self, parent: &str, input: Input<'t>) -> Parsed<'t, Vec<(String, String)>> {
        let path = format!("{}/fieldPairs", parent);
        let longer = self.attempt(format!("{}:list", path), input, |p, path, input| {
            let (first, rest) = p.name_pair(path, input)?;
            let rest = punct(rest, &TokenKind::Comma)?;
            let (mut others, rest) = p.field_pairs(path, rest)?;
            others.insert(0, first);
            Some((others, rest))
        });
        if longer.is_some() {
            return longer;
        }
        self.attempt(format!("{}:single", path), input, |p, path, input| {
            let (pair, rest) = p.name_pair(path, input)?;
            Some((vec![pair], rest))
        })
    }

    fn name_pair<'t>(&mut self, parent: &str, input: Input<'t>) -> Parsed<'t, (String, String)> {
        self.attempt(format!("{}/namePair", parent), input, |_, _, input| {
            let (from, rest) = name(input)?;
            let rest = punct(rest, &TokenKind::Op(CmpOp::Gt))?;
            let (to, rest) = name(rest)?;
            Some(((from, to), rest))
        })
    }

    fn predicate<'t>(&mut self, parent: &str, input: Input<'t>) -> Parsed<'t, Predicate> {
        self.attempt(format!("{}/predicate", parent), input, |_, _, input| {
            let (field, rest) = name(input)?;
            let (op, rest) = match rest.split_first()? {
                (Token { kind: TokenKind::Op(op), .. }, rest) => (*op, rest),
                _ => return None,
            };
            let (operand, rest) = match rest.split_first()? {
                (Token { kind: TokenKind::Word(w), .. }, rest) => (Operand::Field(w.clone()), rest),
                (Token { kind: TokenKind::Str(s), .. }, rest) => (Operand::Const(Value::String(s.clone())), rest),
                (Token { kind: TokenKind::Number(n), .. }, rest) => (Operand::Const(n.clone()), rest),
                _ => return None,
            };
            Some((Predicate::new(field, op, operand), rest))
        })
    }
}

fn keyword<'t>(input: Input<'t>, kw: &str) -> Option<Input<'t>> {
    match input.split_first()? {
        (Token { kind: TokenKind::Word(w), .. }, rest) if w == kw => Some(rest),
        _ => None,
    }
}

fn punct<'t>(input: Input<'t>, expected: &TokenKind) -> Option<Input<'t>> {
    match input.split_first()? {
        (token, rest) if token.kind == *expected => Some(rest),
        _ => None,
    }
}

fn name(input: Input<'_>) -> Parsed<'_, String> {
    match input.split_first()? {
        (Token { kind: TokenKind::Word(w), .. }, rest) => Some((w.clone(), rest)),
        _ => None,
    }
}

fn join_name(input: Input<'_>) -> Parsed<'_, JoinType> {
    match input.split_first()? {
        (Token { kind: TokenKind::Word(w), .. }, rest) => Some((w.parse().ok()?, rest)),
        _ => None,
    }
}
