//! Single comparisons of a field against a constant or another field.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::error::{AlgebraError, Result};
use crate::value::{compare, Tuple};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CmpOp {
    pub fn symbol(self) -> &'static str {
        match self {
            CmpOp::Eq => "=",
            CmpOp::Ne => "<>",
            CmpOp::Lt => "<",
            CmpOp::Le => "<=",
            CmpOp::Gt => ">",
            CmpOp::Ge => ">=",
        }
    }

    fn holds(self, ord: Ordering) -> bool {
        match self {
            CmpOp::Eq => ord == Ordering::Equal,
            CmpOp::Ne => ord != Ordering::Equal,
            CmpOp::Lt => ord == Ordering::Less,
            CmpOp::Le => ord != Ordering::Greater,
            CmpOp::Gt => ord == Ordering::Greater,
            CmpOp::Ge => ord != Ordering::Less,
        }
    }
}

impl FromStr for CmpOp {
    type Err = AlgebraError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "=" => Ok(CmpOp::Eq),
            "<>" | "!=" => Ok(CmpOp::Ne),
            "<" => Ok(CmpOp::Lt),
            "<=" => Ok(CmpOp::Le),
            ">" => Ok(CmpOp::Gt),
            ">=" => Ok(CmpOp::Ge),
            other => Err(AlgebraError::UnsupportedOperator(other.to_string())),
        }
    }
}

impl fmt::Display for CmpOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Right-hand side of a comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Operand {
    Field(String),
    Const(Value),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Predicate {
    pub field: String,
    pub op: CmpOp,
    pub rhs: Operand,
}

impl Predicate {
    pub fn new(field: impl Into<String>, op: CmpOp, rhs: Operand) -> Self {
        Self {
            field: field.into(),
            op,
            rhs,
        }
    }

    /// `field op constant`, with the operator given as text.
    pub fn constant(field: impl Into<String>, op: &str, value: impl Into<Value>) -> Result<Self> {
        Ok(Self::new(field, op.parse()?, Operand::Const(value.into())))
    }

    /// `field1 op field2`, with the operator given as text.
    pub fn fields_compare(field1: impl Into<String>, op: &str, field2: impl Into<String>) -> Result<Self> {
        Ok(Self::new(field1, op.parse()?, Operand::Field(field2.into())))
    }

    pub fn evaluate(&self, tuple: &Tuple) -> Result<bool> {
        let left = lookup(tuple, &self.field)?;
        let right = match &self.rhs {
            Operand::Field(name) => lookup(tuple, name)?,
            Operand::Const(value) => value,
        };
        Ok(self.op.holds(compare(left, right)))
    }

    /// The referenced field names: the left one, and the right one when the
    /// comparison is between two fields.
    pub fn fields(&self) -> (&str, Option<&str>) {
        let rhs = match &self.rhs {
            Operand::Field(name) => Some(name.as_str()),
            Operand::Const(_) => None,
        };
        (self.field.as_str(), rhs)
    }
}

fn lookup<'t>(tuple: &'t Tuple, field: &str) -> Result<&'t Value> {
    tuple
        .get(field)
        .ok_or_else(|| AlgebraError::MissingField(field.to_string()))
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.field, self.op)?;
        match &self.rhs {
            Operand::Field(name) => f.write_str(name),
            Operand::Const(value) => write!(f, "{}", value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tuple(v: Value) -> Tuple {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn test_constant_comparisons() {
        let t = tuple(json!({"pop": 1500, "name": "Lyon"}));
        assert!(Predicate::constant("pop", ">", 1000).unwrap().evaluate(&t).unwrap());
        assert!(Predicate::constant("pop", "<=", "1500").unwrap().evaluate(&t).unwrap());
        assert!(Predicate::constant("name", "=", "Lyon").unwrap().evaluate(&t).unwrap());
        assert!(Predicate::constant("name", "<>", "Paris").unwrap().evaluate(&t).unwrap());
        assert!(!Predicate::constant("name", ">", "M").unwrap().evaluate(&t).unwrap());
    }

    #[test]
    fn test_field_comparison() {
        let t = tuple(json!({"a": "x", "b": "x", "c": 3}));
        assert!(Predicate::fields_compare("a", "=", "b").unwrap().evaluate(&t).unwrap());
        assert!(!Predicate::fields_compare("a", "=", "c").unwrap().evaluate(&t).unwrap());
    }

    #[test]
    fn test_missing_field_is_an_error() {
        let t = tuple(json!({"a": 1}));
        let err = Predicate::constant("zz", "=", 1).unwrap().evaluate(&t).unwrap_err();
        assert_eq!(err, AlgebraError::MissingField("zz".to_string()));
        let err = Predicate::fields_compare("a", "=", "b").unwrap().evaluate(&t).unwrap_err();
        assert_eq!(err, AlgebraError::MissingField("b".to_string()));
    }

    #[test]
    fn test_unsupported_operator() {
        let err = Predicate::constant("a", "like", "x").unwrap_err();
        assert_eq!(err, AlgebraError::UnsupportedOperator("like".to_string()));
    }

    #[test]
    fn test_display() {
        assert_eq!(Predicate::constant("name", "=", "Paris").unwrap().to_string(), "name=\"Paris\"");
        assert_eq!(Predicate::constant("pop", ">=", 3).unwrap().to_string(), "pop>=3");
        assert_eq!(Predicate::fields_compare("f", "!=", "g").unwrap().to_string(), "f<>g");
    }
}
