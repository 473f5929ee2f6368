//! Simplified property types and the schema merge used by products and joins.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use crate::error::{AlgebraError, Result};
use crate::value::Tuple;

/// Simplified type tag of a property, rendered as `string`, `enum(a,b)`,
/// `array(integer)`, `GeoJSON(Point)` and so on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum PropType {
    String,
    Number,
    Integer,
    Boolean,
    Enum(Vec<String>),
    Array(Box<PropType>),
    Object(Vec<(String, PropType)>),
    GeoJson(String),
    Unknown,
}

/// Property name to type tag, in declaration order.
pub type Properties = IndexMap<String, PropType>;

impl PropType {
    /// Type tag of a single value.
    pub fn of(value: &Value) -> PropType {
        match value {
            Value::Null => PropType::Unknown,
            Value::Bool(_) => PropType::Boolean,
            Value::Number(n) if n.is_i64() || n.is_u64() => PropType::Integer,
            Value::Number(_) => PropType::Number,
            Value::String(_) => PropType::String,
            Value::Array(items) => PropType::Array(Box::new(
                items.first().map(PropType::of).unwrap_or(PropType::Unknown),
            )),
            Value::Object(map) => match map.get("type").and_then(Value::as_str) {
                Some(geometry) if map.contains_key("coordinates") || map.contains_key("geometries") => {
                    PropType::GeoJson(geometry.to_string())
                }
                _ => PropType::Object(
                    map.iter().map(|(k, v)| (k.clone(), PropType::of(v))).collect(),
                ),
            },
        }
    }
}

/// Infer a property map from a sample of tuples: union of field names, the
/// first non-null value of each field decides its tag.
pub fn infer_properties<'a>(tuples: impl IntoIterator<Item = &'a Tuple>) -> Properties {
    let mut properties = Properties::new();
    for tuple in tuples {
        for (name, value) in tuple {
            let tag = PropType::of(value);
            match properties.get_mut(name) {
                Some(existing) if *existing == PropType::Unknown => *existing = tag,
                Some(_) => {}
                None => {
                    properties.insert(name.clone(), tag);
                }
            }
        }
    }
    properties
}

impl fmt::Display for PropType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropType::String => f.write_str("string"),
            PropType::Number => f.write_str("number"),
            PropType::Integer => f.write_str("integer"),
            PropType::Boolean => f.write_str("boolean"),
            PropType::Unknown => f.write_str("unknown"),
            PropType::Enum(values) => write!(f, "enum({})", values.join(",")),
            PropType::Array(item) => write!(f, "array({})", item),
            PropType::GeoJson(geometry) => write!(f, "GeoJSON({})", geometry),
            PropType::Object(fields) => {
                f.write_str("object(")?;
                for (i, (name, tag)) in fields.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{}:{}", name, tag)?;
                }
                f.write_str(")")
            }
        }
    }
}

impl FromStr for PropType {
    type Err = AlgebraError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let invalid = || AlgebraError::InvalidTypeTag(s.to_string());

        let Some(open) = s.find('(') else {
            return match s {
                "string" => Ok(PropType::String),
                "number" => Ok(PropType::Number),
                "integer" => Ok(PropType::Integer),
                "boolean" => Ok(PropType::Boolean),
                "unknown" => Ok(PropType::Unknown),
                _ => Err(invalid()),
            };
        };
        let inner = s[open + 1..].strip_suffix(')').ok_or_else(invalid)?;
        match &s[..open] {
            "enum" => Ok(PropType::Enum(
                split_top_level(inner).into_iter().map(str::to_string).collect(),
            )),
            "array" => Ok(PropType::Array(Box::new(inner.parse()?))),
            "GeoJSON" => Ok(PropType::GeoJson(inner.trim().to_string())),
            "object" => split_top_level(inner)
                .into_iter()
                .map(|field| {
                    let (name, tag) = field.split_once(':').ok_or_else(invalid)?;
                    Ok((name.trim().to_string(), tag.parse()?))
                })
                .collect::<Result<Vec<_>>>()
                .map(PropType::Object),
            _ => Err(invalid()),
        }
    }
}

/// Split on commas that are not nested inside parentheses.
fn split_top_level(s: &str) -> Vec<&str> {
    if s.trim().is_empty() {
        return Vec::new();
    }
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, c) in s.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(s[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(s[start..].trim());
    parts
}

impl From<PropType> for String {
    fn from(tag: PropType) -> String {
        tag.to_string()
    }
}

impl TryFrom<String> for PropType {
    type Error = AlgebraError;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

/// Which operand of a binary operator a merged property comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    S1,
    S2,
}

impl Side {
    pub fn tag(self) -> &'static str {
        match self {
            Side::S1 => "s1",
            Side::S2 => "s2",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MergedProperty {
    pub prop_type: PropType,
    pub original_name: String,
    pub source: Side,
}

/// Merged property map of two operands. Colliding names are prefixed with
/// the source tag (`s1_code`, `s2_code`); other names are kept as is.
///
/// Built once per operator and reused for every row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductProperties {
    entries: IndexMap<String, MergedProperty>,
}

impl ProductProperties {
    /// Merge any number of operand maps. Only two are supported.
    pub fn from_sources(sources: &[&Properties]) -> Result<Self> {
        match sources {
            [p1, p2] => Ok(Self::merge(p1, p2)),
            _ => Err(AlgebraError::NotImplemented(format!(
                "product of {} collections",
                sources.len()
            ))),
        }
    }

    pub fn merge(p1: &Properties, p2: &Properties) -> Self {
        let mut entries = IndexMap::new();
        for (side, own, other) in [(Side::S1, p1, p2), (Side::S2, p2, p1)] {
            for (name, tag) in own {
                let output = if other.contains_key(name) {
                    format!("{}_{}", side.tag(), name)
                } else {
                    name.clone()
                };
                entries.insert(
                    output,
                    MergedProperty {
                        prop_type: tag.clone(),
                        original_name: name.clone(),
                        source: side,
                    },
                );
            }
        }
        Self { entries }
    }

    pub fn properties(&self) -> Properties {
        self.entries
            .iter()
            .map(|(name, entry)| (name.clone(), entry.prop_type.clone()))
            .collect()
    }

    /// Provenance of an output name.
    pub fn resolve(&self, name: &str) -> Option<&MergedProperty> {
        self.entries.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &MergedProperty)> {
        self.entries.iter()
    }

    /// Build the output tuple. Values absent from their source tuple, or a
    /// missing second tuple, become `null`.
    pub fn merge_tuples(&self, t1: &Tuple, t2: Option<&Tuple>) -> Tuple {
        self.entries
            .iter()
            .map(|(name, entry)| {
                let source = match entry.source {
                    Side::S1 => Some(t1),
                    Side::S2 => t2,
                };
                let value = source
                    .and_then(|t| t.get(&entry.original_name))
                    .cloned()
                    .unwrap_or(Value::Null);
                (name.clone(), value)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn props(entries: &[(&str, PropType)]) -> Properties {
        entries.iter().map(|(n, t)| (n.to_string(), t.clone())).collect()
    }

    #[test]
    fn test_collision_renames_both_sides() {
        let p1 = props(&[("x", PropType::String), ("a", PropType::Integer)]);
        let p2 = props(&[("x", PropType::Number), ("b", PropType::Boolean)]);
        let merged = ProductProperties::merge(&p1, &p2);

        let names: Vec<_> = merged.properties().keys().cloned().collect();
        assert_eq!(names, vec!["s1_x", "a", "s2_x", "b"]);
        assert_eq!(merged.properties()["s1_x"], PropType::String);
        assert_eq!(merged.properties()["s2_x"], PropType::Number);

        let entry = merged.resolve("s2_x").unwrap();
        assert_eq!(entry.original_name, "x");
        assert_eq!(entry.source, Side::S2);

        let sources: Vec<_> = merged.iter().map(|(name, e)| (name.as_str(), e.source)).collect();
        assert_eq!(
            sources,
            vec![("s1_x", Side::S1), ("a", Side::S1), ("s2_x", Side::S2), ("b", Side::S2)]
        );
    }

    #[test]
    fn test_disjoint_names_unchanged() {
        let p1 = props(&[("f", PropType::String)]);
        let p2 = props(&[("g", PropType::String)]);
        let merged = ProductProperties::merge(&p1, &p2);
        assert_eq!(merged.properties(), props(&[("f", PropType::String), ("g", PropType::String)]));
    }

    #[test]
    fn test_multiway_not_implemented() {
        let p = Properties::new();
        assert!(matches!(
            ProductProperties::from_sources(&[&p, &p, &p]),
            Err(AlgebraError::NotImplemented(_))
        ));
    }

    #[test]
    fn test_merge_tuples_with_missing_side() {
        let p1 = props(&[("x", PropType::String), ("a", PropType::Integer)]);
        let p2 = props(&[("x", PropType::String)]);
        let merged = ProductProperties::merge(&p1, &p2);
        let t1 = json!({"x": "one", "a": 1}).as_object().cloned().unwrap();
        let out = merged.merge_tuples(&t1, None);
        assert_eq!(Value::Object(out), json!({"s1_x": "one", "a": 1, "s2_x": null}));
    }

    #[test]
    fn test_tag_roundtrip() {
        for tag in ["string", "enum(a,b)", "array(integer)", "object(a:string,b:array(number))", "GeoJSON(Point)"] {
            assert_eq!(tag.parse::<PropType>().unwrap().to_string(), tag);
        }
        assert!("frob".parse::<PropType>().is_err());
    }

    #[test]
    fn test_infer() {
        let rows = [
            json!({"name": "a", "pop": null}).as_object().cloned().unwrap(),
            json!({"pop": 12, "geom": {"type": "Point", "coordinates": [1.0, 2.0]}}).as_object().cloned().unwrap(),
        ];
        let inferred = infer_properties(rows.iter());
        assert_eq!(inferred["name"], PropType::String);
        assert_eq!(inferred["pop"], PropType::Integer);
        assert_eq!(inferred["geom"], PropType::GeoJson("Point".to_string()));
    }
}
