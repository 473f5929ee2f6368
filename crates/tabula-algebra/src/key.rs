//! Row keys and the composite-key codec used by binary operators.
//!
//! A composite key is the JSON array `[k1,k2]` stored as a `Name` key. JSON
//! string escaping keeps the encoding injective, so either side may itself
//! be a composite key and still decode to exactly the pair that built it.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::error::{AlgebraError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Key {
    /// Position in a list collection.
    Index(u64),
    Name(String),
}

impl Key {
    /// The placeholder key used for the missing side of unmatched join rows.
    pub fn empty() -> Self {
        Key::Name(String::new())
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Key::Name(name) if name.is_empty())
    }

    fn to_json(&self) -> Value {
        match self {
            Key::Index(i) => Value::from(*i),
            Key::Name(name) => Value::String(name.clone()),
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Index(i) => write!(f, "{}", i),
            Key::Name(name) => f.write_str(name),
        }
    }
}

impl From<u64> for Key {
    fn from(i: u64) -> Self {
        Key::Index(i)
    }
}

impl From<usize> for Key {
    fn from(i: usize) -> Self {
        Key::Index(i as u64)
    }
}

impl From<&str> for Key {
    fn from(name: &str) -> Self {
        Key::Name(name.to_string())
    }
}

impl From<String> for Key {
    fn from(name: String) -> Self {
        Key::Name(name)
    }
}

/// Build the composite key for a pair of operand keys.
pub fn concat(k1: &Key, k2: &Key) -> Key {
    Key::Name(Value::Array(vec![k1.to_json(), k2.to_json()]).to_string())
}

/// Split a composite key back into the two keys it was built from.
pub fn decat(key: &Key) -> Result<(Key, Key)> {
    match key {
        Key::Name(encoded) => serde_json::from_str::<(Key, Key)>(encoded)
            .map_err(|e| AlgebraError::MalformedKey(format!("{}: {}", encoded, e))),
        Key::Index(i) => Err(AlgebraError::MalformedKey(i.to_string())),
    }
}
