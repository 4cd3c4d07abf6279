//! Key-value metadata carried by scenes and layers.
//!
//! `Info` is a plain value type: it is cloned into derived scenes and
//! passed by reference to readers and composites. There is no shared
//! mutable metadata.

use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDateTime;

/// Well-known metadata keys.
pub mod keys {
    pub const PLATFORM: &str = "platform";
    pub const SENSOR: &str = "sensor";
    pub const START_TIME: &str = "start_time";
    pub const END_TIME: &str = "end_time";
    pub const CREATION_TIME: &str = "creation_time";
    pub const WISHLIST: &str = "wishlist";
}

/// A single metadata value.
#[derive(Debug, Clone, PartialEq)]
pub enum InfoValue {
    Text(String),
    Time(NaiveDateTime),
    Int(i64),
    Float(f64),
    Bool(bool),
    List(Vec<String>),
}

impl InfoValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            InfoValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_time(&self) -> Option<NaiveDateTime> {
        match self {
            InfoValue::Time(t) => Some(*t),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            InfoValue::Int(i) => Some(*i),
            _ => None,
        }
    }
}

impl fmt::Display for InfoValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InfoValue::Text(s) => write!(f, "{}", s),
            InfoValue::Time(t) => write!(f, "{}", t.format("%Y-%m-%dT%H:%M:%S")),
            InfoValue::Int(i) => write!(f, "{}", i),
            InfoValue::Float(x) => write!(f, "{}", x),
            InfoValue::Bool(b) => write!(f, "{}", b),
            InfoValue::List(items) => write!(f, "[{}]", items.join(", ")),
        }
    }
}

impl From<&str> for InfoValue {
    fn from(value: &str) -> Self {
        InfoValue::Text(value.to_string())
    }
}

impl From<String> for InfoValue {
    fn from(value: String) -> Self {
        InfoValue::Text(value)
    }
}

impl From<NaiveDateTime> for InfoValue {
    fn from(value: NaiveDateTime) -> Self {
        InfoValue::Time(value)
    }
}

impl From<i64> for InfoValue {
    fn from(value: i64) -> Self {
        InfoValue::Int(value)
    }
}

impl From<f64> for InfoValue {
    fn from(value: f64) -> Self {
        InfoValue::Float(value)
    }
}

impl From<bool> for InfoValue {
    fn from(value: bool) -> Self {
        InfoValue::Bool(value)
    }
}

impl From<Vec<String>> for InfoValue {
    fn from(value: Vec<String>) -> Self {
        InfoValue::List(value)
    }
}

/// Ordered metadata mapping.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Info {
    entries: BTreeMap<String, InfoValue>,
}

impl Info {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<InfoValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<InfoValue>) {
        self.entries.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&InfoValue> {
        self.entries.get(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<InfoValue> {
        self.entries.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Text value for `key`, if present and textual.
    pub fn text(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(InfoValue::as_text)
    }

    /// Time value for `key`, if present and a timestamp.
    pub fn time(&self, key: &str) -> Option<NaiveDateTime> {
        self.get(key).and_then(InfoValue::as_time)
    }

    /// A copy of this mapping without the given keys.
    pub fn without(&self, keys: &[&str]) -> Info {
        let mut copy = self.clone();
        for key in keys {
            copy.entries.remove(*key);
        }
        copy
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &InfoValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<InfoValue>> FromIterator<(K, V)> for Info {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut info = Info::new();
        for (key, value) in iter {
            info.insert(key, value);
        }
        info
    }
}
