//! ABOUTME: ValueBag - a dynamically-typed key/value map with typed accessors
//! ABOUTME: Round-trips losslessly to JSON for the supported value kinds

use serde::{Deserialize, Serialize};
use serde_json::Value as Json;
use std::collections::HashMap;

/// A tagged value stored in a [`ValueBag`].
///
/// Deliberately *not* a string-to-string map: the JSON round-trip property
/// (spec §8 property 8) requires preserving the original kind, so an `Int`
/// stays distinguishable from a `String` that happens to look numeric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    String(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    List(Vec<String>),
    Bag(ValueBag),
}

impl Value {
    fn as_string_coerced(&self) -> Option<String> {
        match self {
            Value::String(s) => Some(s.clone()),
            Value::Int(i) => Some(i.to_string()),
            Value::Float(f) => Some(format!("{f}")),
            Value::Bool(b) => Some(if *b { "true".into() } else { "false".into() }),
            _ => None,
        }
    }

    fn as_int_coerced(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            Value::Float(f) if f.fract() == 0.0 => Some(*f as i64),
            _ => None,
        }
    }

    fn as_float_coerced(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    fn as_bool_coerced(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    fn as_list_coerced(&self) -> Option<Vec<String>> {
        match self {
            Value::List(l) => Some(l.clone()),
            _ => None,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}
impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}
impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}
impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}
impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}
impl From<Vec<String>> for Value {
    fn from(l: Vec<String>) -> Self {
        Value::List(l)
    }
}
impl From<ValueBag> for Value {
    fn from(b: ValueBag) -> Self {
        Value::Bag(b)
    }
}

/// Mapping from string keys to tagged [`Value`]s.
///
/// Insertion order is irrelevant for equality; duplicate `set` replaces the
/// prior value. Typed getters never panic or error — an absent key or a
/// kind mismatch both fall back to the caller-supplied default.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValueBag {
    entries: HashMap<String, Value>,
}

impl ValueBag {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.entries.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn has(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    #[must_use]
    pub fn get_raw(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    #[must_use]
    pub fn get_string(&self, key: &str, default: &str) -> String {
        self.entries
            .get(key)
            .and_then(Value::as_string_coerced)
            .unwrap_or_else(|| default.to_string())
    }

    #[must_use]
    pub fn get_int(&self, key: &str, default: i64) -> i64 {
        self.entries
            .get(key)
            .and_then(Value::as_int_coerced)
            .unwrap_or(default)
    }

    #[must_use]
    pub fn get_float(&self, key: &str, default: f64) -> f64 {
        self.entries
            .get(key)
            .and_then(Value::as_float_coerced)
            .unwrap_or(default)
    }

    #[must_use]
    pub fn get_bool(&self, key: &str, default: bool) -> bool {
        self.entries
            .get(key)
            .and_then(Value::as_bool_coerced)
            .unwrap_or(default)
    }

    #[must_use]
    pub fn get_list(&self, key: &str, default: Vec<String>) -> Vec<String> {
        self.entries
            .get(key)
            .and_then(Value::as_list_coerced)
            .unwrap_or(default)
    }

    #[must_use]
    pub fn get_bag(&self, key: &str) -> Option<&ValueBag> {
        match self.entries.get(key) {
            Some(Value::Bag(b)) => Some(b),
            _ => None,
        }
    }

    /// Merge `other` into a copy of `self`, with `other`'s keys taking
    /// precedence on conflict. Used to compose `global_context ∪
    /// input_context` and `context ∪ step.parameters` per spec §4.4.
    #[must_use]
    pub fn merged_over(&self, other: &ValueBag) -> ValueBag {
        let mut out = self.clone();
        for (k, v) in &other.entries {
            out.entries.insert(k.clone(), v.clone());
        }
        out
    }

    /// Serialize to JSON, recursing into nested bags.
    ///
    /// # Panics
    /// Never panics for the supported value kinds; `serde_json` only fails
    /// on non-finite floats, which cannot occur via the typed setters above.
    #[must_use]
    pub fn to_json(&self) -> Json {
        serde_json::to_value(self).unwrap_or(Json::Null)
    }

    /// Deserialize from JSON produced by [`ValueBag::to_json`].
    ///
    /// # Errors
    /// Returns an error string if `j` is not an object matching the
    /// `ValueBag` shape.
    pub fn from_json(j: &Json) -> std::result::Result<ValueBag, String> {
        serde_json::from_value(j.clone()).map_err(|e| e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typed_getters_fall_back_on_missing_key() {
        let bag = ValueBag::new();
        assert_eq!(bag.get_string("x", "default"), "default");
        assert_eq!(bag.get_int("x", 42), 42);
        assert!(!bag.get_bool("x", false));
        assert_eq!(bag.get_list("x", vec!["a".into()]), vec!["a".to_string()]);
    }

    #[test]
    fn typed_getters_fall_back_on_kind_mismatch() {
        let mut bag = ValueBag::new();
        bag.set("k", "not a number");
        assert_eq!(bag.get_int("k", 7), 7);
    }

    #[test]
    fn numeric_and_bool_coerce_to_string() {
        let mut bag = ValueBag::new();
        bag.set("i", 10_i64);
        bag.set("f", 1.5_f64);
        bag.set("b", true);
        assert_eq!(bag.get_string("i", ""), "10");
        assert_eq!(bag.get_string("f", ""), "1.5");
        assert_eq!(bag.get_string("b", ""), "true");
    }

    #[test]
    fn int_coerces_from_whole_float() {
        let mut bag = ValueBag::new();
        bag.set("f", 4.0_f64);
        assert_eq!(bag.get_int("f", -1), 4);
    }

    #[test]
    fn duplicate_set_replaces() {
        let mut bag = ValueBag::new();
        bag.set("k", "first");
        bag.set("k", "second");
        assert_eq!(bag.get_string("k", ""), "second");
    }

    #[test]
    fn merged_over_prefers_other() {
        let mut base = ValueBag::new();
        base.set("a", "base-a");
        base.set("b", "base-b");
        let mut other = ValueBag::new();
        other.set("b", "other-b");
        other.set("c", "other-c");

        let merged = base.merged_over(&other);
        assert_eq!(merged.get_string("a", ""), "base-a");
        assert_eq!(merged.get_string("b", ""), "other-b");
        assert_eq!(merged.get_string("c", ""), "other-c");
    }

    #[test]
    fn json_round_trip_preserves_kinds() {
        let mut nested = ValueBag::new();
        nested.set("inner", 3_i64);

        let mut bag = ValueBag::new();
        bag.set("s", "hello");
        bag.set("i", 5_i64);
        bag.set("f", 2.5_f64);
        bag.set("b", true);
        bag.set("l", vec!["x".to_string(), "y".to_string()]);
        bag.set("n", nested);

        let json = bag.to_json();
        let round_tripped = ValueBag::from_json(&json).expect("valid json");
        assert_eq!(bag, round_tripped);
    }

    #[test]
    fn from_json_rejects_malformed_shape() {
        let bad = serde_json::json!("not an object");
        assert!(ValueBag::from_json(&bad).is_err());
    }
}
