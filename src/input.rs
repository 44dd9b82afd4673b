//! Loosely-typed request records and best-effort coercion.
//!
//! Clients send whatever JSON they have: numbers as strings, booleans where
//! integers are expected, answers in any casing. Every read goes through
//! [`Field`], which keeps "absent" apart from "present but unusable" so the
//! caller can decide whether a default is acceptable.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// An unordered bag of client-supplied fields.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InputRecord {
    fields: Map<String, Value>,
}

impl InputRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps a JSON body. Returns `None` for anything that is not an object.
    pub fn from_json(value: Value) -> Option<Self> {
        match value {
            Value::Object(fields) => Some(Self { fields }),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Raw value for a field; JSON `null` counts as absent.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name).filter(|v| !v.is_null())
    }

    /// Reads a field as a float.
    ///
    /// Accepts JSON numbers, booleans and numeric strings (surrounding
    /// whitespace ignored).
    pub fn float(&self, name: &str) -> Field<f64> {
        let Some(value) = self.get(name) else {
            return Field::Absent;
        };
        match value {
            Value::Number(n) => n
                .as_f64()
                .map(Field::Valid)
                .unwrap_or_else(|| Field::invalid(value, "number out of range")),
            Value::Bool(b) => Field::Valid(if *b { 1.0 } else { 0.0 }),
            Value::String(s) => s
                .trim()
                .parse::<f64>()
                .map(Field::Valid)
                .unwrap_or_else(|_| Field::invalid(value, "not a number")),
            _ => Field::invalid(value, "expected a number"),
        }
    }

    /// Reads a field as an integer.
    ///
    /// Floats are truncated toward zero. Strings must hold an integer
    /// literal: `"36.6"` is rejected rather than rounded.
    pub fn integer(&self, name: &str) -> Field<i64> {
        let Some(value) = self.get(name) else {
            return Field::Absent;
        };
        match value {
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Field::Valid(i)
                } else {
                    match n.as_f64() {
                        Some(f) if f.is_finite() && f.abs() < i64::MAX as f64 => {
                            Field::Valid(f.trunc() as i64)
                        }
                        _ => Field::invalid(value, "integer out of range"),
                    }
                }
            }
            Value::Bool(b) => Field::Valid(i64::from(*b)),
            Value::String(s) => s
                .trim()
                .parse::<i64>()
                .map(Field::Valid)
                .unwrap_or_else(|_| Field::invalid(value, "not an integer")),
            _ => Field::invalid(value, "expected an integer"),
        }
    }

    /// Reads a textual answer, lower-cased for comparison.
    pub fn text(&self, name: &str) -> Field<String> {
        match self.get(name) {
            None => Field::Absent,
            Some(Value::String(s)) => Field::Valid(s.to_lowercase()),
            Some(other) => Field::invalid(other, "expected a string"),
        }
    }
}

impl From<Map<String, Value>> for InputRecord {
    fn from(fields: Map<String, Value>) -> Self {
        Self { fields }
    }
}

/// Outcome of reading one field from an [`InputRecord`].
#[derive(Debug, Clone, PartialEq)]
pub enum Field<T> {
    /// Present and usable.
    Valid(T),
    /// Present but could not be coerced.
    Invalid { raw: String, reason: &'static str },
    /// Missing or `null`.
    Absent,
}

impl<T> Field<T> {
    fn invalid(raw: &Value, reason: &'static str) -> Self {
        Field::Invalid {
            raw: raw.to_string(),
            reason,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Field<U> {
        match self {
            Field::Valid(v) => Field::Valid(f(v)),
            Field::Invalid { raw, reason } => Field::Invalid { raw, reason },
            Field::Absent => Field::Absent,
        }
    }
}

/// A field that was present but had to be replaced by its default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldIssue {
    pub field: String,
    pub reason: String,
}

/// Case-insensitive mapping from a categorical answer to its ordinal code.
#[derive(Debug)]
pub struct Ordinal {
    pub levels: &'static [(&'static str, u8)],
    /// Code used when the answer is absent or matches no level.
    pub default: u8,
}

impl Ordinal {
    /// Looks up an already lower-cased answer.
    pub fn code(&self, answer: &str) -> Option<u8> {
        self.levels
            .iter()
            .find(|(label, _)| *label == answer)
            .map(|(_, code)| *code)
    }
}

/// Reads fields off a record, substituting defaults and remembering every
/// present value that had to be discarded.
pub struct Coercer<'a> {
    record: &'a InputRecord,
    issues: Vec<FieldIssue>,
}

impl<'a> Coercer<'a> {
    pub fn new(record: &'a InputRecord) -> Self {
        Self {
            record,
            issues: Vec::new(),
        }
    }

    /// Float field defaulting to `0.0`.
    pub fn float(&mut self, name: &str) -> f64 {
        let field = self.record.float(name);
        self.settle(name, field, 0.0)
    }

    /// Integer field defaulting to `0`.
    pub fn integer(&mut self, name: &str) -> f64 {
        let field = self.record.integer(name);
        self.settle(name, field, 0) as f64
    }

    /// `1.0` when the answer equals `literal` (case-insensitive), else `0.0`.
    pub fn flag(&mut self, name: &str, literal: &str) -> f64 {
        let field = self.record.text(name).map(|answer| answer == literal);
        if self.settle(name, field, false) {
            1.0
        } else {
            0.0
        }
    }

    /// Ordinal code for a categorical answer.
    pub fn ordinal(&mut self, name: &str, table: &Ordinal) -> f64 {
        let field = match self.record.text(name) {
            Field::Valid(answer) => match table.code(&answer) {
                Some(code) => Field::Valid(code),
                None => Field::Invalid {
                    raw: format!("\"{}\"", answer),
                    reason: "unrecognised category",
                },
            },
            Field::Invalid { raw, reason } => Field::Invalid { raw, reason },
            Field::Absent => Field::Absent,
        };
        f64::from(self.settle(name, field, table.default))
    }

    fn settle<T>(&mut self, name: &str, field: Field<T>, default: T) -> T {
        match field {
            Field::Valid(v) => v,
            Field::Absent => default,
            Field::Invalid { raw, reason } => {
                self.issues.push(FieldIssue {
                    field: name.to_string(),
                    reason: format!("{}: {}", reason, raw),
                });
                default
            }
        }
    }

    /// Issues collected so far, in read order.
    pub fn finish(self) -> Vec<FieldIssue> {
        self.issues
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> InputRecord {
        InputRecord::from_json(value).unwrap()
    }

    #[test]
    fn test_float_accepts_strings_and_booleans() {
        let r = record(json!({"a": " 3.5 ", "b": true, "c": 7, "d": "x", "e": null}));
        assert_eq!(r.float("a"), Field::Valid(3.5));
        assert_eq!(r.float("b"), Field::Valid(1.0));
        assert_eq!(r.float("c"), Field::Valid(7.0));
        assert!(matches!(r.float("d"), Field::Invalid { .. }));
        assert_eq!(r.float("e"), Field::Absent);
        assert_eq!(r.float("missing"), Field::Absent);
    }

    #[test]
    fn test_integer_truncates_floats_but_not_decimal_strings() {
        let r = record(json!({"t": 36.9, "n": -2.5, "s": "12", "d": "36.6", "b": false}));
        assert_eq!(r.integer("t"), Field::Valid(36));
        assert_eq!(r.integer("n"), Field::Valid(-2));
        assert_eq!(r.integer("s"), Field::Valid(12));
        assert!(matches!(r.integer("d"), Field::Invalid { .. }));
        assert_eq!(r.integer("b"), Field::Valid(0));
    }

    #[test]
    fn test_text_lowercases_and_rejects_non_strings() {
        let r = record(json!({"sex": "MALE", "htn": 1}));
        assert_eq!(r.text("sex"), Field::Valid("male".to_string()));
        assert!(matches!(r.text("htn"), Field::Invalid { .. }));
    }

    #[test]
    fn test_coercer_records_only_present_invalid_fields() {
        let r = record(json!({"age": "old", "sex": "Male", "bp": [1]}));
        let mut c = Coercer::new(&r);
        assert_eq!(c.float("age"), 0.0);
        assert_eq!(c.flag("sex", "male"), 1.0);
        assert_eq!(c.integer("bp"), 0.0);
        assert_eq!(c.float("absent"), 0.0);

        let issues = c.finish();
        let names: Vec<&str> = issues.iter().map(|i| i.field.as_str()).collect();
        assert_eq!(names, vec!["age", "bp"]);
    }

    #[test]
    fn test_ordinal_falls_back_to_default() {
        static LEVELS: Ordinal = Ordinal {
            levels: &[("low", 1), ("high", 3)],
            default: 2,
        };
        let r = record(json!({"a": "HIGH", "b": "huge"}));
        let mut c = Coercer::new(&r);
        assert_eq!(c.ordinal("a", &LEVELS), 3.0);
        assert_eq!(c.ordinal("b", &LEVELS), 2.0);
        assert_eq!(c.ordinal("c", &LEVELS), 2.0);
        assert_eq!(c.finish().len(), 1);
    }
}
