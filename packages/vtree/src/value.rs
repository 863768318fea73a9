//! Attribute values.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The value of an element attribute.
///
/// Attributes in the DOM are strings, but trees are easier to build with
/// typed values. Booleans follow HTML presence semantics: `true` renders as
/// an empty attribute, `false` removes it.
///
/// Floats compare by bit pattern, so `NaN` equals itself and `0.0` differs
/// from `-0.0`, matching the strings they render to.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttrValue {
    /// Present or absent.
    Bool(bool),
    /// Signed 64-bit integer.
    Integer(i64),
    /// 64-bit floating point.
    Float(f64),
    /// UTF-8 string.
    String(String),
}

impl AttrValue {
    /// The string written to the DOM, or `None` when the attribute should
    /// not be present.
    ///
    /// ```rust
    /// use cycle_vtree::AttrValue;
    ///
    /// assert_eq!(AttrValue::from(true).to_attribute_string(), Some(String::new()));
    /// assert_eq!(AttrValue::from(false).to_attribute_string(), None);
    /// assert_eq!(AttrValue::from(3).to_attribute_string(), Some("3".to_string()));
    /// ```
    pub fn to_attribute_string(&self) -> Option<String> {
        match self {
            AttrValue::Bool(true) => Some(String::new()),
            AttrValue::Bool(false) => None,
            AttrValue::Integer(i) => Some(i.to_string()),
            AttrValue::Float(f) => Some(f.to_string()),
            AttrValue::String(s) => Some(s.clone()),
        }
    }

    /// Borrow the string, if this is a string value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttrValue::String(s) => Some(s),
            _ => None,
        }
    }
}

impl PartialEq for AttrValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (AttrValue::Bool(a), AttrValue::Bool(b)) => a == b,
            (AttrValue::Integer(a), AttrValue::Integer(b)) => a == b,
            (AttrValue::Float(a), AttrValue::Float(b)) => a.to_bits() == b.to_bits(),
            (AttrValue::String(a), AttrValue::String(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for AttrValue {}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttrValue::Bool(b) => write!(f, "{}", b),
            AttrValue::Integer(i) => write!(f, "{}", i),
            AttrValue::Float(x) => write!(f, "{}", x),
            AttrValue::String(s) => f.write_str(s),
        }
    }
}

impl From<bool> for AttrValue {
    fn from(b: bool) -> Self {
        AttrValue::Bool(b)
    }
}

impl From<i64> for AttrValue {
    fn from(i: i64) -> Self {
        AttrValue::Integer(i)
    }
}

impl From<i32> for AttrValue {
    fn from(i: i32) -> Self {
        AttrValue::Integer(i as i64)
    }
}

impl From<usize> for AttrValue {
    fn from(i: usize) -> Self {
        AttrValue::Integer(i as i64)
    }
}

impl From<f64> for AttrValue {
    fn from(f: f64) -> Self {
        AttrValue::Float(f)
    }
}

impl From<String> for AttrValue {
    fn from(s: String) -> Self {
        AttrValue::String(s)
    }
}

impl From<&str> for AttrValue {
    fn from(s: &str) -> Self {
        AttrValue::String(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conversions() {
        assert_eq!(AttrValue::from(1i32), AttrValue::Integer(1));
        assert_eq!(AttrValue::from("x"), AttrValue::String("x".into()));
        assert_eq!(AttrValue::from(1.5), AttrValue::Float(1.5));
    }

    #[test]
    fn display_and_as_str() {
        assert_eq!(AttrValue::from("text").to_string(), "text");
        assert_eq!(AttrValue::from(false).to_string(), "false");
        assert_eq!(AttrValue::from("a").as_str(), Some("a"));
        assert_eq!(AttrValue::from(2).as_str(), None);
    }

    #[test]
    fn serializes_untagged() {
        let json = serde_json::to_string(&vec![
            AttrValue::from(true),
            AttrValue::from(2),
            AttrValue::from("s"),
        ])
        .unwrap();
        assert_eq!(json, r#"[true,2,"s"]"#);
    }
}
