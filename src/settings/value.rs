//! The dynamic value model for settings.
//!
//! Fields hold a [`Value`]: a nil-able scalar, a list, or a nested
//! configurable instance. `Nil` is a first-class value, distinct from a
//! field that was never set. TOML is the interchange format for
//! `to_table`/`from_table`; since TOML has no null, `Nil` surfaces there
//! as omission.

use std::fmt;

use super::instance::Configurable;

/// A value held by a single setting.
#[derive(Debug, Clone)]
pub enum Value {
    Nil,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Value>),
    Nested(Configurable),
}

impl Value {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_nested(&self) -> Option<&Configurable> {
        match self {
            Value::Nested(cfg) => Some(cfg),
            _ => None,
        }
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    /// Clones the value without sharing structure.
    ///
    /// A plain `clone` of a `Nested` value yields another handle to the
    /// same instance; `deep_clone` constructs a fresh instance graph, so
    /// copies are value-equal but reference-distinct.
    pub fn deep_clone(&self) -> Value {
        match self {
            Value::List(items) => Value::List(items.iter().map(Value::deep_clone).collect()),
            Value::Nested(cfg) => Value::Nested(cfg.deep_clone()),
            other => other.clone(),
        }
    }

    /// Converts to a TOML value, or `None` for values TOML cannot
    /// represent (`Nil`, and list elements thereof).
    pub(crate) fn to_toml(&self) -> Option<toml::Value> {
        match self {
            Value::Nil => None,
            Value::Bool(b) => Some(toml::Value::Boolean(*b)),
            Value::Int(i) => Some(toml::Value::Integer(*i)),
            Value::Float(f) => Some(toml::Value::Float(*f)),
            Value::Str(s) => Some(toml::Value::String(s.clone())),
            Value::List(items) => Some(toml::Value::Array(
                items.iter().filter_map(Value::to_toml).collect(),
            )),
            Value::Nested(cfg) => Some(toml::Value::Table(cfg.to_table())),
        }
    }

    /// Converts from a scalar or array TOML value.
    ///
    /// Tables are handled structurally by `from_table` (they recurse into
    /// nested instances) and have no standalone `Value` form.
    pub(crate) fn from_toml(value: toml::Value) -> Option<Value> {
        match value {
            toml::Value::Boolean(b) => Some(Value::Bool(b)),
            toml::Value::Integer(i) => Some(Value::Int(i)),
            toml::Value::Float(f) => Some(Value::Float(f)),
            toml::Value::String(s) => Some(Value::Str(s)),
            toml::Value::Datetime(dt) => Some(Value::Str(dt.to_string())),
            toml::Value::Array(items) => Some(Value::List(
                items.into_iter().filter_map(Value::from_toml).collect(),
            )),
            toml::Value::Table(_) => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Nested(a), Value::Nested(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "nil"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Str(s) => write!(f, "{s:?}"),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            Value::Nested(cfg) => write!(f, "{cfg:?}"),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Value {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Value {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Value {
        Value::Int(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Value {
        Value::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Value {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Value {
        Value::Str(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Value {
        Value::List(items)
    }
}

impl From<Configurable> for Value {
    fn from(cfg: Configurable) -> Value {
        Value::Nested(cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nil_is_not_absence_of_value() {
        assert_eq!(Value::Nil, Value::Nil);
        assert_ne!(Value::Nil, Value::Bool(false));
        assert_ne!(Value::Nil, Value::Int(0));
        assert_ne!(Value::Nil, Value::Str(String::new()));
    }

    #[test]
    fn test_toml_round_trip_for_scalars() {
        for value in [
            Value::Bool(true),
            Value::Int(42),
            Value::Float(2.5),
            Value::from("hello"),
            Value::List(vec![Value::Int(1), Value::Int(2)]),
        ] {
            let toml = value.to_toml().unwrap();
            assert_eq!(Value::from_toml(toml), Some(value));
        }
    }

    #[test]
    fn test_nil_has_no_toml_form() {
        assert!(Value::Nil.to_toml().is_none());
        let list = Value::List(vec![Value::Nil, Value::Int(1)]);
        assert_eq!(
            list.to_toml().unwrap(),
            toml::Value::Array(vec![toml::Value::Integer(1)])
        );
    }

    #[test]
    fn test_deep_clone_of_list() {
        let list = Value::List(vec![Value::from("a"), Value::Int(1)]);
        assert_eq!(list.deep_clone(), list);
    }
}
