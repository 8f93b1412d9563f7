//! Session values
//!
//! [`Value`] is the dynamically typed cell stored under each session key. The
//! binary codec persists the variant tag, so values come back exactly as they were
//! set. The JSON codec only has one number type: every number read back from JSON
//! surfaces as [`Value::Float`], and the typed getters on
//! [`Session`](crate::Session) coerce it to the requested integer type.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Values keyed by name, as held by one session
pub type ValueMap = HashMap<String, Value>;

/// A single session value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Uint(u64),
    Float(f64),
    String(String),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
}

impl Value {
    /// Short type name used in access error messages
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Uint(_) => "uint",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::List(_) => "list",
            Value::Map(_) => "map",
        }
    }
}

macro_rules! impl_from {
    ($($ty:ty => $variant:ident as $target:ty),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::$variant(<$target>::from(v))
                }
            }
        )*
    };
}

impl_from! {
    bool => Bool as bool,
    i8 => Int as i64,
    i16 => Int as i64,
    i32 => Int as i64,
    i64 => Int as i64,
    u8 => Uint as u64,
    u16 => Uint as u64,
    u32 => Uint as u64,
    u64 => Uint as u64,
    f32 => Float as f64,
    f64 => Float as f64,
    String => String as String,
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::List(v.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

impl From<&Value> for serde_json::Value {
    fn from(v: &Value) -> Self {
        match v {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Int(i) => serde_json::Value::from(*i),
            Value::Uint(u) => serde_json::Value::from(*u),
            // Non-finite floats have no JSON representation and become null
            Value::Float(f) => serde_json::Number::from_f64(*f)
                .map_or(serde_json::Value::Null, serde_json::Value::Number),
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::List(items) => {
                serde_json::Value::Array(items.iter().map(serde_json::Value::from).collect())
            }
            Value::Map(map) => serde_json::Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), serde_json::Value::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<serde_json::Value> for Value {
    /// Untyped conversion: every JSON number becomes [`Value::Float`]
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::List(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => {
                Value::Map(map.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_primitives_keeps_type() {
        assert_eq!(Value::from(7), Value::Int(7));
        assert_eq!(Value::from(7u32), Value::Uint(7));
        assert_eq!(Value::from(1.5), Value::Float(1.5));
        assert_eq!(Value::from("hi"), Value::String("hi".to_string()));
        assert_eq!(Value::from(None::<i32>), Value::Null);
        assert_eq!(
            Value::from(vec![1, 2]),
            Value::List(vec![Value::Int(1), Value::Int(2)])
        );
    }

    #[test]
    fn test_json_numbers_surface_as_float() {
        let v = Value::from(json!({"n": 3, "list": [1, true, "x"]}));
        let Value::Map(map) = v else {
            panic!("expected map");
        };
        assert_eq!(map["n"], Value::Float(3.0));
        assert_eq!(
            map["list"],
            Value::List(vec![
                Value::Float(1.0),
                Value::Bool(true),
                Value::String("x".into())
            ])
        );
    }

    #[test]
    fn test_to_json() {
        let mut map = BTreeMap::new();
        map.insert("a".to_string(), Value::Int(-1));
        map.insert("b".to_string(), Value::Float(f64::INFINITY));
        assert_eq!(
            serde_json::Value::from(&Value::Map(map)),
            json!({"a": -1, "b": null})
        );
    }

    #[test]
    fn test_type_name() {
        assert_eq!(Value::Uint(1).type_name(), "uint");
        assert_eq!(Value::Null.type_name(), "null");
    }
}
