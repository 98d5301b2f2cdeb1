//! Lecture typée des champs d'une valeur persistée
//!
//! Chaque fonction retourne la valeur persistée si elle a le bon type, la
//! valeur par défaut sinon. Un champ absent est attendu (nouveau paramètre),
//! un champ mal typé est signalé.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

fn wrong_type(name: &str, value: &Value) {
    tracing::warn!(field = name, value = %value, "Persisted field has wrong type, using default");
}

pub fn bool_field(raw: &Map<String, Value>, name: &str, default: bool) -> bool {
    match raw.get(name) {
        None => default,
        Some(Value::Bool(b)) => *b,
        Some(other) => {
            wrong_type(name, other);
            default
        }
    }
}

/// Entier signé. Les nombres non entiers sont refusés.
pub fn int_field(raw: &Map<String, Value>, name: &str, default: i64) -> i64 {
    match raw.get(name) {
        None => default,
        Some(Value::Number(n)) if n.is_i64() => n.as_i64().unwrap_or(default),
        Some(other) => {
            wrong_type(name, other);
            default
        }
    }
}

pub fn opt_bool_field(raw: &Map<String, Value>, name: &str, default: Option<bool>) -> Option<bool> {
    match raw.get(name) {
        None => default,
        Some(Value::Null) => None,
        Some(Value::Bool(b)) => Some(*b),
        Some(other) => {
            wrong_type(name, other);
            default
        }
    }
}

pub fn opt_int_field(raw: &Map<String, Value>, name: &str, default: Option<i64>) -> Option<i64> {
    match raw.get(name) {
        None => default,
        Some(Value::Null) => None,
        Some(Value::Number(n)) if n.is_i64() => n.as_i64(),
        Some(other) => {
            wrong_type(name, other);
            default
        }
    }
}

pub fn opt_string_field(
    raw: &Map<String, Value>,
    name: &str,
    default: Option<String>,
) -> Option<String> {
    match raw.get(name) {
        None => default,
        Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s.clone()),
        Some(other) => {
            wrong_type(name, other);
            default
        }
    }
}

/// Champ désérialisé par serde (énumérations fermées).
pub fn serde_field<T: DeserializeOwned>(raw: &Map<String, Value>, name: &str, default: T) -> T {
    match raw.get(name) {
        None => default,
        Some(value) => match serde_json::from_value(value.clone()) {
            Ok(parsed) => parsed,
            Err(_) => {
                wrong_type(name, value);
                default
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn obj(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_bool_field() {
        let raw = obj(json!({"a": true, "b": "yes"}));
        assert!(bool_field(&raw, "a", false));
        assert!(bool_field(&raw, "b", true));
        assert!(!bool_field(&raw, "missing", false));
    }

    #[test]
    fn test_int_field_rejects_floats_and_strings() {
        let raw = obj(json!({"i": 5, "f": 1.5, "s": "5", "neg": -2}));
        assert_eq!(int_field(&raw, "i", 30), 5);
        assert_eq!(int_field(&raw, "f", 30), 30);
        assert_eq!(int_field(&raw, "s", 30), 30);
        assert_eq!(int_field(&raw, "neg", 30), -2);
    }

    #[test]
    fn test_optional_fields_accept_null() {
        let raw = obj(json!({"url": null, "n": null, "b": null}));
        assert_eq!(opt_string_field(&raw, "url", Some("x".into())), None);
        assert_eq!(opt_int_field(&raw, "n", Some(3)), None);
        assert_eq!(opt_bool_field(&raw, "b", Some(true)), None);
        assert_eq!(opt_int_field(&raw, "absent", Some(3)), Some(3));
    }
}
