//! Manipulation de l'arbre YAML de configuration
//!
//! Les clés sont toujours comparées en minuscules.

use anyhow::{anyhow, Result};
use serde_yaml::{Mapping, Value};

fn key(name: &str) -> Value {
    Value::String(name.to_lowercase())
}

/// Lit le nœud désigné par `path`
pub(crate) fn lookup<'a>(root: &'a Value, path: &[&str]) -> Result<&'a Value> {
    path.iter()
        .enumerate()
        .try_fold(root, |node, (depth, name)| match node {
            Value::Mapping(map) => map
                .get(key(name))
                .ok_or_else(|| anyhow!("Path {} does not exist", path[..=depth].join("."))),
            _ => Err(anyhow!("Path {} is not a mapping", path[..depth].join("."))),
        })
}

/// Écrit `value` à `path`, en créant les sections intermédiaires
pub(crate) fn insert(root: &mut Value, path: &[&str], value: Value) -> Result<()> {
    let Some((last, parents)) = path.split_last() else {
        *root = value;
        return Ok(());
    };

    let mut node = root;
    for name in parents {
        let Value::Mapping(map) = node else {
            return Err(anyhow!("Section {} is not a mapping", name));
        };
        node = map
            .entry(key(name))
            .or_insert_with(|| Value::Mapping(Mapping::new()));
    }

    match node {
        Value::Mapping(map) => {
            map.insert(key(last), value);
            Ok(())
        }
        _ => Err(anyhow!("Cannot set {}: parent is not a mapping", path.join("."))),
    }
}

/// Fusion récursive : les mappings sont fusionnés clé par clé, le reste est
/// remplacé. Un document externe nul laisse `base` intact.
pub(crate) fn merge(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (_, Value::Null) => {}
        (Value::Mapping(target), Value::Mapping(source)) => {
            for (k, v) in source {
                match target.get_mut(&k) {
                    Some(existing) => merge(existing, v),
                    None => {
                        target.insert(k, v);
                    }
                }
            }
        }
        (slot, v) => *slot = v,
    }
}

/// Passe récursivement toutes les clés en minuscules
pub(crate) fn lowercase_keys(value: Value) -> Value {
    match value {
        Value::Mapping(map) => Value::Mapping(
            map.into_iter()
                .map(|(k, v)| {
                    let k = match k {
                        Value::String(s) => Value::String(s.to_lowercase()),
                        other => other,
                    };
                    (k, lowercase_keys(v))
                })
                .collect(),
        ),
        Value::Sequence(items) => Value::Sequence(items.into_iter().map(lowercase_keys).collect()),
        other => other,
    }
}

/// Valeur d'une variable d'environnement : scalaire YAML si possible,
/// chaîne brute sinon.
pub(crate) fn parse_scalar(raw: &str) -> Value {
    serde_yaml::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}
