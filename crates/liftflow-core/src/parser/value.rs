//! KDL node to JSON conversion
//!
//! - `key value` becomes `"key": value`, `key a b c` becomes an array
//! - `key a=1 b=2` and `key { a 1; b 2 }` become objects
//! - kebab-case names are normalised to snake_case
//! - list nodes may repeat and always collect into an array

use crate::error::{ManifestError, Result};
use kdl::{KdlDocument, KdlEntry, KdlNode, KdlValue};
use serde_json::{Map, Number, Value};

/// Children that may repeat; every occurrence becomes one array element
const LIST_NODES: &[&str] = &["ec2_inbound_permission", "server_process"];

pub(crate) fn field_name(name: &str) -> String {
    name.replace('-', "_")
}

pub(crate) fn scalar(path: &str, value: &KdlValue) -> Result<Value> {
    let value = match value {
        KdlValue::String(s) => Value::String(s.clone()),
        KdlValue::Integer(i) => i64::try_from(*i)
            .map(Value::from)
            .map_err(|_| ManifestError::invalid(path, format!("integer {} is out of range", i)))?,
        KdlValue::Float(f) => Number::from_f64(*f)
            .map(Value::Number)
            .ok_or_else(|| ManifestError::invalid(path, format!("{} is not a finite number", f)))?,
        KdlValue::Bool(b) => Value::Bool(*b),
        KdlValue::Null => Value::Null,
    };
    Ok(value)
}

pub(crate) fn arguments(node: &KdlNode) -> Vec<&KdlEntry> {
    node.entries().iter().filter(|e| e.name().is_none()).collect()
}

fn has_properties(node: &KdlNode) -> bool {
    node.entries().iter().any(|e| e.name().is_some())
}

/// Properties of `node` as an object, names normalised
pub(crate) fn properties_object(node: &KdlNode, path: &str) -> Result<Map<String, Value>> {
    let mut object = Map::new();
    for entry in node.entries() {
        if let Some(name) = entry.name() {
            object.insert(field_name(name.value()), scalar(path, entry.value())?);
        }
    }
    Ok(object)
}

/// Convert a single node to its JSON value
pub(crate) fn node_value(node: &KdlNode, path: &str) -> Result<Value> {
    let args = arguments(node);

    if node.children().is_some() || has_properties(node) {
        if !args.is_empty() {
            return Err(ManifestError::invalid(
                path,
                "arguments cannot be mixed with properties or a block",
            ));
        }
        let mut object = properties_object(node, path)?;
        if let Some(children) = node.children() {
            merge_block(&mut object, children, path)?;
        }
        return Ok(Value::Object(object));
    }

    match args.as_slice() {
        [] => Ok(Value::Bool(true)),
        [single] => scalar(path, single.value()),
        many => many
            .iter()
            .map(|e| scalar(path, e.value()))
            .collect::<Result<Vec<_>>>()
            .map(Value::Array),
    }
}

/// Fold the children of a block into `object`
pub(crate) fn merge_block(
    object: &mut Map<String, Value>,
    block: &KdlDocument,
    path: &str,
) -> Result<()> {
    for child in block.nodes() {
        let key = field_name(child.name().value());
        let child_path = format!("{}.{}", path, key);

        let value = match key.as_str() {
            "tags" => string_map(child, &child_path)?,
            "metric_groups" => string_list(child, &child_path)?,
            _ => node_value(child, &child_path)?,
        };

        if LIST_NODES.contains(&key.as_str()) {
            match object
                .entry(key)
                .or_insert_with(|| Value::Array(Vec::new()))
            {
                Value::Array(items) => items.push(value),
                _ => {
                    return Err(ManifestError::invalid(
                        child_path,
                        "declared both as a property and as a list entry",
                    ));
                }
            }
            continue;
        }

        if object.contains_key(&key) {
            return Err(ManifestError::invalid(child_path, "declared more than once"));
        }
        object.insert(key, value);
    }
    Ok(())
}

/// `metric-groups "a" "b"`; a single group still yields an array
fn string_list(node: &KdlNode, path: &str) -> Result<Value> {
    if node.children().is_some() || has_properties(node) {
        return Err(ManifestError::invalid(path, "expected a list of strings"));
    }
    arguments(node)
        .into_iter()
        .map(|entry| {
            entry
                .value()
                .as_string()
                .map(|s| Value::String(s.to_string()))
                .ok_or_else(|| {
                    ManifestError::invalid(path, format!("{} is not a string", entry.value()))
                })
        })
        .collect::<Result<Vec<_>>>()
        .map(Value::Array)
}

/// `tags team="core"` or `tags { team "core" }`; keys are kept verbatim
fn string_map(node: &KdlNode, path: &str) -> Result<Value> {
    if !arguments(node).is_empty() {
        return Err(ManifestError::invalid(
            path,
            "expected key=\"value\" properties or a block",
        ));
    }

    let mut tags = Map::new();
    let mut insert = |key: &str, value: &KdlValue| -> Result<()> {
        let value = value.as_string().ok_or_else(|| {
            ManifestError::invalid(path, format!("value of tag `{}` must be a string", key))
        })?;
        tags.insert(key.to_string(), Value::String(value.to_string()));
        Ok(())
    };

    for entry in node.entries() {
        if let Some(name) = entry.name() {
            insert(name.value(), entry.value())?;
        }
    }
    if let Some(children) = node.children() {
        for child in children.nodes() {
            let key = child.name().value();
            match arguments(child).as_slice() {
                [single] => insert(key, single.value())?,
                _ => {
                    return Err(ManifestError::invalid(
                        path,
                        format!("tag `{}` needs exactly one value", key),
                    ));
                }
            }
        }
    }
    Ok(Value::Object(tags))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn block(src: &str) -> Result<Value> {
        let doc: KdlDocument = src.parse()?;
        let mut object = Map::new();
        merge_block(&mut object, &doc, "test")?;
        Ok(Value::Object(object))
    }

    #[test]
    fn test_scalars_and_kebab_case() {
        let value = block(
            r#"
            build-id "build-1"
            max-size 10
            target 20.5
            enabled #true
            "#,
        )
        .unwrap();
        assert_eq!(
            value,
            json!({ "build_id": "build-1", "max_size": 10, "target": 20.5, "enabled": true })
        );
    }

    #[test]
    fn test_multiple_arguments_become_array() {
        let value = block(r#"zones "a" "b""#).unwrap();
        assert_eq!(value, json!({ "zones": ["a", "b"] }));
    }

    #[test]
    fn test_properties_become_object() {
        let value = block(r#"limit new-game-sessions-per-creator=3 policy-period-in-minutes=15"#)
            .unwrap();
        assert_eq!(
            value,
            json!({ "limit": { "new_game_sessions_per_creator": 3, "policy_period_in_minutes": 15 } })
        );
    }

    #[test]
    fn test_list_nodes_always_collect() {
        let value = block(
            r#"ec2-inbound-permission from-port=7777 to-port=7777 ip-range="0.0.0.0/0" protocol="UDP""#,
        )
        .unwrap();
        assert_eq!(value["ec2_inbound_permission"].as_array().unwrap().len(), 1);

        let value = block(
            r#"
            server-process launch-path="/game/a" concurrent-executions=1
            server-process launch-path="/game/b" concurrent-executions=2
            "#,
        )
        .unwrap();
        assert_eq!(
            value["server_process"],
            json!([
                { "launch_path": "/game/a", "concurrent_executions": 1 },
                { "launch_path": "/game/b", "concurrent_executions": 2 }
            ])
        );
    }

    #[test]
    fn test_metric_groups_single_value_is_array() {
        let value = block(r#"metric-groups "default""#).unwrap();
        assert_eq!(value, json!({ "metric_groups": ["default"] }));
    }

    #[test]
    fn test_tags_keep_key_spelling() {
        let value = block(
            r#"
            tags cost-center="games" {
                team "core"
            }
            "#,
        )
        .unwrap();
        assert_eq!(
            value,
            json!({ "tags": { "cost-center": "games", "team": "core" } })
        );
    }

    #[test]
    fn test_non_string_tag_rejected() {
        let err = block(r#"tags { replicas 3 }"#).unwrap_err();
        assert!(err.to_string().contains("tag `replicas`"));
    }

    #[test]
    fn test_duplicate_field_rejected() {
        let err = block(
            r#"
            description "a"
            description "b"
            "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("test.description"));
    }

    #[test]
    fn test_mixed_arguments_and_properties_rejected() {
        assert!(block(r#"timeout 10 unit="s""#).is_err());
    }
}
