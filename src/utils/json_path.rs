use serde_json::Value;

/// Lists every object key path in `value`, depth first. Arrays are entered
/// through their first element and add no index to the path.
pub fn traverse_json(value: &Value) -> Vec<(String, &Value)> {
    let mut paths = Vec::new();
    collect_paths(value, "", &mut paths);
    paths
}

fn collect_paths<'a>(value: &'a Value, path: &str, out: &mut Vec<(String, &'a Value)>) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                let child_path = if path.is_empty() {
                    key.clone()
                } else {
                    format!("{}.{}", path, key)
                };
                out.push((child_path.clone(), child));
                collect_paths(child, &child_path, out);
            }
        }
        Value::Array(items) => {
            if let Some(first) = items.first() {
                collect_paths(first, path, out);
            }
        }
        _ => {}
    }
}

/// Shortest path holding a non-empty array of objects that carry `entity_field`.
pub fn find_entity_path(value: &Value, entity_field: &str) -> Option<String> {
    traverse_json(value)
        .into_iter()
        .filter(|(_, v)| {
            v.as_array()
                .and_then(|items| items.first())
                .and_then(Value::as_object)
                .is_some_and(|first| first.contains_key(entity_field))
        })
        .map(|(path, _)| path)
        .min_by_key(|path| path.len())
}

/// Resolves a dotted path such as `$.data.chains`. `$`, `$.` and the empty
/// string refer to the root.
pub fn resolve_path<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    let trimmed = path.trim_start_matches('$').trim_start_matches('.');
    if trimmed.is_empty() {
        return Some(value);
    }

    trimmed
        .split('.')
        .try_fold(value, |current, segment| match current {
            Value::Object(map) => map.get(segment),
            _ => None,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn chain_payload() -> Value {
        json!({
            "type": "defillama_chain_data",
            "url": "https://defillama.com/chains",
            "data": {
                "chains": [
                    {"chain": "Ethereum", "tvl": 1000000.0, "timestamp": "2024-01-02T00:00:00Z"}
                ]
            }
        })
    }

    #[test]
    fn test_traverse_enters_first_array_element_without_index() {
        let payload = chain_payload();
        let paths: Vec<String> = traverse_json(&payload).into_iter().map(|(p, _)| p).collect();

        assert!(paths.contains(&"data.chains".to_string()));
        assert!(paths.contains(&"data.chains.chain".to_string()));
        assert!(paths.contains(&"data.chains.tvl".to_string()));
        assert!(!paths.iter().any(|p| p.contains('[')));
    }

    #[test]
    fn test_find_entity_path_prefers_shortest() {
        let payload = json!({
            "data": [
                {"wallet_address": "abc123", "history": [{"wallet_address": "abc123"}]}
            ]
        });
        assert_eq!(find_entity_path(&payload, "wallet_address"), Some("data".to_string()));
        assert_eq!(find_entity_path(&payload, "missing"), None);
    }

    #[test]
    fn test_resolve_path() {
        let payload = chain_payload();
        let chains = resolve_path(&payload, "$.data.chains").unwrap();
        assert!(chains.is_array());
        assert_eq!(resolve_path(&payload, "$"), Some(&payload));
        assert_eq!(resolve_path(&payload, "$."), Some(&payload));
        assert!(resolve_path(&payload, "$.data.missing").is_none());
    }
}
