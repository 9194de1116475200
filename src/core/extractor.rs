use crate::domain::model::{MappingRules, MetricDefinition, MetricMapping, RawPayload, TimeSeriesPoint};
use crate::utils::error::{MetricsError, Result};
use crate::utils::formatters::{format_metric_name, MetricNameFormat};
use crate::utils::json_path::{find_entity_path, resolve_path, traverse_json};
use crate::utils::time::convert_iso_to_timestamp;
use serde_json::{Map, Value};

/// Turns crawled JSON into time-series points according to [`MappingRules`].
#[derive(Debug, Clone)]
pub struct GenericExtractor {
    mapping_rules: MappingRules,
    metrics: Vec<MetricDefinition>,
}

impl GenericExtractor {
    pub fn new(mapping_rules: MappingRules) -> Self {
        let metrics = mapping_rules
            .metrics
            .iter()
            .map(|metric| MetricDefinition {
                name: metric.name.clone(),
                value_path: metric.value_path.clone(),
                entity_path: mapping_rules.default_entity_field.clone(),
                timestamp_path: mapping_rules.default_timestamp_field.clone(),
            })
            .collect();

        Self {
            mapping_rules,
            metrics,
        }
    }

    pub fn mapping_rules(&self) -> &MappingRules {
        &self.mapping_rules
    }

    pub fn metric_definitions(&self) -> &[MetricDefinition] {
        &self.metrics
    }

    /// Finds one entity record in `data_sample` and the path of the array holding it.
    /// A sample that already is such a record yields the empty path.
    pub fn extract_sample_item<'a>(
        data_sample: &'a Value,
        entity_identifier: &str,
    ) -> Result<(&'a Map<String, Value>, String)> {
        if let Some(item) = data_sample.as_object() {
            if item.contains_key(entity_identifier) {
                return Ok((item, String::new()));
            }
            if let Some(data) = item.get("data").and_then(Value::as_object) {
                if data.contains_key(entity_identifier) {
                    return Ok((data, "data".to_string()));
                }
            }
        }

        let Some(base_path) = find_entity_path(data_sample, entity_identifier) else {
            let available_paths: Vec<String> =
                traverse_json(data_sample).into_iter().map(|(p, _)| p).collect();
            return Err(MetricsError::ExtractionError {
                message: format!(
                    "Could not find {} in data sample. Available paths: {:?}",
                    entity_identifier, available_paths
                ),
            });
        };
        tracing::debug!("Base Path: {}", base_path);

        let item = resolve_path(data_sample, &base_path)
            .and_then(Value::as_array)
            .and_then(|items| items.first())
            .and_then(Value::as_object)
            .ok_or_else(|| MetricsError::ExtractionError {
                message: "No array data found at the specified path".to_string(),
            })?;

        Ok((item, base_path))
    }

    /// Builds mapping rules from a sample: every numeric field other than the
    /// entity and timestamp fields becomes a metric.
    pub fn infer_mapping(
        data_sample: &Value,
        entity_identifier: &str,
        timestamp_field: &str,
        name_format: MetricNameFormat,
    ) -> Result<MappingRules> {
        let (sample_item, base_path) = Self::extract_sample_item(data_sample, entity_identifier)?;

        let metrics = sample_item
            .iter()
            .filter(|(key, value)| {
                value.is_number() && key.as_str() != entity_identifier && key.as_str() != timestamp_field
            })
            .map(|(key, _)| MetricMapping {
                name: format_metric_name(key, name_format),
                value_path: key.clone(),
            })
            .collect();

        Ok(MappingRules {
            entity_base_path: format!("$.{}", base_path),
            default_entity_field: entity_identifier.to_string(),
            default_timestamp_field: timestamp_field.to_string(),
            metrics,
        })
    }

    pub fn extract(&self, payload: &RawPayload) -> Vec<TimeSeriesPoint> {
        let Some(base) = resolve_path(&payload.body, &self.mapping_rules.entity_base_path) else {
            tracing::warn!(
                "Base path {} not present in payload from {}",
                self.mapping_rules.entity_base_path,
                payload.source
            );
            return Vec::new();
        };

        let records: Vec<&Map<String, Value>> = match base {
            Value::Array(items) => items.iter().filter_map(Value::as_object).collect(),
            Value::Object(item) => vec![item],
            _ => Vec::new(),
        };

        let default_source = payload.url().unwrap_or_default();
        let mut results = Vec::new();

        for record in records {
            let source = record
                .get("source")
                .and_then(Value::as_str)
                .unwrap_or(default_source);

            for metric in &self.metrics {
                let Some(timestamp) = record.get(&metric.timestamp_path).and_then(read_timestamp)
                else {
                    continue;
                };
                let Some(entity) = record.get(&metric.entity_path).and_then(read_entity) else {
                    continue;
                };
                let Some(value) = record.get(&metric.value_path).and_then(read_number) else {
                    continue;
                };

                results.push(TimeSeriesPoint {
                    entity,
                    metric: metric.name.clone(),
                    value,
                    timestamp,
                    source: source.to_string(),
                });
            }
        }

        results
    }
}

fn read_timestamp(value: &Value) -> Option<i64> {
    match value {
        Value::String(s) if !s.is_empty() => convert_iso_to_timestamp(s),
        Value::Number(n) => n.as_i64(),
        _ => None,
    }
}

fn read_entity(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

// NaN 與 inf 無法存成 JSON 數字，直接略過
fn read_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
    .filter(|v: &f64| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn chain_payload() -> RawPayload {
        RawPayload::new(
            "defillama",
            json!({
                "type": "defillama_chain_data",
                "url": "https://defillama.com/chains",
                "data": {
                    "chains": [
                        {"chain": "Ethereum", "tvl": 1000000.0, "volume_24h": 500000.0, "timestamp": "2024-01-02T00:00:00Z"},
                        {"chain": "Base", "tvl": 300000.0, "volume_24h": 100000.0, "timestamp": "2024-01-02T00:00:00Z"}
                    ]
                }
            }),
        )
    }

    fn wallet_payload() -> RawPayload {
        RawPayload::new(
            "gmgn",
            json!({
                "type": "gmgn_wallet_data",
                "url": "https://gmgn.ai/api/rank",
                "data": [
                    {"wallet_address": "abc123", "realized_profit": 150.0, "pnl_7d": 75.0, "created_at": "2024-01-02T00:00:00Z"},
                    {"wallet_address": "def456", "realized_profit": 200.0, "pnl_7d": 100.0, "created_at": "2024-01-02T00:00:00Z", "source": "gmgn-rank"},
                    {"wallet_address": "ghi789", "realized_profit": 10.0, "pnl_7d": 1.0}
                ]
            }),
        )
    }

    #[test]
    fn test_extract_sample_item_from_nested_array() {
        let payload = chain_payload();
        let (item, base_path) = GenericExtractor::extract_sample_item(&payload.body, "chain").unwrap();

        assert_eq!(base_path, "data.chains");
        assert_eq!(item.get("chain").unwrap(), "Ethereum");
    }

    #[test]
    fn test_extract_sample_item_accepts_single_record() {
        let record = json!({"wallet_address": "abc123", "buy": 24});
        let (item, base_path) = GenericExtractor::extract_sample_item(&record, "wallet_address").unwrap();

        assert_eq!(base_path, "");
        assert_eq!(item.get("buy").unwrap(), 24);
    }

    #[test]
    fn test_extract_sample_item_lists_available_paths_on_miss() {
        let payload = chain_payload();
        let err = GenericExtractor::extract_sample_item(&payload.body, "wallet_address").unwrap_err();

        let message = err.to_string();
        assert!(message.contains("Could not find wallet_address"));
        assert!(message.contains("data.chains.tvl"));
    }

    #[test]
    fn test_infer_mapping_picks_numeric_fields() {
        let payload = json!({
            "data": [{"wallet_address": "abc", "realized_profit_7d": 1.5, "buy": 24, "is_bot": true, "last_active": 1736817888, "tag": "whale"}]
        });
        let rules =
            GenericExtractor::infer_mapping(&payload, "wallet_address", "last_active", MetricNameFormat::Slug).unwrap();

        assert_eq!(rules.entity_base_path, "$.data");
        assert_eq!(rules.default_entity_field, "wallet_address");
        let names: Vec<&str> = rules.metrics.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names.len(), 2);
        assert!(names.contains(&"realized-profit-7d"));
        assert!(names.contains(&"buy"));
    }

    #[test]
    fn test_extract_nested_chain_points() {
        let payload = chain_payload();
        let rules =
            GenericExtractor::infer_mapping(&payload.body, "chain", "timestamp", MetricNameFormat::Slug).unwrap();
        let extractor = GenericExtractor::new(rules);

        let points = extractor.extract(&payload);

        assert_eq!(points.len(), 4);
        let base_tvl = points
            .iter()
            .find(|p| p.entity == "Base" && p.metric == "tvl")
            .unwrap();
        assert_eq!(base_tvl.value, 300000.0);
        assert_eq!(base_tvl.timestamp, 1704153600);
        assert_eq!(base_tvl.source, "https://defillama.com/chains");
        assert!(points.iter().any(|p| p.metric == "volume-24h"));
    }

    #[test]
    fn test_extract_skips_records_without_timestamp() {
        let payload = wallet_payload();
        let rules =
            GenericExtractor::infer_mapping(&payload.body, "wallet_address", "created_at", MetricNameFormat::Raw)
                .unwrap();
        let extractor = GenericExtractor::new(rules);

        let points = extractor.extract(&payload);

        assert_eq!(points.len(), 4);
        assert!(points.iter().all(|p| p.entity != "ghi789"));
        let def = points
            .iter()
            .find(|p| p.entity == "def456" && p.metric == "pnl_7d")
            .unwrap();
        assert_eq!(def.source, "gmgn-rank");
    }

    #[test]
    fn test_extract_skips_non_finite_values() {
        let payload = RawPayload::new(
            "gmgn",
            json!({"data": [
                {"wallet_address": "abc123", "pnl": 1.5, "created_at": 1704153600},
                {"wallet_address": "def456", "pnl": "NaN", "created_at": 1704153600},
                {"wallet_address": "ghi789", "pnl": "inf", "created_at": 1704153600}
            ]}),
        );
        let rules =
            GenericExtractor::infer_mapping(&payload.body, "wallet_address", "created_at", MetricNameFormat::Raw)
                .unwrap();

        let points = GenericExtractor::new(rules).extract(&payload);

        assert_eq!(points.len(), 1);
        assert_eq!(points[0].entity, "abc123");
        assert!(points[0].value.is_finite());
    }

    #[test]
    fn test_extract_returns_nothing_for_missing_base_path() {
        let extractor = GenericExtractor::new(MappingRules {
            entity_base_path: "$.data.rank".to_string(),
            default_entity_field: "wallet_address".to_string(),
            default_timestamp_field: "created_at".to_string(),
            metrics: vec![MetricMapping {
                name: "pnl".to_string(),
                value_path: "pnl".to_string(),
            }],
        });

        assert!(extractor.extract(&chain_payload()).is_empty());
        assert_eq!(extractor.metric_definitions()[0].entity_path, "wallet_address");
    }
}
