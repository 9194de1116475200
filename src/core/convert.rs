use crate::core::extractor::GenericExtractor;
use crate::core::metadata_generator::generate_metadata_schema;
use crate::core::registry::ExtractorRegistry;
use crate::domain::model::{ChatOptions, MetricMetadata, RawPayload, TimeSeriesPoint};
use crate::domain::ports::ChatClient;
use crate::utils::error::{MetricsError, Result};
use crate::utils::formatters::MetricNameFormat;
use serde_json::Value;

#[derive(Debug, Clone)]
pub struct ConvertOptions {
    pub entity_field: String,
    pub timestamp_field: String,
    pub name_format: MetricNameFormat,
}

impl ConvertOptions {
    pub fn new(entity_field: impl Into<String>) -> Self {
        Self {
            entity_field: entity_field.into(),
            timestamp_field: "created_at".to_string(),
            name_format: MetricNameFormat::Slug,
        }
    }

    pub fn timestamp_field(mut self, timestamp_field: impl Into<String>) -> Self {
        self.timestamp_field = timestamp_field.into();
        self
    }

    pub fn name_format(mut self, name_format: MetricNameFormat) -> Self {
        self.name_format = name_format;
        self
    }
}

/// Extracts time-series points from `payload`, registering an extractor for its
/// type on first sight. With a chat client the sample item is also described as
/// metric metadata.
pub async fn process_data(
    payload: &RawPayload,
    registry: &mut ExtractorRegistry,
    options: &ConvertOptions,
    chat: Option<(&dyn ChatClient, &ChatOptions)>,
) -> Result<(Vec<TimeSeriesPoint>, Vec<MetricMetadata>)> {
    let data_type = payload.data_type().to_string();

    if registry.get_extractor(&data_type).is_none() {
        let mapping = registry.register_from_sample(
            &data_type,
            &payload.body,
            &options.entity_field,
            &options.timestamp_field,
            options.name_format,
        )?;
        tracing::debug!("Created new mapping: {:?}", mapping);
    }

    let extractor = registry
        .get_extractor(&data_type)
        .ok_or_else(|| MetricsError::ProcessingError {
            message: format!("No extractor registered for type '{}'", data_type),
        })?;

    let schema = match chat {
        Some((client, chat_options)) => {
            let (sample_item, _) =
                GenericExtractor::extract_sample_item(&payload.body, &options.entity_field)?;
            let sample_item = Value::Object(sample_item.clone());
            generate_metadata_schema(&sample_item, client, chat_options).await?
        }
        None => Vec::new(),
    };

    let points = extractor.extract(payload);
    tracing::info!(
        "🔄 Converted {} points and {} metadata entries from '{}'",
        points.len(),
        schema.len(),
        payload.source
    );

    Ok((points, schema))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::testing::ScriptedChat;
    use serde_json::json;

    fn wallet_payload() -> RawPayload {
        RawPayload::new(
            "gmgn",
            json!({
                "type": "gmgn_wallet_data",
                "url": "https://gmgn.ai/api/rank",
                "data": [
                    {"wallet_address": "abc123", "realized_profit": 150.0, "pnl_7d": 75.0, "created_at": "2024-01-02T00:00:00Z"},
                    {"wallet_address": "def456", "realized_profit": 200.0, "pnl_7d": 100.0, "created_at": "2024-01-02T00:00:00Z"}
                ]
            }),
        )
    }

    #[tokio::test]
    async fn test_process_data_registers_extractor_once() {
        let mut registry = ExtractorRegistry::new();
        let options = ConvertOptions::new("wallet_address");

        let (points, schema) = process_data(&wallet_payload(), &mut registry, &options, None)
            .await
            .unwrap();

        assert_eq!(points.len(), 4);
        assert!(schema.is_empty());
        assert!(registry.get_extractor("gmgn_wallet_data").is_some());

        // 同類型第二次處理沿用既有 extractor
        let (points, _) = process_data(&wallet_payload(), &mut registry, &options, None)
            .await
            .unwrap();
        assert_eq!(points.len(), 4);
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn test_process_data_with_metadata() {
        let chat = ScriptedChat::new(vec![
            r#"{"metrics": [{"name": "PnL 7d", "description": "7 day PnL", "scope": "wallet", "freq": "daily", "period": "7d"}]}"#,
        ]);
        let mut registry = ExtractorRegistry::new();
        let options = ConvertOptions::new("wallet_address").name_format(MetricNameFormat::Raw);
        let chat_options = ChatOptions::with_model("gpt-4o-mini");

        let (points, schema) = process_data(
            &wallet_payload(),
            &mut registry,
            &options,
            Some((&chat as &dyn ChatClient, &chat_options)),
        )
        .await
        .unwrap();

        assert!(points.iter().any(|p| p.metric == "pnl_7d"));
        assert_eq!(schema[0].name, "pnl-7d");
        assert!(!chat.prompts()[0].contains("def456"));
        assert_eq!(chat.models(), vec![Some("gpt-4o-mini".to_string())]);
    }

    #[tokio::test]
    async fn test_process_data_fails_without_entity_field() {
        let mut registry = ExtractorRegistry::new();
        let options = ConvertOptions::new("chain").timestamp_field("timestamp");

        let result = process_data(&wallet_payload(), &mut registry, &options, None).await;

        assert!(matches!(result, Err(MetricsError::ExtractionError { .. })));
    }
}
