use crate::core::prompts::{render, METADATA_SCHEMA_TEMPLATE};
use crate::domain::model::{ChatOptions, MetricMetadata, MetricMetadataList};
use crate::domain::ports::ChatClient;
use crate::utils::error::Result;
use crate::utils::formatters::slugify;
use crate::utils::json_extract::extract_json;
use serde_json::{json, Value};

fn metadata_example() -> Value {
    json!({
        "name": "tvl",
        "description": "Total Value Locked",
        "scope": "chain",
        "freq": "daily",
        "period": "1d"
    })
}

/// Asks the LLM to describe the metrics found in `sample_data`.
/// Metric names come back slugified; an unusable reply yields no metadata.
pub async fn generate_metadata_schema(
    sample_data: &Value,
    chat: &dyn ChatClient,
    options: &ChatOptions,
) -> Result<Vec<MetricMetadata>> {
    let metadata = metadata_example().to_string();
    let sample_data = sample_data.to_string();
    let prompt = render(
        METADATA_SCHEMA_TEMPLATE,
        &[("metadata", metadata.as_str()), ("sample_data", sample_data.as_str())],
    );
    tracing::debug!("llm metadata schema prompt: {}", prompt);

    let response = chat.chat(&prompt, options).await?;
    tracing::debug!("llm metadata schema response: {}", response);

    let Some(schema) = extract_json::<MetricMetadataList>(&response) else {
        return Ok(Vec::new());
    };

    Ok(schema
        .metrics
        .into_iter()
        .map(|mut metric| {
            metric.name = slugify(&metric.name);
            metric
        })
        .collect())
}
