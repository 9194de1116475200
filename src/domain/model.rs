use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One observation of a metric for an entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeriesPoint {
    pub entity: String,
    pub metric: String,
    pub value: f64,
    pub timestamp: i64,
    pub source: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricMetadata {
    pub name: String,
    pub description: String,
    pub scope: String,
    pub freq: String,
    pub period: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<String>,
}

impl MetricMetadata {
    /// Seed entry written by `setup` when the metadata collection is empty.
    pub fn default_seed() -> Vec<MetricMetadata> {
        vec![MetricMetadata {
            name: "TVL".to_string(),
            description: "Total Value Locked".to_string(),
            scope: "chain".to_string(),
            freq: "daily".to_string(),
            period: "1d".to_string(),
            sources: Vec::new(),
        }]
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricMetadataList {
    pub metrics: Vec<MetricMetadata>,
}

/// Structured query produced from a natural-language question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityFilter {
    pub entity: String,
    #[serde(default)]
    pub filter: Map<String, Value>,
}

impl EntityFilter {
    pub fn metric(&self) -> Option<&str> {
        self.filter.get("metric").and_then(Value::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricDefinition {
    pub name: String,
    pub value_path: String,
    pub entity_path: String,
    pub timestamp_path: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricMapping {
    pub name: String,
    pub value_path: String,
}

/// Where entities, timestamps and metric values live inside a raw payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappingRules {
    pub entity_base_path: String,
    pub default_entity_field: String,
    pub default_timestamp_field: String,
    pub metrics: Vec<MetricMapping>,
}

/// A crawled JSON document as delivered by a data source.
#[derive(Debug, Clone)]
pub struct RawPayload {
    pub source: String,
    pub body: Value,
}

impl RawPayload {
    pub fn new(source: impl Into<String>, body: Value) -> Self {
        Self {
            source: source.into(),
            body,
        }
    }

    /// Extractor key; payloads without a `type` share the empty key.
    pub fn data_type(&self) -> &str {
        self.body.get("type").and_then(Value::as_str).unwrap_or("")
    }

    pub fn url(&self) -> Option<&str> {
        self.body.get("url").and_then(Value::as_str)
    }
}

/// Documents ready for the metric store plus any metadata discovered on the way.
#[derive(Debug, Clone, Default)]
pub struct IngestBatch {
    pub documents: Vec<Value>,
    pub metadata: Vec<MetricMetadata>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LoadReport {
    pub inserted: usize,
    pub metadata_initialized: bool,
    pub metadata_upserted: usize,
}

/// Latest reading per data source.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceSummary {
    pub source: String,
    pub latest_value: f64,
    pub latest_timestamp: i64,
}

/// Result of answering one question.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOutcome {
    Answer(String),
    NoEntity,
    NoMetadata { entity: String },
    NoData,
}

impl std::fmt::Display for QueryOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QueryOutcome::Answer(text) => write!(f, "{}", text),
            QueryOutcome::NoEntity => write!(f, "No entity or metric found"),
            QueryOutcome::NoMetadata { entity } => {
                write!(f, "No metadata found for entity: {}", entity)
            }
            QueryOutcome::NoData => write!(f, "No data found for the given query"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceFormat {
    /// Already shaped as metric documents.
    #[default]
    Points,
    /// Arbitrary crawl output, converted through the extractor registry.
    Raw,
}

/// One entry of `[[sources]]` in the app config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceConfig {
    pub name: String,
    pub uri: String,
    #[serde(default)]
    pub format: SourceFormat,
    pub entity_field: Option<String>,
    pub timestamp_field: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }
}

/// Per-call overrides for a chat completion.
#[derive(Debug, Clone, Default)]
pub struct ChatOptions {
    pub model: Option<String>,
    pub system_message: Option<String>,
    pub history: Vec<ChatMessage>,
}

impl ChatOptions {
    pub fn with_model(model: impl Into<String>) -> Self {
        Self {
            model: Some(model.into()),
            ..Default::default()
        }
    }
}
