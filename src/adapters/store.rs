//! File-backed document store for metric time series and metric metadata.
//!
//! Each collection is a JSON array in its own file under the storage root.
//! Queries follow document-store semantics: string filters match
//! case-insensitively, object filters hold comparison operators
//! (`$gt`, `$gte`, `$lt`, `$lte`, `$eq`, `$ne`, `$in`).

use crate::domain::model::{MetricMetadata, SourceSummary, TimeSeriesPoint};
use crate::domain::ports::Storage;
use crate::utils::error::{MetricsError, Result};
use crate::utils::time::{convert_iso_to_timestamp, parse_iso_timestamp};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use tokio::sync::Mutex;

pub const METRICS_COLLECTION: &str = "metric_data.json";
pub const METADATA_COLLECTION: &str = "metric_metadata.json";

const REQUIRED_FIELDS: [&str; 4] = ["entity", "metric", "value", "timestamp"];

pub struct MetricStore<S: Storage> {
    storage: S,
    // read-modify-write cycles on the collection files
    write_lock: Mutex<()>,
}

impl<S: Storage> MetricStore<S> {
    pub fn new(storage: S) -> Self {
        Self {
            storage,
            write_lock: Mutex::new(()),
        }
    }

    async fn read_collection<T: DeserializeOwned>(&self, name: &str) -> Result<Vec<T>> {
        match self.storage.read_file(name).await {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Ok(Vec::new()),
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| MetricsError::StoreError {
                message: format!("Collection {} is corrupt: {}", name, e),
            }),
            Err(MetricsError::IoError(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                Ok(Vec::new())
            }
            Err(e) => Err(e),
        }
    }

    async fn write_collection<T: Serialize>(&self, name: &str, documents: &[T]) -> Result<()> {
        let data = serde_json::to_vec_pretty(documents)?;
        self.storage.write_file(name, &data).await
    }

    /// Validates and appends metric documents, returning their assigned ids.
    pub async fn insert_metrics(&self, metrics: Vec<Value>) -> Result<Vec<u64>> {
        if metrics.is_empty() {
            return Err(MetricsError::ValidationError {
                message: "Cannot insert empty metrics list".to_string(),
            });
        }

        let normalized = metrics
            .into_iter()
            .map(normalize_document)
            .collect::<Result<Vec<_>>>()
            .inspect_err(|e| {
                tracing::error!(error = %e, "metrics_insertion_failed");
            })?;

        let _guard = self.write_lock.lock().await;
        let mut documents: Vec<Value> = self.read_collection(METRICS_COLLECTION).await?;

        let mut next_id = documents
            .iter()
            .filter_map(|doc| doc.get("_id").and_then(Value::as_u64))
            .max()
            .map_or(1, |max| max + 1);

        let total_records = normalized.len();
        let mut inserted_ids = Vec::with_capacity(total_records);
        for mut doc in normalized {
            if let Value::Object(map) = &mut doc {
                map.insert("_id".to_string(), Value::from(next_id));
            }
            inserted_ids.push(next_id);
            documents.push(doc);
            next_id += 1;
        }

        self.write_collection(METRICS_COLLECTION, &documents).await?;

        tracing::info!(
            inserted_count = inserted_ids.len(),
            total_records,
            "metrics_insertion_completed"
        );
        Ok(inserted_ids)
    }

    pub async fn insert_points(&self, points: &[TimeSeriesPoint]) -> Result<Vec<u64>> {
        let documents = points
            .iter()
            .map(serde_json::to_value)
            .collect::<std::result::Result<Vec<_>, _>>()?;
        self.insert_metrics(documents).await
    }

    pub async fn all_metrics(&self) -> Result<Vec<Value>> {
        self.read_collection(METRICS_COLLECTION).await
    }

    /// Newest `limit` documents matching `entity` and `filters`.
    pub async fn query_latest(
        &self,
        entity: Option<&str>,
        filters: &Map<String, Value>,
        limit: usize,
    ) -> Result<Vec<Value>> {
        let query = serde_json::Value::Object(filters.clone());
        tracing::info!(
            entity = entity.unwrap_or("*"),
            query = %query,
            limit,
            "executing_query"
        );

        let mut matched: Vec<Value> = self
            .all_metrics()
            .await?
            .into_iter()
            .filter(|doc| matches_document(doc, entity, filters))
            .collect();

        sort_newest_first(&mut matched);
        matched.truncate(limit);

        if matched.is_empty() {
            tracing::info!("No documents found for query");
        }
        Ok(matched)
    }

    /// Every matching document inside the inclusive `[start, end]` window, newest first.
    pub async fn query_metrics(
        &self,
        entity: Option<&str>,
        start: Option<i64>,
        end: Option<i64>,
        filters: &Map<String, Value>,
    ) -> Result<Vec<Value>> {
        let mut matched: Vec<Value> = self
            .all_metrics()
            .await?
            .into_iter()
            .filter(|doc| matches_document(doc, entity, filters))
            .filter(|doc| {
                let ts = timestamp_of(doc);
                start.is_none_or(|s| ts.is_some_and(|t| t >= s))
                    && end.is_none_or(|e| ts.is_some_and(|t| t <= e))
            })
            .collect();

        sort_newest_first(&mut matched);
        Ok(matched)
    }

    /// Latest reading per source, most recent source first.
    pub async fn compare_sources(&self, entity: Option<&str>) -> Result<Vec<SourceSummary>> {
        let mut latest: BTreeMap<String, SourceSummary> = BTreeMap::new();

        for doc in self.all_metrics().await? {
            if !matches_document(&doc, entity, &Map::new()) {
                continue;
            }
            let (Some(timestamp), Some(value)) =
                (timestamp_of(&doc), doc.get("value").and_then(Value::as_f64))
            else {
                continue;
            };
            let source = doc
                .get("source")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();

            let entry = latest.entry(source.clone()).or_insert(SourceSummary {
                source,
                latest_value: value,
                latest_timestamp: timestamp,
            });
            if timestamp >= entry.latest_timestamp {
                entry.latest_value = value;
                entry.latest_timestamp = timestamp;
            }
        }

        let mut summaries: Vec<SourceSummary> = latest.into_values().collect();
        summaries.sort_by(|a, b| b.latest_timestamp.cmp(&a.latest_timestamp));
        Ok(summaries)
    }

    pub async fn all_metadata(&self) -> Result<Vec<MetricMetadata>> {
        self.read_collection(METADATA_COLLECTION).await
    }

    /// Metadata lookup by metric name, ignoring case.
    pub async fn find_metadata(&self, name: &str) -> Result<Option<MetricMetadata>> {
        let wanted = name.to_lowercase();
        Ok(self
            .all_metadata()
            .await?
            .into_iter()
            .find(|m| m.name.to_lowercase() == wanted))
    }

    /// Seeds the metadata collection unless the first entry already exists.
    pub async fn init_metadata(&self, metadata: &[MetricMetadata]) -> Result<bool> {
        let Some(first) = metadata.first() else {
            return Ok(false);
        };

        let _guard = self.write_lock.lock().await;
        let mut existing: Vec<MetricMetadata> = self.read_collection(METADATA_COLLECTION).await?;
        if existing.iter().any(|m| m.name.eq_ignore_ascii_case(&first.name)) {
            tracing::debug!("Metadata already exists");
            return Ok(false);
        }

        existing.extend(metadata.iter().cloned());
        self.write_collection(METADATA_COLLECTION, &existing).await?;
        tracing::debug!("Metadata initialized successfully: {} documents", metadata.len());
        Ok(true)
    }

    /// Inserts or replaces metadata entries by name.
    pub async fn upsert_metadata(&self, metadata: &[MetricMetadata]) -> Result<usize> {
        let _guard = self.write_lock.lock().await;
        let mut existing: Vec<MetricMetadata> = self.read_collection(METADATA_COLLECTION).await?;

        for entry in metadata {
            match existing
                .iter_mut()
                .find(|m| m.name.eq_ignore_ascii_case(&entry.name))
            {
                Some(slot) => *slot = entry.clone(),
                None => existing.push(entry.clone()),
            }
        }

        self.write_collection(METADATA_COLLECTION, &existing).await?;
        Ok(metadata.len())
    }
}

fn normalize_document(mut doc: Value) -> Result<Value> {
    let missing = REQUIRED_FIELDS
        .iter()
        .any(|field| doc.get(field).is_none_or(Value::is_null));
    if !doc.is_object() || missing {
        return Err(MetricsError::ValidationError {
            message: format!("Missing required fields in metric: {}", doc),
        });
    }

    let invalid = |reason: &str, doc: &Value| MetricsError::ValidationError {
        message: format!("{} in metric: {}", reason, doc),
    };

    let timestamp = match &doc["timestamp"] {
        Value::String(s) => convert_iso_to_timestamp(s),
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        _ => None,
    }
    .ok_or_else(|| invalid("Invalid timestamp", &doc))?;

    let value = match &doc["value"] {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|v| v.is_finite())
    .ok_or_else(|| invalid("Non-numeric value", &doc))?;

    let entity = match &doc["entity"] {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        _ => return Err(invalid("Invalid entity", &doc)),
    };

    if let Value::Object(map) = &mut doc {
        map.insert("timestamp".to_string(), Value::from(timestamp));
        map.insert("value".to_string(), Value::from(value));
        map.insert("entity".to_string(), Value::String(entity));
        map.entry("source").or_insert_with(|| Value::String(String::new()));
    }
    Ok(doc)
}

fn timestamp_of(doc: &Value) -> Option<i64> {
    doc.get("timestamp").and_then(Value::as_i64)
}

fn sort_newest_first(documents: &mut [Value]) {
    documents.sort_by(|a, b| timestamp_of(b).cmp(&timestamp_of(a)));
}

pub(crate) fn matches_document(doc: &Value, entity: Option<&str>, filters: &Map<String, Value>) -> bool {
    if let Some(entity) = entity {
        if doc.get("entity").and_then(Value::as_str) != Some(entity) {
            return false;
        }
    }

    filters
        .iter()
        .all(|(key, condition)| matches_condition(doc.get(key), condition))
}

fn matches_condition(field: Option<&Value>, condition: &Value) -> bool {
    match condition {
        Value::Object(ops) if !ops.is_empty() && ops.keys().all(|k| k.starts_with('$')) => ops
            .iter()
            .all(|(op, operand)| apply_operator(field, op, operand)),
        Value::String(expected) => field
            .and_then(Value::as_str)
            .is_some_and(|actual| actual.to_lowercase() == expected.to_lowercase()),
        other => field.is_some_and(|actual| compare_values(actual, other) == Some(Ordering::Equal)),
    }
}

fn apply_operator(field: Option<&Value>, op: &str, operand: &Value) -> bool {
    let ordering = field.and_then(|actual| compare_values(actual, operand));
    match op {
        "$eq" => ordering == Some(Ordering::Equal),
        "$ne" => ordering != Some(Ordering::Equal),
        "$gt" => ordering == Some(Ordering::Greater),
        "$gte" => matches!(ordering, Some(Ordering::Greater | Ordering::Equal)),
        "$lt" => ordering == Some(Ordering::Less),
        "$lte" => matches!(ordering, Some(Ordering::Less | Ordering::Equal)),
        "$in" => operand.as_array().is_some_and(|candidates| {
            field.is_some_and(|actual| {
                candidates
                    .iter()
                    .any(|c| compare_values(actual, c) == Some(Ordering::Equal))
            })
        }),
        unknown => {
            tracing::warn!("Unsupported filter operator: {}", unknown);
            false
        }
    }
}

/// Orders two JSON scalars. A date string compared with a number is read as
/// unix seconds.
fn compare_values(actual: &Value, expected: &Value) -> Option<Ordering> {
    match (actual, expected) {
        (Value::Number(a), Value::Number(b)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        (Value::Number(a), Value::String(b)) => {
            let b = b.parse::<f64>().ok().or_else(|| parse_iso_timestamp(b).map(|t| t as f64))?;
            a.as_f64()?.partial_cmp(&b)
        }
        (Value::String(a), Value::Number(b)) => {
            let a = a.parse::<f64>().ok()?;
            a.partial_cmp(&b.as_f64()?)
        }
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        (Value::Null, Value::Null) => Some(Ordering::Equal),
        _ => None,
    }
}
