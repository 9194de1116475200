use crate::utils::error::{MetricsError, Result};
use reqwest::Client;
use serde_json::Value;
use std::path::PathBuf;

/// Where a raw data source lives.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceLocation {
    File(PathBuf),
    Http(String),
}

impl SourceLocation {
    pub fn parse(uri: &str) -> Result<Self> {
        if uri.starts_with("http://") || uri.starts_with("https://") {
            return Ok(SourceLocation::Http(uri.to_string()));
        }
        if let Some(path) = uri.strip_prefix("file://") {
            return Ok(SourceLocation::File(PathBuf::from(path)));
        }
        if uri.contains("://") {
            return Err(MetricsError::InvalidConfigValueError {
                field: "uri".to_string(),
                value: uri.to_string(),
                reason: "Only file://, http:// and https:// sources are supported".to_string(),
            });
        }
        Ok(SourceLocation::File(PathBuf::from(uri)))
    }
}

/// Loads a JSON document from a file path, a `file://` URI or an HTTP(S) URL.
pub async fn load_raw_data(uri: &str, client: &Client) -> Result<Value> {
    let data = match SourceLocation::parse(uri)? {
        SourceLocation::File(path) => {
            let bytes = tokio::fs::read(&path).await.map_err(|e| {
                tracing::error!("Failed to load data from {}: {}", uri, e);
                e
            })?;
            serde_json::from_slice::<Value>(&bytes)?
        }
        SourceLocation::Http(url) => {
            let response = client.get(&url).send().await?;
            let status = response.status();
            tracing::info!("HTTP Request: GET {} \"{}\"", url, status);
            if !status.is_success() {
                return Err(MetricsError::ProcessingError {
                    message: format!("Fetching {} failed with status {}", url, status),
                });
            }
            response.json::<Value>().await?
        }
    };

    tracing::info!("Successfully loaded {} records from {}", record_count(&data), uri);
    Ok(data)
}

fn record_count(data: &Value) -> usize {
    match data {
        Value::Array(items) => items.len(),
        Value::Object(map) => map.len(),
        _ => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_parse_source_location() {
        assert_eq!(
            SourceLocation::parse("file:///data/raw.json").unwrap(),
            SourceLocation::File(PathBuf::from("/data/raw.json"))
        );
        assert_eq!(
            SourceLocation::parse("data/raw.json").unwrap(),
            SourceLocation::File(PathBuf::from("data/raw.json"))
        );
        assert_eq!(
            SourceLocation::parse("https://api.llama.fi/v2/chains").unwrap(),
            SourceLocation::Http("https://api.llama.fi/v2/chains".to_string())
        );
        assert!(SourceLocation::parse("s3://bucket/raw.json").is_err());
    }

    #[tokio::test]
    async fn test_load_from_file_uri() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("raw.json");
        std::fs::write(&path, r#"[{"entity": "Base"}, {"entity": "Ethereum"}]"#).unwrap();

        let uri = format!("file://{}", path.display());
        let data = load_raw_data(&uri, &Client::new()).await.unwrap();

        assert_eq!(data.as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_load_missing_file_is_io_error() {
        let result = load_raw_data("/definitely/not/here.json", &Client::new()).await;
        assert!(matches!(result, Err(MetricsError::IoError(_))));
    }

    #[tokio::test]
    async fn test_load_from_http() {
        let server = MockServer::start();
        let api_mock = server.mock(|when, then| {
            when.method(GET).path("/chains");
            then.status(200).json_body(json!([{"chain": "Base", "tvl": 3.1}]));
        });

        let data = load_raw_data(&server.url("/chains"), &Client::new()).await.unwrap();

        api_mock.assert();
        assert_eq!(data[0]["chain"], "Base");
    }

    #[tokio::test]
    async fn test_load_http_error_status() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/chains");
            then.status(500);
        });

        let result = load_raw_data(&server.url("/chains"), &Client::new()).await;
        assert!(matches!(result, Err(MetricsError::ProcessingError { .. })));
    }
}
