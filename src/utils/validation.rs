use crate::utils::error::{MetricsError, Result};
use url::Url;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

pub fn validate_url(field_name: &str, url_str: &str) -> Result<()> {
    if url_str.is_empty() {
        return Err(MetricsError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: url_str.to_string(),
            reason: "URL cannot be empty".to_string(),
        });
    }

    match Url::parse(url_str) {
        Ok(url) => match url.scheme() {
            "http" | "https" => Ok(()),
            scheme => Err(MetricsError::InvalidConfigValueError {
                field: field_name.to_string(),
                value: url_str.to_string(),
                reason: format!("Unsupported URL scheme: {}", scheme),
            }),
        },
        Err(e) => Err(MetricsError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: url_str.to_string(),
            reason: format!("Invalid URL format: {}", e),
        }),
    }
}

/// A data source location: a plain path, a `file://` URI or an http(s) URL.
pub fn validate_source_uri(field_name: &str, uri: &str) -> Result<()> {
    if uri.starts_with("http://") || uri.starts_with("https://") {
        return validate_url(field_name, uri);
    }

    if let Some(rest) = uri.strip_prefix("file://") {
        return validate_path(field_name, rest);
    }

    if uri.contains("://") {
        return Err(MetricsError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: uri.to_string(),
            reason: "Only file://, http:// and https:// sources are supported".to_string(),
        });
    }

    validate_path(field_name, uri)
}

pub fn validate_path(field_name: &str, path: &str) -> Result<()> {
    if path.is_empty() {
        return Err(MetricsError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path cannot be empty".to_string(),
        });
    }

    if path.contains('\0') {
        return Err(MetricsError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path contains null bytes".to_string(),
        });
    }

    Ok(())
}

pub fn validate_required_field<'a, T>(field_name: &str, value: &'a Option<T>) -> Result<&'a T> {
    value.as_ref().ok_or_else(|| MetricsError::MissingConfigError {
        field: field_name.to_string(),
    })
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(MetricsError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: "Value cannot be empty or whitespace-only".to_string(),
        });
    }
    Ok(())
}

pub fn validate_range<T: PartialOrd + std::fmt::Display + Copy>(
    field_name: &str,
    value: T,
    min: T,
    max: T,
) -> Result<()> {
    if value < min || value > max {
        return Err(MetricsError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be between {} and {}", min, max),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_url() {
        assert!(validate_url("llm.base_url", "https://api.openai.com/v1").is_ok());
        assert!(validate_url("llm.base_url", "http://localhost:1234/v1").is_ok());
        assert!(validate_url("llm.base_url", "").is_err());
        assert!(validate_url("llm.base_url", "invalid-url").is_err());
        assert!(validate_url("llm.base_url", "ftp://example.com").is_err());
    }

    #[test]
    fn test_validate_source_uri() {
        assert!(validate_source_uri("sources.uri", "data/tvl.json").is_ok());
        assert!(validate_source_uri("sources.uri", "file:///tmp/tvl.json").is_ok());
        assert!(validate_source_uri("sources.uri", "https://api.llama.fi/chains").is_ok());
        assert!(validate_source_uri("sources.uri", "s3://bucket/key.json").is_err());
        assert!(validate_source_uri("sources.uri", "").is_err());
    }

    #[test]
    fn test_validate_range_and_required() {
        assert!(validate_range("store.query_limit", 5, 1, 100).is_ok());
        assert!(validate_range("store.query_limit", 0, 1, 100).is_err());

        let missing: Option<String> = None;
        assert!(matches!(
            validate_required_field("sources.entity_field", &missing),
            Err(MetricsError::MissingConfigError { .. })
        ));
    }
}
