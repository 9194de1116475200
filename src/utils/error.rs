use thiserror::Error;

#[derive(Error, Debug)]
pub enum MetricsError {
    #[error("HTTP request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("LLM request failed with status {status}: {message}")]
    LlmError { status: u16, message: String },

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration validation failed for '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Data processing error: {message}")]
    ProcessingError { message: String },

    #[error("Extraction error: {message}")]
    ExtractionError { message: String },

    #[error("Metric store error: {message}")]
    StoreError { message: String },

    #[error("Validation error: {message}")]
    ValidationError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Llm,
    Configuration,
    Data,
    Storage,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl MetricsError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            MetricsError::ApiError(_) => ErrorCategory::Network,
            MetricsError::LlmError { .. } => ErrorCategory::Llm,
            MetricsError::ConfigError { .. }
            | MetricsError::ConfigValidationError { .. }
            | MetricsError::InvalidConfigValueError { .. }
            | MetricsError::MissingConfigError { .. } => ErrorCategory::Configuration,
            MetricsError::SerializationError(_)
            | MetricsError::ProcessingError { .. }
            | MetricsError::ExtractionError { .. }
            | MetricsError::ValidationError { .. } => ErrorCategory::Data,
            MetricsError::StoreError { .. } => ErrorCategory::Storage,
            MetricsError::IoError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            // 網路或 LLM 暫時性錯誤，可重試
            MetricsError::ApiError(_) => ErrorSeverity::Medium,
            MetricsError::LlmError { status, .. } if *status == 429 || *status >= 500 => {
                ErrorSeverity::Medium
            }
            MetricsError::LlmError { .. } => ErrorSeverity::High,
            MetricsError::ConfigError { .. }
            | MetricsError::ConfigValidationError { .. }
            | MetricsError::InvalidConfigValueError { .. }
            | MetricsError::MissingConfigError { .. } => ErrorSeverity::High,
            MetricsError::SerializationError(_)
            | MetricsError::ProcessingError { .. }
            | MetricsError::ExtractionError { .. }
            | MetricsError::ValidationError { .. } => ErrorSeverity::High,
            MetricsError::StoreError { .. } | MetricsError::IoError(_) => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> String {
        match self {
            MetricsError::ApiError(_) => {
                "Check network connectivity and that the endpoint is reachable, then retry".to_string()
            }
            MetricsError::LlmError { status: 401, .. } | MetricsError::LlmError { status: 403, .. } => {
                "Check that OPENAI_API_KEY (or llm.api_key) is set and valid".to_string()
            }
            MetricsError::LlmError { status: 429, .. } => {
                "The LLM provider is rate limiting requests; wait and retry".to_string()
            }
            MetricsError::LlmError { .. } => {
                "Verify llm.base_url and llm.model point at a chat-completions compatible API".to_string()
            }
            MetricsError::ConfigError { .. }
            | MetricsError::ConfigValidationError { .. }
            | MetricsError::InvalidConfigValueError { .. }
            | MetricsError::MissingConfigError { .. } => {
                "Review nl2metrics.toml and the command line flags".to_string()
            }
            MetricsError::SerializationError(_) => {
                "Make sure the input is valid JSON".to_string()
            }
            MetricsError::ExtractionError { .. } => {
                "Check --entity-field and --timestamp-field against the payload structure".to_string()
            }
            MetricsError::ValidationError { .. } | MetricsError::ProcessingError { .. } => {
                "Fix the offending records and run the command again".to_string()
            }
            MetricsError::StoreError { .. } | MetricsError::IoError(_) => {
                "Check that the store directory (MAIN_STORE_URI) exists and is writable".to_string()
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Network => format!("Could not reach a remote service: {}", self),
            ErrorCategory::Llm => format!("The language model request failed: {}", self),
            ErrorCategory::Configuration => format!("Invalid configuration: {}", self),
            ErrorCategory::Data => format!("Could not process data: {}", self),
            ErrorCategory::Storage => format!("Metric store failure: {}", self),
            ErrorCategory::System => format!("System error: {}", self),
        }
    }

    /// Exit code used by the CLI for this error.
    pub fn exit_code(&self) -> i32 {
        match self.severity() {
            ErrorSeverity::Low => 0,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        }
    }
}

pub type Result<T> = std::result::Result<T, MetricsError>;
