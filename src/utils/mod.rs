pub mod error;
pub mod formatters;
pub mod json_extract;
pub mod json_path;
pub mod logger;
pub mod time;
pub mod validation;
