pub mod app_config;
pub mod cli;

pub use app_config::AppConfig;

#[cfg(feature = "cli")]
pub use args::{Cli, Command};

#[cfg(feature = "cli")]
mod args {
    use crate::utils::formatters::MetricNameFormat;
    use clap::{Parser, Subcommand};
    use std::path::PathBuf;

    #[derive(Debug, Clone, Parser)]
    #[command(name = "nl2metrics")]
    #[command(about = "Ask natural-language questions about on-chain metrics")]
    pub struct Cli {
        /// TOML config file; skipped when missing
        #[arg(long, global = true, default_value = "nl2metrics.toml")]
        pub config: PathBuf,

        /// Metric store root (path or file:// URI)
        #[arg(long, global = true, env = "MAIN_STORE_URI")]
        pub store: Option<String>,

        /// Chat model for every LLM call
        #[arg(long, global = true, env = "LLM_MODEL")]
        pub model: Option<String>,

        #[arg(short, long, global = true, help = "Enable verbose output")]
        pub verbose: bool,

        #[arg(long, global = true, help = "Emit logs as JSON lines")]
        pub json_logs: bool,

        #[command(subcommand)]
        pub command: Command,
    }

    #[derive(Debug, Clone, Subcommand)]
    pub enum Command {
        /// Answer questions from the metric store
        Ask {
            /// Questions to answer; a built-in list is used when empty
            questions: Vec<String>,
        },
        /// Load configured sources into the store and seed metadata
        Setup {
            #[arg(long)]
            skip_metadata: bool,
            /// Describe metrics of raw sources through the LLM
            #[arg(long)]
            with_metadata: bool,
        },
        /// Extract time series from a raw JSON payload
        Convert {
            #[arg(long)]
            input: String,
            #[arg(long)]
            entity_field: String,
            #[arg(long, default_value = "created_at")]
            timestamp_field: String,
            #[arg(long, value_enum, default_value_t = MetricNameFormat::Slug)]
            name_format: MetricNameFormat,
            /// Also generate metric metadata through the LLM
            #[arg(long)]
            with_metadata: bool,
            /// Write points (and metadata) into the store
            #[arg(long)]
            insert: bool,
        },
        /// Generate metric metadata for a raw JSON payload
        Metadata {
            #[arg(long)]
            input: String,
            #[arg(long)]
            entity_field: String,
        },
        /// Latest value per data source
        Sources {
            #[arg(long)]
            entity: Option<String>,
        },
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_parse_ask_with_questions() {
            let cli = Cli::try_parse_from([
                "nl2metrics",
                "--store",
                "/tmp/store",
                "ask",
                "what is the tvl of base",
                "eth tvl",
            ])
            .unwrap();

            assert_eq!(cli.store.as_deref(), Some("/tmp/store"));
            match cli.command {
                Command::Ask { questions } => assert_eq!(questions.len(), 2),
                other => panic!("unexpected command: {other:?}"),
            }
        }

        #[test]
        fn test_parse_convert_defaults() {
            let cli = Cli::try_parse_from([
                "nl2metrics",
                "convert",
                "--input",
                "raw.json",
                "--entity-field",
                "wallet_address",
                "-v",
            ])
            .unwrap();

            assert!(cli.verbose);
            match cli.command {
                Command::Convert {
                    timestamp_field,
                    name_format,
                    with_metadata,
                    insert,
                    ..
                } => {
                    assert_eq!(timestamp_field, "created_at");
                    assert_eq!(name_format, MetricNameFormat::Slug);
                    assert!(!with_metadata);
                    assert!(!insert);
                }
                other => panic!("unexpected command: {other:?}"),
            }
        }

        #[test]
        fn test_parse_setup_flags() {
            let cli = Cli::try_parse_from(["nl2metrics", "setup", "--with-metadata"]).unwrap();

            match cli.command {
                Command::Setup {
                    skip_metadata,
                    with_metadata,
                } => {
                    assert!(!skip_metadata);
                    assert!(with_metadata);
                }
                other => panic!("unexpected command: {other:?}"),
            }
        }

        #[test]
        fn test_convert_requires_entity_field() {
            assert!(Cli::try_parse_from(["nl2metrics", "convert", "--input", "raw.json"]).is_err());
        }
    }
}
