use clap::Parser;
use nl2metrics::core::convert::{process_data, ConvertOptions};
use nl2metrics::core::extractor::GenericExtractor;
use nl2metrics::core::metadata_generator::generate_metadata_schema;
use nl2metrics::core::sources::load_raw_data;
use nl2metrics::core::ChatClient;
use nl2metrics::domain::model::{ChatOptions, RawPayload};
use nl2metrics::domain::ports::ConfigProvider;
use nl2metrics::utils::error::ErrorSeverity;
use nl2metrics::utils::{logger, validation::Validate};
use nl2metrics::{
    AppConfig, Cli, Command, EtlEngine, ExtractorRegistry, IngestPipeline, LocalStorage,
    MetricStore, OpenAiChatClient, Result, TsQuery,
};
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;

const DEFAULT_QUESTIONS: [&str; 4] = [
    "what is the tvl of Base",
    "what is Ethereum tvl since 2025-01-01",
    "what is wallet CWvdyvKHEu8Z6QqGraJT3sLPyp9bJfFhoXcxUYRKC8ou realized profit",
    "what is wallet CWvdyvKHEu8Z6QqGraJT3sLPyp9bJfFhoXcxUYRKC8ou pnl",
];

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // 初始化日誌
    if cli.json_logs {
        logger::init_json_logger(cli.verbose);
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    if let Err(e) = run(cli).await {
        tracing::error!(
            "❌ nl2metrics failed: {} (Category: {:?}, Severity: {:?})",
            e,
            e.category(),
            e.severity()
        );
        tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

        eprintln!("❌ {}", e.user_friendly_message());
        eprintln!("💡 Suggestion: {}", e.recovery_suggestion());

        if e.severity() != ErrorSeverity::Low {
            std::process::exit(e.exit_code());
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = AppConfig::load(&cli.config)?.with_overrides(cli.store, cli.model);
    tracing::debug!("Config: {:?}", config.store);

    // 驗證配置
    config.validate()?;

    let store = Arc::new(MetricStore::new(LocalStorage::from_uri(config.store_uri())));

    match cli.command {
        Command::Ask { questions } => {
            let chat = Arc::new(OpenAiChatClient::new(config.llm.clone())?);
            let engine = TsQuery::new(store, chat, config.model()).with_limit(config.query_limit());

            let questions = if questions.is_empty() {
                DEFAULT_QUESTIONS.iter().map(|q| q.to_string()).collect()
            } else {
                questions
            };
            for question in questions {
                let outcome = engine.get_response(&question).await?;
                println!("{}", outcome);
            }
        }
        Command::Setup {
            skip_metadata,
            with_metadata,
        } => {
            tracing::info!("Starting setup with {} sources", config.sources().len());
            let mut pipeline = IngestPipeline::new(store, config.clone());
            if skip_metadata {
                pipeline = pipeline.skip_metadata();
            }
            if with_metadata {
                let chat: Arc<dyn ChatClient> = Arc::new(OpenAiChatClient::new(config.llm.clone())?);
                pipeline = pipeline.with_metadata_generator(chat);
            }
            let report = EtlEngine::new(pipeline).run().await?;
            print_json(&report)?;
        }
        Command::Convert {
            input,
            entity_field,
            timestamp_field,
            name_format,
            with_metadata,
            insert,
        } => {
            let body = load_raw_data(&input, &reqwest::Client::new()).await?;
            let payload = RawPayload::new(input, body);
            let options = ConvertOptions::new(entity_field)
                .timestamp_field(timestamp_field)
                .name_format(name_format);
            let chat_options = ChatOptions::with_model(config.model());
            let chat = if with_metadata {
                Some(OpenAiChatClient::new(config.llm.clone())?)
            } else {
                None
            };

            let mut registry = ExtractorRegistry::new();
            let (points, schema) = process_data(
                &payload,
                &mut registry,
                &options,
                chat.as_ref().map(|c| (c as &dyn ChatClient, &chat_options)),
            )
            .await?;

            if insert {
                if !points.is_empty() {
                    store.insert_points(&points).await?;
                }
                if !schema.is_empty() {
                    store.upsert_metadata(&schema).await?;
                }
            }
            print_json(&json!({ "points": points, "schema": schema }))?;
        }
        Command::Metadata {
            input,
            entity_field,
        } => {
            let body = load_raw_data(&input, &reqwest::Client::new()).await?;
            let (sample_item, _) = GenericExtractor::extract_sample_item(&body, &entity_field)?;
            let chat = OpenAiChatClient::new(config.llm.clone())?;
            let schema = generate_metadata_schema(
                &Value::Object(sample_item.clone()),
                &chat,
                &ChatOptions::with_model(config.model()),
            )
            .await?;
            print_json(&schema)?;
        }
        Command::Sources { entity } => {
            let summaries = store.compare_sources(entity.as_deref()).await?;
            if summaries.is_empty() {
                tracing::warn!("No metric documents in store");
            }
            print_json(&summaries)?;
        }
    }

    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
