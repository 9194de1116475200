//! Prompt templates for the two ask-flow calls and metadata generation.
//! Placeholders are `{name}` and are substituted with [`render`].

use regex::Regex;
use std::sync::OnceLock;

pub const EXTRACT_QUERY_TEMPLATE: &str = r#"You help query a metric time-series database.
Pick the single entity and the smallest filter that answers the question,
using the metric metadata available across data sources.
Reply with JSON only.

# metadata
{metadata}

# document schema
{
    _id: int,
    entity: str (value of the entity, e.g. a chain name or wallet address),
    metric: str,
    value: float,
    timestamp: int (unix seconds),
    source: str
}

# question
{question}

# output example for "ethereum tvl since yyyy-mm-dd" (no comments)
{
    "entity": "Ethereum",
    "filter": {
        "metric": "TVL",
        "timestamp": {"$gte": 1736215200}
    }
}

# answer
"#;

pub const ANSWER_TEMPLATE: &str = r#"You answer questions about metrics.
Prefer the more trusted data source and use common sense.

# metadata
{metadata}

# context
{context}

current time: {current_time}

# question
{question}
"#;

pub const METADATA_SCHEMA_TEMPLATE: &str = r#"Convert the raw crawl data below into time-series metric metadata.
Reply with JSON: an object with a "metrics" key holding a list of metadata objects.

## example metadata schema
{"metrics": [{metadata}]}

## example raw data
{sample_data}

## answer
"#;

fn placeholder_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{(\w+)\}").expect("valid placeholder regex"))
}

/// Replaces every `{key}` in `template` in one pass, so substituted values are
/// never expanded again. Braces that do not name a given key are left alone,
/// so literal JSON in a template needs no escaping.
pub fn render(template: &str, values: &[(&str, &str)]) -> String {
    placeholder_pattern()
        .replace_all(template, |caps: &regex::Captures| {
            values
                .iter()
                .find(|(key, _)| *key == &caps[1])
                .map_or_else(|| caps[0].to_string(), |(_, value)| value.to_string())
        })
        .into_owned()
}
