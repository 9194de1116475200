use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[serde(rename_all = "lowercase")]
pub enum MetricNameFormat {
    Raw,
    Title,
    Upper,
    #[default]
    Slug,
}

pub fn format_metric_name(name: &str, format_style: MetricNameFormat) -> String {
    match format_style {
        MetricNameFormat::Raw => name.to_string(),
        MetricNameFormat::Title => title_case(&name.replace('_', " ")),
        MetricNameFormat::Upper => name.to_uppercase(),
        MetricNameFormat::Slug => slugify(name),
    }
}

/// Lowercase, with every run of non-alphanumeric characters collapsed to `-`.
/// Non-ASCII letters are kept as they are, not transliterated.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_dash = false;

    for ch in name.chars() {
        if ch.is_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.extend(ch.to_lowercase());
        } else {
            pending_dash = true;
        }
    }

    slug
}

fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut at_word_start = true;

    for ch in text.chars() {
        if ch.is_alphabetic() {
            if at_word_start {
                out.extend(ch.to_uppercase());
            } else {
                out.extend(ch.to_lowercase());
            }
            at_word_start = false;
        } else {
            out.push(ch);
            at_word_start = true;
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_metric_name_styles() {
        assert_eq!(format_metric_name("realized_profit_7d", MetricNameFormat::Raw), "realized_profit_7d");
        assert_eq!(format_metric_name("realized_profit_7d", MetricNameFormat::Title), "Realized Profit 7D");
        assert_eq!(format_metric_name("pnl_30d", MetricNameFormat::Upper), "PNL_30D");
        assert_eq!(format_metric_name("realized_profit_7d", MetricNameFormat::Slug), "realized-profit-7d");
    }

    #[test]
    fn test_slugify_collapses_and_trims_separators() {
        assert_eq!(slugify("  Total Value__Locked! "), "total-value-locked");
        assert_eq!(slugify("TVL"), "tvl");
        assert_eq!(slugify("---"), "");
    }

    #[test]
    fn test_slugify_keeps_unicode_letters() {
        assert_eq!(slugify("Café Volume"), "café-volume");
        assert_eq!(slugify("ÉTH TVL"), "éth-tvl");
    }
}
