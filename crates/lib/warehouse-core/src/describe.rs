//! Compact natural-language descriptions of warehouse tables.
//!
//! Descriptions are what the agent reads before writing SQL, so every column
//! line is kept short: data types are abbreviated and sampled values are picked
//! and truncated by column type.

use std::sync::LazyLock;

use regex::Regex;
use warehouse_store::models::{TableColumn, TableInfo, WarehouseRelationship};

/// Columns ending in `_id`, `_id$`, `_uuid` or `_uuid$` are presumed to hold ids.
static ID_COLUMN_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)_(?:uu)?id\$?$").expect("valid id column regex"));

const AVERAGE_CHARS_PER_SAMPLE: usize = 20;
const TRUNCATION_MARKER: &str = "[…]";

const STRUCTURED_SAMPLE_COUNT: usize = 4;
const STRUCTURED_SAMPLE_CHARS: usize = 500;
const ID_SAMPLE_COUNT: usize = 2;
const LONG_TEXT_SAMPLE_COUNT: usize = 2;
const LONG_TEXT_SAMPLE_CHARS: usize = 150;
const SHORT_TEXT_SAMPLE_COUNT: usize = 5;
const SHORT_TEXT_SAMPLE_CHARS: usize = 50;

/// Which parts of a table to include in its description.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)]
pub struct DescribeOptions {
    pub include_col_names: bool,
    pub include_col_types: bool,
    pub include_col_samples: bool,
    pub include_relationships: bool,
}

impl DescribeOptions {
    /// Everything: names, types, samples and relationships.
    #[must_use]
    pub const fn all() -> Self {
        Self {
            include_col_names: true,
            include_col_types: true,
            include_col_samples: true,
            include_relationships: true,
        }
    }

    #[must_use]
    pub const fn with_col_names(mut self, include: bool) -> Self {
        self.include_col_names = include;
        self
    }

    #[must_use]
    pub const fn with_col_types(mut self, include: bool) -> Self {
        self.include_col_types = include;
        self
    }

    #[must_use]
    pub const fn with_col_samples(mut self, include: bool) -> Self {
        self.include_col_samples = include;
        self
    }

    #[must_use]
    pub const fn with_relationships(mut self, include: bool) -> Self {
        self.include_relationships = include;
        self
    }
}

/// Describes a table for an LLM.
///
/// With no column or relationship flags the result is just the qualified
/// table name plus its schema type. Samples are only rendered as part of
/// column lines, so `include_col_samples` alone does not expand the output.
#[must_use]
pub fn describe_table(table: &TableInfo, options: DescribeOptions) -> String {
    let mut description = table.qualified_name();
    if let Some(schema_name) = table.schema_name.as_deref() {
        description.push_str(" (type: ");
        description.push_str(schema_name);
        description.push(')');
    }

    let any_detail = options.include_col_names
        || options.include_col_types
        || options.include_relationships;
    if !any_detail {
        return description;
    }

    if options.include_col_names {
        let columns = table
            .columns
            .iter()
            .map(|column| {
                format_column(
                    column,
                    options.include_col_types,
                    options.include_col_samples,
                )
            })
            .collect::<Vec<_>>()
            .join("\n");
        description.push_str("\n\n<columns>\n");
        description.push_str(&columns);
        description.push_str("\n</columns>");
    }

    if options.include_relationships {
        let outward: Vec<&WarehouseRelationship> = table.outward_relationships().collect();
        if !outward.is_empty() {
            description.push_str("\n\n<outward relationships>\n");
            for relationship in outward {
                description.push_str(&friendly_relationship(relationship, &table.org_prefix));
            }
            description.push_str("\n</outward relationships>");
        }
    }

    format!("<table>\n{}\n</table>", description.trim())
}

fn format_column(column: &TableColumn, include_type: bool, include_samples: bool) -> String {
    let mut description = if include_type {
        format!("{} ({})", column.name, short_data_type(&column.data_type))
    } else {
        column.name.clone()
    };

    if let Some(display_name) = novel_display_name(column) {
        description.push_str(" [also known as ");
        description.push_str(display_name);
        description.push(']');
    }

    if let Some(tooltip) = column.tooltip.as_deref().filter(|tooltip| !tooltip.is_empty()) {
        description.push_str(" [description: ");
        description.push_str(tooltip);
        description.push(']');
    }

    if include_samples {
        let samples = select_column_samples(column);
        if !samples.is_empty() {
            description.push_str(" e.g. ");
            description.push_str(&samples.join(" | "));
        }
    }

    description
}

/// Abbreviates verbose Postgres type names.
///
/// Plain `timestamp` already means "without time zone" in Postgres, so the
/// suffix carries no information for the reader.
#[must_use]
pub fn short_data_type(data_type: &str) -> &str {
    if data_type.starts_with("character varying") {
        "varchar"
    } else if data_type.starts_with("timestamp without time zone") {
        "timestamp"
    } else {
        data_type
    }
}

/// Returns the display name only when it says something the column name does not.
fn novel_display_name(column: &TableColumn) -> Option<&str> {
    let display_name = column.display_name.as_deref()?;
    let normalized = display_name
        .to_lowercase()
        .replace(' ', "_")
        .replace('-', "_");
    (normalized != column.name).then_some(display_name)
}

fn friendly_relationship(relationship: &WarehouseRelationship, org_prefix: &str) -> String {
    format!(
        "{} column has a relationship with the {} column from {org_prefix}.{}\n",
        relationship.from_column_name,
        relationship.target_column_name,
        relationship.target_table_name
    )
}

/// Picks the samples worth showing for a column.
#[must_use]
pub fn select_column_samples(column: &TableColumn) -> Vec<String> {
    let Some(samples) = column.samples.as_deref().filter(|samples| !samples.is_empty()) else {
        return Vec::new();
    };
    let data_type = column.data_type.as_str();

    if column.is_multi || data_type.starts_with("json") {
        // shorter first, so fewer of them get cut
        return truncate_samples(
            shortest(samples, STRUCTURED_SAMPLE_COUNT),
            STRUCTURED_SAMPLE_CHARS,
        );
    }

    if data_type.starts_with("timestamp") || data_type == "date" {
        return samples.iter().take(1).cloned().collect();
    }

    if data_type == "character varying" {
        if is_id_column(&column.name) {
            return samples.iter().take(ID_SAMPLE_COUNT).cloned().collect();
        }
        // many short enum-like values, few long user-entered ones
        let total_chars: usize = samples.iter().map(|sample| sample.chars().count()).sum();
        if total_chars > AVERAGE_CHARS_PER_SAMPLE * samples.len() {
            return truncate_samples(
                shortest(samples, LONG_TEXT_SAMPLE_COUNT),
                LONG_TEXT_SAMPLE_CHARS,
            );
        }
        return truncate_samples(
            samples.iter().take(SHORT_TEXT_SAMPLE_COUNT),
            SHORT_TEXT_SAMPLE_CHARS,
        );
    }

    Vec::new()
}

fn is_id_column(name: &str) -> bool {
    name == "id" || ID_COLUMN_REGEX.is_match(name)
}

fn shortest(samples: &[String], count: usize) -> impl Iterator<Item = &String> {
    let mut sorted: Vec<&String> = samples.iter().collect();
    sorted.sort_by_key(|sample| sample.chars().count());
    sorted.into_iter().take(count)
}

fn truncate_samples<'a>(samples: impl Iterator<Item = &'a String>, limit: usize) -> Vec<String> {
    samples.map(|sample| truncate_sample(sample, limit)).collect()
}

/// Cuts a sample to `limit` characters, marking the cut.
#[must_use]
pub fn truncate_sample(sample: &str, limit: usize) -> String {
    match sample.char_indices().nth(limit) {
        Some((byte_index, _)) => format!("{}{TRUNCATION_MARKER}", &sample[..byte_index]),
        None => sample.to_string(),
    }
}
