use tracing::debug;
use warehouse_store::models::WarehouseOverview;

use crate::describe::{DescribeOptions, describe_table, truncate_sample};

use super::WarehouseControlPlane;

/// Largest response the agent's client renders without cutting it off.
pub const DEFAULT_MAX_RESPONSE_LENGTH: usize = 100_000;
/// Characters held back from the maximum for the page envelope.
pub const RESPONSE_MARGIN: usize = 500;

const TABLE_SEPARATOR: &str = "\n\n";
const TRUNCATION_MARKER_CHARS: usize = 3;

impl WarehouseControlPlane {
    /// Describes as many tables as fit in one response, starting at `start_index`.
    #[must_use]
    pub fn list_tables(&self, start_index: usize) -> String {
        paginate_tables(self.overview(), start_index, self.max_response_length())
    }
}

/// Renders one page of table descriptions.
///
/// Lengths are counted in characters. The page, envelope included, never
/// exceeds `max_response_length - RESPONSE_MARGIN`. A first table too large for
/// an empty page is truncated so that every page advances by at least one table.
#[must_use]
pub fn paginate_tables(
    overview: &WarehouseOverview,
    start_index: usize,
    max_response_length: usize,
) -> String {
    let total = overview.len();
    if start_index >= total {
        return format!("No tables available from index {start_index} (out of {total}).");
    }

    let budget = max_response_length.saturating_sub(RESPONSE_MARGIN);
    let options = DescribeOptions::all();
    let mut selected: Vec<String> = Vec::new();
    let mut body_length = 0;

    for table in overview.tables().skip(start_index) {
        let description = describe_table(table, options);
        let length = description.chars().count();
        let separator = if selected.is_empty() { 0 } else { TABLE_SEPARATOR.len() };
        let end_index = start_index + selected.len();
        let room = budget.saturating_sub(envelope_length(start_index, end_index, total));

        if body_length + separator + length <= room {
            body_length += separator + length;
            selected.push(description);
            continue;
        }

        if selected.is_empty() {
            debug!(
                table = %table.table_name,
                length,
                room,
                "truncating oversized table description"
            );
            let keep = room.saturating_sub(TRUNCATION_MARKER_CHARS);
            selected.push(truncate_sample(&description, keep));
        }
        break;
    }

    let end_index = start_index + selected.len() - 1;
    render_page(start_index, end_index, total, &selected.join(TABLE_SEPARATOR))
}

fn render_page(start_index: usize, end_index: usize, total: usize, body: &str) -> String {
    format!(
        "The available tables (indices {start_index} to {end_index} out of {total}) are:\n\n<tables>\n{body}\n</tables>\n"
    )
}

fn envelope_length(start_index: usize, end_index: usize, total: usize) -> usize {
    render_page(start_index, end_index, total, "").chars().count()
}

#[cfg(test)]
mod tests {
    use warehouse_store::models::{TableColumn, TableInfo};

    use super::*;

    fn table(name: &str, columns: usize) -> TableInfo {
        TableInfo::new("acme", name).with_columns(
            (0..columns)
                .map(|index| TableColumn::new(format!("column_{index:03}"), "character varying"))
                .collect(),
        )
    }

    fn overview(count: usize, columns: usize) -> WarehouseOverview {
        WarehouseOverview::new(
            (0..count).map(|index| table(&format!("table_{index:03}$raw"), columns)),
        )
    }

    #[test]
    fn small_overview_fits_on_one_page() {
        let overview = overview(3, 2);
        let page = paginate_tables(&overview, 0, DEFAULT_MAX_RESPONSE_LENGTH);
        assert!(page.starts_with(
            "The available tables (indices 0 to 2 out of 3) are:\n\n<tables>\n<table>\nacme.table_000$raw"
        ));
        assert!(page.ends_with("</table>\n</tables>\n"));
        assert_eq!(page.matches("<table>").count(), 3);
    }

    #[test]
    fn pages_stay_within_budget_and_cover_every_table() {
        let overview = overview(40, 30);
        let max = 3_000;
        let mut start = 0;
        let mut seen = 0;
        while start < overview.len() {
            let page = paginate_tables(&overview, start, max);
            assert!(page.chars().count() <= max - RESPONSE_MARGIN, "page too long: {}", page.len());
            let count = page.matches("<table>").count();
            assert!(count > 0);
            seen += count;
            start += count;
        }
        assert_eq!(seen, 40);
    }

    #[test]
    fn oversized_first_table_is_truncated() {
        let overview = overview(2, 500);
        let max = 2_000;
        let page = paginate_tables(&overview, 0, max);
        assert!(page.starts_with("The available tables (indices 0 to 0 out of 2) are:"));
        assert!(page.contains("[…]\n</tables>\n"));
        assert_eq!(page.chars().count(), max - RESPONSE_MARGIN);
    }

    #[test]
    fn start_past_end_has_no_tables() {
        let overview = overview(2, 1);
        assert_eq!(
            paginate_tables(&overview, 5, DEFAULT_MAX_RESPONSE_LENGTH),
            "No tables available from index 5 (out of 2)."
        );
    }

    #[test]
    fn later_pages_report_their_indices() {
        let overview = overview(5, 1);
        let page = paginate_tables(&overview, 3, DEFAULT_MAX_RESPONSE_LENGTH);
        assert!(page.starts_with("The available tables (indices 3 to 4 out of 5) are:"));
        assert!(page.contains("acme.table_003$raw"));
        assert!(!page.contains("acme.table_002$raw"));
    }
}
