// src/ui/table.rs
use tabled::{settings::Style, Table, Tabled};

use crate::types::CollectionResult;

pub const DUE_FORMAT: &str = "%Y-%m-%d %H:%M:%S UTC";

#[derive(Tabled)]
struct ReportRow {
    #[tabled(rename = "Type")]
    kind: String,
    #[tabled(rename = "Node")]
    node: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Days")]
    days: i64,
    #[tabled(rename = "Due")]
    due: String,
    #[tabled(rename = "Path")]
    path: String,
    #[tabled(rename = "Warning")]
    warning: String,
}

impl From<&CollectionResult> for ReportRow {
    fn from(result: &CollectionResult) -> Self {
        let entry = &result.entry;
        Self {
            kind: entry.kind.to_string(),
            node: entry.node.clone(),
            name: entry.name.clone(),
            days: entry.days,
            due: entry
                .due
                .map(|due| due.format(DUE_FORMAT).to_string())
                .unwrap_or_else(|| "-".to_string()),
            path: entry.path.clone(),
            warning: result.warning.clone(),
        }
    }
}

/// Renders results in the order given.
pub fn render_table(results: &[CollectionResult]) -> String {
    let rows: Vec<ReportRow> = results.iter().map(ReportRow::from).collect();
    Table::new(rows).with(Style::ascii()).to_string()
}

pub fn render_json(results: &[CollectionResult]) -> serde_json::Result<String> {
    serde_json::to_string_pretty(results)
}
