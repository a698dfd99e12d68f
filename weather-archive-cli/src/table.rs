use comfy_table::{Table, modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL};
use serde_json::Value;

use weather_archive_core::{
    IngestReport, Outcome, RenderError,
    render::{CurrentView, ForecastRow, ForecastView},
};

fn new_table() -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL).apply_modifier(UTF8_ROUND_CORNERS);
    table
}

pub fn current_table(document: &Value) -> Result<Table, RenderError> {
    let view = CurrentView::from_document(document)?;

    let mut table = new_table();
    table.set_header(vec!["Field", "Value"]);
    for (label, value) in view.fields() {
        table.add_row(vec![label.to_string(), value]);
    }
    Ok(table)
}

pub fn forecast_table(document: &Value) -> Result<Table, RenderError> {
    let view = ForecastView::from_document(document)?;

    let mut table = new_table();
    table.set_header(ForecastRow::COLUMNS.to_vec());
    for row in &view.rows {
        table.add_row(row.cells());
    }
    Ok(table)
}

pub fn report_table(report: &IngestReport) -> Table {
    let mut table = new_table();
    table.set_header(vec!["City", "Type", "Result", "Key"]);

    for entry in &report.outcomes {
        let (result, key) = match &entry.outcome {
            Outcome::Stored { key } => ("stored", key.as_str()),
            Outcome::NotFetched => ("not fetched", ""),
            Outcome::WriteFailed { key } => ("write failed", key.as_str()),
        };
        table.add_row(vec![
            entry.city.clone(),
            entry.data_type.to_string(),
            result.to_string(),
            key.to_string(),
        ]);
    }
    table
}
