use chrono::{DateTime, Local, Utc};
use comfy_table::{ContentArrangement, Table, presets::UTF8_FULL_CONDENSED};
use stack_advisor::preferences::PreferenceRecord;

#[derive(Clone, Copy, Debug, Default)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

pub fn format_timestamp(dt: &DateTime<Utc>) -> String {
    dt.with_timezone(&Local).format("%H:%M").to_string()
}

/// Property/value table of a preference record
pub fn preferences_table(record: &PreferenceRecord) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(["Property", "Value"]);

    table.add_row(["Languages", &or_dash(record.preferred_languages.join(", "))]);
    table.add_row(["Experience with", &or_dash(record.previous_tools.join(", "))]);
    table.add_row([
        "Last Project",
        record.last_project_type.as_deref().unwrap_or("-"),
    ]);
    table
}

fn or_dash(value: String) -> String {
    if value.is_empty() {
        "-".to_string()
    } else {
        value
    }
}
