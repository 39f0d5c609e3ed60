use serde::Serialize;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use larder_core::models::PantryEntry;
use larder_core::normalize::{normalize, same_name};
use larder_core::service::PantryService;

/// Find a pantry entry by exact id, falling back to a case-insensitive name match.
pub(crate) fn resolve_entry(svc: &PantryService, key: &str) -> Option<PantryEntry> {
    if let Some(e) = svc.pantry_item(key) {
        return Some(e);
    }
    let name = normalize(key);
    if name.is_empty() {
        return None;
    }
    svc.pantry().into_iter().find(|e| same_name(&e.name, &name))
}

pub(crate) fn print_pantry_table(entries: &[PantryEntry]) {
    #[derive(Tabled)]
    struct PantryRow {
        #[tabled(rename = "#")]
        idx: usize,
        #[tabled(rename = "ID")]
        id: String,
        #[tabled(rename = "Name")]
        name: String,
        #[tabled(rename = "Category")]
        category: String,
        #[tabled(rename = "Qty")]
        quantity: String,
        #[tabled(rename = "Expires")]
        expiry: String,
        #[tabled(rename = "Sync")]
        sync: String,
    }

    let rows: Vec<PantryRow> = entries
        .iter()
        .enumerate()
        .map(|(i, e)| PantryRow {
            idx: i + 1,
            id: truncate(&e.id, 20),
            name: format!("{} {}", e.icon, truncate(&e.name, 30)),
            category: e.category.clone(),
            quantity: format_quantity(e.quantity, e.unit.as_deref()),
            expiry: e.expiry_date.clone().unwrap_or_else(|| "-".into()),
            sync: e.sync.as_str().to_string(),
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::single(4)).with(Alignment::right()))
        .to_string();
    println!("{table}");
}

pub(crate) fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub(crate) fn json_error(message: &str) -> String {
    #[derive(Serialize)]
    struct CliError<'a> {
        error: &'a str,
    }
    serde_json::to_string(&CliError { error: message })
        .unwrap_or_else(|_| format!("{{\"error\":\"{message}\"}}"))
}

fn format_quantity(quantity: Option<f64>, unit: Option<&str>) -> String {
    match (quantity, unit) {
        (Some(q), Some(u)) => format!("{q} {u}"),
        (Some(q), None) => format!("{q}"),
        (None, _) => "-".to_string(),
    }
}

pub(crate) fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let end = s.char_indices().nth(max - 3).map_or(s.len(), |(i, _)| i);
        format!("{}...", &s[..end])
    }
}
