use anyhow::{Result, bail};

use larder_core::catalog::{Enrichment, PRESET_CATEGORIES, PresetCategory, enrich};
use larder_core::normalize::normalize;

use super::helpers::print_json;

pub(crate) fn cmd_catalog(category: Option<&str>, json: bool) -> Result<()> {
    let selected: Vec<&PresetCategory> = match category {
        None => PRESET_CATEGORIES.iter().collect(),
        Some(key) => {
            let found: Vec<&PresetCategory> = PRESET_CATEGORIES
                .iter()
                .filter(|c| c.id.eq_ignore_ascii_case(key) || c.name == key)
                .collect();
            if found.is_empty() {
                let ids: Vec<&str> = PRESET_CATEGORIES.iter().map(|c| c.id).collect();
                bail!("Unknown category '{key}'. Use one of: {}", ids.join(", "));
            }
            found
        }
    };

    if json {
        return print_json(&selected);
    }
    for c in selected {
        println!("{} {} ({})", c.icon, c.name, c.id);
        let items: Vec<String> = c
            .items
            .iter()
            .map(|i| format!("{} {}", i.icon, i.name))
            .collect();
        println!("  {}", items.join("  "));
    }
    Ok(())
}

pub(crate) fn cmd_catalog_lookup(raw: &str, json: bool) -> Result<()> {
    let (name, e) = lookup(raw);
    if json {
        return print_json(&e);
    }
    println!("{} {name} → {}", e.icon, e.category);
    Ok(())
}

/// The name as the pantry would store it, and what it would be enriched with.
fn lookup(raw: &str) -> (String, Enrichment) {
    let name = normalize(raw);
    let e = enrich(&name);
    (name, e)
}
