use anyhow::{Result, bail};

use larder_core::SyncState;
use larder_core::service::PantryService;

use super::helpers::{json_error, print_json, print_pantry_table, resolve_entry};

pub(crate) fn cmd_pantry_list(svc: &PantryService, json: bool) -> Result<()> {
    let entries = svc.pantry();
    if json {
        return print_json(&entries);
    }
    if entries.is_empty() {
        println!("Pantry is empty.");
        return Ok(());
    }
    print_pantry_table(&entries);
    let unsynced = entries
        .iter()
        .filter(|e| e.sync != SyncState::Synced)
        .count();
    if unsynced > 0 {
        println!("{unsynced} of {} not synced", entries.len());
    }
    Ok(())
}

pub(crate) async fn cmd_pantry_add(svc: &PantryService, names: &[String], json: bool) -> Result<()> {
    let added = svc.add_many_to_pantry(names).await?;
    if json {
        return print_json(&added);
    }
    if added.is_empty() {
        println!("Nothing added (already in pantry or blank).");
        return Ok(());
    }
    for e in &added {
        println!("Added {} {} ({})", e.icon, e.name, e.category);
    }
    let skipped = names.len() - added.len();
    if skipped > 0 {
        println!("Skipped {skipped} duplicate or blank name(s)");
    }
    Ok(())
}

pub(crate) async fn cmd_pantry_rename(
    svc: &PantryService,
    item: &str,
    new_name: &str,
    json: bool,
) -> Result<()> {
    let Some(entry) = resolve_entry(svc, item) else {
        if json {
            println!("{}", json_error(&format!("No pantry item '{item}'")));
            return Ok(());
        }
        bail!("No pantry item '{item}'");
    };

    if !svc.update_pantry_item(&entry.id, new_name).await? {
        let msg = format!("Cannot rename '{}' to '{new_name}': blank or already in pantry", entry.name);
        if json {
            println!("{}", json_error(&msg));
            return Ok(());
        }
        bail!(msg);
    }

    let updated = svc.pantry_item(&entry.id);
    if json {
        return print_json(&updated);
    }
    if let Some(e) = updated {
        println!("Renamed {} → {} {}", entry.name, e.icon, e.name);
    }
    Ok(())
}

pub(crate) async fn cmd_pantry_remove(svc: &PantryService, item: &str, json: bool) -> Result<()> {
    let Some(entry) = resolve_entry(svc, item) else {
        if json {
            println!("{}", json_error(&format!("No pantry item '{item}'")));
            return Ok(());
        }
        bail!("No pantry item '{item}'");
    };

    svc.remove_pantry_item(&entry.id).await?;
    if json {
        print_json(&entry)
    } else {
        println!("Removed {}", entry.name);
        Ok(())
    }
}

pub(crate) async fn cmd_pantry_clear(svc: &PantryService, json: bool) -> Result<()> {
    let count = svc.pantry().len();
    svc.clear_pantry().await?;
    if json {
        println!("{}", serde_json::json!({ "removed": count }));
    } else {
        println!("Cleared {count} pantry item(s)");
    }
    Ok(())
}
