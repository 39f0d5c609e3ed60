use anyhow::Result;

use larder_core::normalize::normalize;
use larder_core::service::PantryService;

use super::helpers::print_json;

pub(crate) fn cmd_ingredients_list(svc: &PantryService, json: bool) -> Result<()> {
    let names = svc.ingredients();
    if json {
        return print_json(&names);
    }
    if names.is_empty() {
        println!("No ingredients selected.");
    } else {
        for (i, name) in names.iter().enumerate() {
            println!("{:>3}. {name}", i + 1);
        }
    }
    Ok(())
}

pub(crate) fn cmd_ingredients_add(svc: &PantryService, names: &[String], json: bool) -> Result<()> {
    let added = add_ingredients(svc, names)?;
    if json {
        return print_json(&svc.ingredients());
    }
    if added.is_empty() {
        println!("Nothing added (already selected or blank).");
    } else {
        println!("Added {}", added.join(", "));
    }
    Ok(())
}

pub(crate) fn cmd_ingredients_remove(svc: &PantryService, name: &str, json: bool) -> Result<()> {
    let removed = svc.remove_ingredient(name)?;
    if json {
        return print_json(&svc.ingredients());
    }
    let name = normalize(name);
    if removed {
        println!("Removed {name}");
    } else {
        println!("'{name}' was not selected");
    }
    Ok(())
}

/// Select each name, returning the stored form of those that were new.
fn add_ingredients(svc: &PantryService, names: &[String]) -> Result<Vec<String>> {
    let mut added = Vec::new();
    for name in names {
        if svc.add_ingredient(name)? {
            added.push(normalize(name));
        }
    }
    Ok(added)
}

pub(crate) fn cmd_ingredients_set(svc: &PantryService, names: &[String], json: bool) -> Result<()> {
    svc.set_ingredients(names)?;
    let current = svc.ingredients();
    if json {
        return print_json(&current);
    }
    println!("Selected {} ingredient(s)", current.len());
    Ok(())
}

pub(crate) fn cmd_ingredients_clear(svc: &PantryService, json: bool) -> Result<()> {
    svc.clear_ingredients()?;
    if json {
        return print_json(&svc.ingredients());
    }
    println!("Cleared ingredient selection");
    Ok(())
}
