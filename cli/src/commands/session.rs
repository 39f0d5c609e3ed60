use anyhow::Result;
use serde::Serialize;

use larder_core::reconcile::ReconcileOutcome;
use larder_core::service::{PantryService, SyncReport};

use crate::config::Config;

use super::helpers::print_json;

pub(crate) fn describe_outcome(outcome: &ReconcileOutcome) -> String {
    match outcome {
        ReconcileOutcome::Skipped => "skipped (no owner id, local-only session)".to_string(),
        ReconcileOutcome::FetchFailed => "remote unreachable, kept local pantry".to_string(),
        ReconcileOutcome::AdoptedRemote { count } => format!("adopted {count} item(s) from remote"),
        ReconcileOutcome::Migrated { count } => format!("uploaded {count} local item(s)"),
        ReconcileOutcome::MigrationFailed => "upload of local items failed, kept local".to_string(),
        ReconcileOutcome::MigrationAlreadyAttempted => {
            "upload already attempted this session".to_string()
        }
        ReconcileOutcome::Empty => "nothing to sync".to_string(),
    }
}

pub(crate) fn cmd_sync(report: &SyncReport, json: bool) -> Result<()> {
    if json {
        return print_json(report);
    }
    match &report.owner_id {
        Some(owner) => println!("Owner: {owner}"),
        None => println!("Owner: none (local-only)"),
    }
    println!("Sync: {}", describe_outcome(&report.outcome));
    Ok(())
}

pub(crate) async fn cmd_whoami(
    svc: &PantryService,
    config: &Config,
    offline: bool,
    json: bool,
) -> Result<()> {
    #[derive(Serialize)]
    struct WhoAmI<'a> {
        owner_id: Option<String>,
        api_url: &'a str,
        database: String,
        config_file: String,
        offline: bool,
    }

    let owner_id = if offline {
        svc.owner_id()
    } else {
        svc.ensure_identity().await?
    };
    let info = WhoAmI {
        owner_id,
        api_url: &config.remote.base_url,
        database: config.db_path.display().to_string(),
        config_file: config.config_path.display().to_string(),
        offline,
    };

    if json {
        return print_json(&info);
    }
    println!(
        "Owner:    {}",
        info.owner_id.as_deref().unwrap_or("none (local-only)")
    );
    println!("API:      {}", info.api_url);
    println!("Database: {}", info.database);
    println!("Config:   {}", info.config_file);
    Ok(())
}

pub(crate) async fn cmd_reset(svc: &PantryService, json: bool) -> Result<()> {
    svc.reset().await?;
    if json {
        println!("{}", serde_json::json!({ "reset": true }));
    } else {
        println!("Local data and owner id cleared. Remote pantry untouched.");
    }
    Ok(())
}
