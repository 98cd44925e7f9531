//! Check command implementation.
//!
//! Runs the same setup as a sync (local folder, folder ID, credentials,
//! remote lookup) and reports the result without walking either tree.

use std::path::Path;

use colored::Colorize;

use super::sync::prepare;
use crate::cli::RootArgs;
use crate::config::load_config;
use crate::error::{Error, Result};
use crate::sync::{EngineOptions, SyncEngine};

/// Execute the check command.
///
/// # Errors
///
/// Returns the first setup check that fails.
pub fn execute(args: &RootArgs, config_path: Option<&Path>, json: bool, quiet: bool) -> Result<()> {
    let config = load_config(config_path)?;
    let prepared = prepare(args, &config)?;
    let local = prepared.root.local.clone();

    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| Error::Other(format!("Failed to create async runtime: {e}")))?;

    let folder = rt.block_on(async {
        SyncEngine::new(prepared.client, prepared.root, EngineOptions::default())
            .verify_root()
            .await
    })?;

    if json {
        let output = serde_json::json!({
            "success": true,
            "local_folder": local.display().to_string(),
            "folder": {
                "id": folder.id,
                "name": folder.name,
                "modified_time": folder.modified_time,
            },
        });
        println!("{}", serde_json::to_string(&output)?);
    } else if !quiet {
        println!("{} Local folder: {}", "✓".green(), local.display());
        println!("{} Credentials: token present", "✓".green());
        println!(
            "{} Remote folder: {} ({})",
            "✓".green(),
            folder.name.bold(),
            folder.id.dimmed()
        );
    }

    Ok(())
}
