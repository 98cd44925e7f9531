//! Push / pull / sync command implementation.
//!
//! Setup runs in a fixed order and stops at the first failure: local folder,
//! remote folder ID, credentials, then a metadata lookup proving the remote
//! folder is reachable and really a folder. Only after that does the engine
//! walk the tree, and from then on failures are per entry and never change
//! the exit status.

use std::io::IsTerminal;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use colored::Colorize;
use tracing::{info, warn};

use crate::cli::{RootArgs, SyncArgs};
use crate::config::{
    CloudSaverConfig, load_config, resolve_concurrency, resolve_folder_id, resolve_local_folder,
    resolve_token, resolve_whitelist,
};
use crate::error::{Error, Result};
use crate::model::{RemoteEntry, SyncRoot};
use crate::remote::DriveClient;
use crate::sync::{EngineOptions, Filter, InFlight, MatchPolicy, SyncEngine, SyncMode, SyncReport};

const PROGRESS_INTERVAL: Duration = Duration::from_millis(250);

/// A validated root plus the client that reaches it.
pub(crate) struct Prepared {
    pub root: SyncRoot,
    pub client: Arc<DriveClient>,
}

/// Resolve and validate everything a run needs, without touching the network.
pub(crate) fn prepare(args: &RootArgs, config: &CloudSaverConfig) -> Result<Prepared> {
    let local = resolve_local_folder(args.local_folder.as_deref(), config)?;
    let folder_id = resolve_folder_id(args.folder_id.as_deref(), config)?;
    let root = SyncRoot::new(&local, &folder_id)?;
    let token = resolve_token(args.token.as_deref(), config)?;

    Ok(Prepared {
        root,
        client: Arc::new(DriveClient::new(token)),
    })
}

/// Execute a push, pull or sync run.
///
/// # Errors
///
/// Returns the first setup error. Per-entry failures are reported in the
/// summary instead.
pub fn execute(
    mode: SyncMode,
    args: &SyncArgs,
    config_path: Option<&Path>,
    json: bool,
    quiet: bool,
) -> Result<()> {
    let config = load_config(config_path)?;
    let prepared = prepare(&args.root, &config)?;

    let whitelist = resolve_whitelist(&args.only, &config);
    let options = EngineOptions {
        concurrency: resolve_concurrency(args.concurrency, &config)?,
        filter: Filter::new(&whitelist),
        match_policy: MatchPolicy::FirstMatch,
    };
    let show_progress = !args.no_progress && !json && !quiet && std::io::stderr().is_terminal();
    let local_folder = prepared.root.local.display().to_string();

    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| Error::Other(format!("Failed to create async runtime: {e}")))?;

    let (folder, report) = rt.block_on(async {
        let engine = SyncEngine::new(prepared.client, prepared.root, options);
        let folder = engine.verify_root().await?;
        info!(folder = %folder.name, id = %folder.id, %mode, "Remote folder verified");

        let cancel = engine.cancel_handle();
        let interrupt = tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupted, stopping after in-flight operations");
                cancel.cancel();
            }
        });
        let progress = show_progress.then(|| tokio::spawn(draw_progress(engine.tracker())));

        let report = engine.run(mode).await;

        interrupt.abort();
        if let Some(progress) = progress {
            progress.abort();
            clear_progress_line();
        }
        Ok::<_, Error>((folder, report))
    })?;

    if json {
        let output = serde_json::json!({
            "success": !report.cancelled,
            "local_folder": local_folder,
            "folder": { "id": folder.id, "name": folder.name },
            "report": report,
        });
        println!("{}", serde_json::to_string(&output)?);
    } else if !quiet {
        print_summary(&folder, &report);
    }

    Ok(())
}

async fn draw_progress(tracker: Arc<InFlight>) {
    let mut ticker = tokio::time::interval(PROGRESS_INTERVAL);
    loop {
        ticker.tick().await;
        let snapshot = tracker.snapshot();
        eprint!(
            "\r\x1b[2K  {} {}  {} {}  {} {}",
            "↓".cyan(),
            snapshot.downloads,
            "↑".cyan(),
            snapshot.uploads,
            "~".cyan(),
            snapshot.checks
        );
    }
}

fn clear_progress_line() {
    eprint!("\r\x1b[2K");
}

fn print_summary(folder: &RemoteEntry, report: &SyncReport) {
    let seconds = Duration::from_millis(report.elapsed_ms).as_secs_f64();

    if report.cancelled {
        println!(
            "{} {} with '{}' after {seconds:.1}s",
            "Cancelled".yellow().bold(),
            report.mode,
            folder.name
        );
    } else {
        println!(
            "{} {} with '{}' in {seconds:.1}s",
            "Finished".green().bold(),
            report.mode,
            folder.name
        );
    }

    if report.writes() == 0 && report.failed == 0 && report.corrupted == 0 {
        println!("  {}", "Everything is up to date.".green());
        return;
    }

    println!();
    let lines = [
        ("Downloaded", report.downloaded),
        ("Folders created locally", report.dirs_created),
        ("Uploaded", report.uploaded),
        ("Updated remotely", report.replaced),
        ("Folders created remotely", report.containers_created),
        ("Up to date", report.up_to_date),
    ];
    for (label, count) in lines {
        if count > 0 {
            println!("  {label}: {count}");
        }
    }

    if report.corrupted > 0 {
        println!("  {}: {} (empty files skipped)", "Corrupted".yellow(), report.corrupted);
    }
    if report.failed > 0 {
        println!("  {}: {} (see warnings above)", "Failed".red(), report.failed);
    }
}
