//! Version command implementation.

use serde::Serialize;

use crate::error::Result;
use crate::remote::DRIVE_API_BASE;
use crate::sync::MTIME_TOLERANCE_MS;

#[derive(Serialize)]
struct VersionOutput<'a> {
    version: &'a str,
    build: &'a str,
    drive_api: &'a str,
    mtime_tolerance_ms: i64,
}

/// Execute the version command.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn execute(json: bool) -> Result<()> {
    let output = VersionOutput {
        version: env!("CARGO_PKG_VERSION"),
        build: if cfg!(debug_assertions) { "dev" } else { "release" },
        drive_api: DRIVE_API_BASE,
        mtime_tolerance_ms: MTIME_TOLERANCE_MS,
    };

    if json {
        println!("{}", serde_json::to_string(&output)?);
    } else {
        println!("cloudsaver version {} ({})", output.version, output.build);
        println!("  Drive API: {}", output.drive_api);
    }
    Ok(())
}
