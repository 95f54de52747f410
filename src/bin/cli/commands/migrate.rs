use anyhow::{Context, Result};

use crate::app::App;
use crate::OutputFormat;

pub async fn run(app: &App, direction: Option<&str>, format: &OutputFormat) -> Result<()> {
    let direction = app.resolve_direction(direction)?;
    let report = app
        .store
        .migrate_all_legacy(direction)
        .await
        .context("Failed to migrate legacy review states")?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Plain => {
            if report.migrated + report.skipped + report.failed == 0 {
                println!("No legacy review states found.");
            } else {
                println!(
                    "Migrated {} legacy review states to {} ({} already migrated, {} unreadable)",
                    report.migrated,
                    app.label(direction),
                    report.skipped,
                    report.failed
                );
            }
        }
    }

    Ok(())
}
