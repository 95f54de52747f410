use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;

use crate::app::App;
use crate::OutputFormat;

pub async fn run_export(app: &App, output: Option<&Path>, format: &OutputFormat) -> Result<()> {
    let export = app
        .store
        .export(Utc::now())
        .await
        .context("Failed to export review states")?;
    let json = serde_json::to_string_pretty(&export)?;

    match output {
        None => println!("{}", json),
        Some(path) => {
            fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
            match format {
                OutputFormat::Json => println!(
                    "{}",
                    serde_json::json!({ "exported": export.states.len(), "path": path })
                ),
                OutputFormat::Plain => println!(
                    "Exported {} review states to {}",
                    export.states.len(),
                    path.display()
                ),
            }
        }
    }

    Ok(())
}

pub async fn run_import(app: &App, file: &Path, format: &OutputFormat) -> Result<()> {
    let content =
        fs::read_to_string(file).with_context(|| format!("Failed to read {}", file.display()))?;
    let report = app
        .store
        .import_json(&content)
        .await
        .with_context(|| format!("Failed to import {}", file.display()))?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Plain => println!(
            "Imported {} review states ({} skipped, {} failed)",
            report.imported, report.skipped, report.failed
        ),
    }

    Ok(())
}
