use anyhow::{Context, Result};
use chrono::Utc;

use recall_lib::review::algorithm::format_interval;
use recall_lib::review::ReviewStateStore;

use crate::app::App;
use crate::render::terminal::{paint, rule, Color};
use crate::OutputFormat;

pub async fn run(
    app: &App,
    direction: Option<&str>,
    format: &OutputFormat,
    use_color: bool,
) -> Result<()> {
    let direction = app.resolve_direction(direction)?;
    let now = Utc::now();
    let due = app
        .store
        .list_due(direction, now)
        .await
        .context("Failed to list due reviews")?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&due)?);
        }
        OutputFormat::Plain => {
            if due.is_empty() {
                println!("Nothing due in {}.", app.label(direction));
                return Ok(());
            }

            let id_width = due.iter().map(|s| s.item_id.len()).max().unwrap_or(4).clamp(4, 40);

            println!(
                "{:<iw$} {:>8} {:>5} {:>6} Due since",
                "Item", "Interval", "Ease", "Streak",
                iw = id_width
            );
            println!("{}", rule(id_width + 40));

            for state in &due {
                println!(
                    "{:<iw$} {:>8} {:>5.2} {:>6} {}",
                    state.item_id,
                    format_interval(state.interval),
                    state.easiness_factor,
                    state.streak,
                    paint(
                        &state.next_review_at.format("%Y-%m-%d %H:%M").to_string(),
                        Color::GRAY,
                        use_color,
                    ),
                    iw = id_width
                );
            }

            println!("\n{} due in {}", due.len(), app.label(direction));
        }
    }

    Ok(())
}
