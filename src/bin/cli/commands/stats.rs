use anyhow::{Context, Result};
use chrono::Utc;

use recall_lib::direction::Direction;

use crate::app::App;
use crate::render::terminal::{paint, rule, Color};
use crate::OutputFormat;

pub async fn run(
    app: &App,
    direction: Option<&str>,
    format: &OutputFormat,
    use_color: bool,
) -> Result<()> {
    let directions = match direction {
        Some(_) => vec![app.resolve_direction(direction)?],
        None => Direction::ALL.to_vec(),
    };

    let now = Utc::now();
    let mut all_stats = Vec::new();
    for direction in directions {
        let stats = app
            .store
            .direction_stats(direction, now)
            .await
            .with_context(|| format!("Failed to compute statistics for {}", direction))?;
        all_stats.push(stats);
    }

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&all_stats)?);
        }
        OutputFormat::Plain => {
            println!("{:<12} {:>6} {:>5} {:>6} {:>9}", "Direction", "Items", "Due", "Ease", "Accuracy");
            println!("{}", rule(42));

            for stats in &all_stats {
                let label = format!("{:<12}", app.label(stats.direction));
                println!(
                    "{} {:>6} {:>5} {:>6.2} {:>8}%",
                    paint(&label, Color::BOLD, use_color),
                    stats.total,
                    stats.due,
                    stats.average_ease,
                    stats.average_accuracy
                );
            }
        }
    }

    Ok(())
}
