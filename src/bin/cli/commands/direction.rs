use anyhow::Result;

use crate::app::App;
use crate::render::terminal::{paint, Color};
use crate::OutputFormat;

pub async fn run(
    app: &App,
    value: Option<&str>,
    format: &OutputFormat,
    use_color: bool,
) -> Result<()> {
    if let Some(value) = value {
        let direction = app.resolve_direction(Some(value))?;
        app.set_direction(direction).await?;
    }

    let direction = app.directions.direction();
    let pair = app.directions.pair();

    match format {
        OutputFormat::Json => {
            let output = serde_json::json!({
                "direction": direction,
                "code": pair.code(direction),
                "source": pair.source(direction),
                "target": pair.target(direction),
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Plain => {
            println!(
                "{} ({})",
                paint(&app.label(direction), Color::BOLD, use_color),
                pair.code(direction)
            );
        }
    }

    Ok(())
}
