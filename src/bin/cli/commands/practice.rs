use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;
use tokio::io::{AsyncBufReadExt, BufReader};

use recall_lib::catalog::load_catalog;
use recall_lib::direction::Direction;
use recall_lib::review::algorithm::{format_interval, preview_intervals};
use recall_lib::review::ReviewStateStore;
use recall_lib::session::{
    Card, SessionController, SessionError, SessionSnapshot, SessionState, SessionSummary,
};

use crate::app::App;
use crate::render::terminal::{grade_color, paint, progress_bar, Color};
use crate::OutputFormat;

pub async fn run(
    app: &App,
    catalog_path: &Path,
    direction: Option<&str>,
    limit: Option<usize>,
    due_only: bool,
    format: &OutputFormat,
    use_color: bool,
) -> Result<()> {
    let items = load_catalog(catalog_path)
        .with_context(|| format!("Failed to load catalog {}", catalog_path.display()))?;
    let direction = app.resolve_direction(direction)?;

    let mut cards: Vec<Card> = items.iter().map(Card::from).collect();
    if due_only {
        cards = filter_due(app, cards, direction).await?;
    }
    if cards.is_empty() {
        println!("Nothing to practice in {}.", app.label(direction));
        return Ok(());
    }

    let mut session_config = app.config.session.clone();
    if let Some(limit) = limit {
        session_config.max_cards = limit;
    }

    let controller = SessionController::new(app.store.clone(), app.directions.clone(), session_config);
    controller.start(cards, direction)?;
    if let Err(e) = app.set_direction(direction).await {
        warn_unsaved_direction(&e);
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let snapshot = controller.snapshot();
        match snapshot.state {
            SessionState::Ready => render_prompt(app, &snapshot, use_color),
            SessionState::Revealed => render_answer(app, &snapshot, use_color).await?,
            SessionState::Complete | SessionState::Ended => break,
            SessionState::Loading | SessionState::Grading => {}
        }

        let Some(line) = lines.next_line().await.context("Failed to read input")? else {
            controller.end()?;
            break;
        };

        match (snapshot.state, line.trim()) {
            (_, "q") => {
                controller.end()?;
                break;
            }
            (_, "t") => {
                let next = switch_direction(app).await;
                println!(
                    "{}",
                    paint(
                        &format!("Direction is now {} (from the next card)", app.label(next)),
                        Color::CYAN,
                        use_color,
                    )
                );
            }
            (SessionState::Ready, _) => controller.reveal()?,
            (SessionState::Revealed, input) => {
                let Ok(score) = input.parse::<i32>() else {
                    eprintln!("Enter a grade from 0 to 5, t to switch direction or q to quit.");
                    continue;
                };
                match controller.grade(score).await {
                    Ok(state) => println!(
                        "{}",
                        paint(
                            &format!("Next review in {}", format_interval(state.interval)),
                            grade_color(score),
                            use_color,
                        )
                    ),
                    Err(e) if e.is_retryable() => {
                        eprintln!("Could not save the grade: {}. Enter it again to retry.", e)
                    }
                    Err(SessionError::Scheduler(e)) => eprintln!("{}", e),
                    Err(e) => return Err(e.into()),
                }
            }
            _ => {}
        }
    }

    let summary = controller
        .summary()
        .context("Session stopped without a summary")?;
    render_summary(&summary, format, use_color)
}

/// Keep cards never seen in `direction` and cards whose review is due
async fn filter_due(app: &App, cards: Vec<Card>, direction: Direction) -> Result<Vec<Card>> {
    let now = Utc::now();
    let mut selected = Vec::new();

    for card in cards {
        let state = app
            .store
            .get(&card.id, direction)
            .await
            .with_context(|| format!("Failed to read review state for {}", card.id))?;
        if state.map_or(true, |s| s.is_due(now)) {
            selected.push(card);
        }
    }

    Ok(selected)
}

fn render_prompt(app: &App, snapshot: &SessionSnapshot, use_color: bool) {
    let (Some(prompt), Some(direction), Some(stats)) =
        (&snapshot.prompt, snapshot.direction, &snapshot.stats)
    else {
        return;
    };

    println!();
    println!(
        "{} {}/{}  {}",
        progress_bar(stats.progress(), 20),
        snapshot.position + 1,
        stats.total_cards,
        paint(&app.label(direction), Color::GRAY, use_color)
    );
    println!("  {}", paint(prompt, Color::BOLD, use_color));
    println!(
        "{}",
        paint("[enter] reveal  [t] switch direction  [q] quit", Color::DIM, use_color)
    );
}

async fn render_answer(app: &App, snapshot: &SessionSnapshot, use_color: bool) -> Result<()> {
    let (Some(answer), Some(card_id), Some(direction)) =
        (&snapshot.answer, &snapshot.current_card_id, snapshot.direction)
    else {
        return Ok(());
    };

    println!("  {}", paint(answer, Color::GREEN, use_color));

    let preview = preview_for(app, card_id, direction).await;
    let choices: Vec<String> = [1, 3, 4, 5]
        .iter()
        .zip(preview)
        .map(|(grade, days)| format!("{}:{}", grade, format_interval(days)))
        .collect();
    println!(
        "{}",
        paint(
            &format!("Grade 0-5 ({})", choices.join("  ")),
            Color::DIM,
            use_color,
        )
    );
    Ok(())
}

/// Toggle the direction for the next card; a failed save is only reported
async fn switch_direction(app: &App) -> Direction {
    match app.toggle_direction().await {
        Ok(next) => next,
        Err(e) => {
            warn_unsaved_direction(&e);
            app.directions.direction()
        }
    }
}

fn warn_unsaved_direction(e: &anyhow::Error) {
    log::warn!("{:#}", e);
    eprintln!("Direction changed for this session only: {:#}", e);
}

/// Intervals offered for each grade. Falls back to a new card's intervals
/// when the stored state cannot be read.
async fn preview_for(app: &App, card_id: &str, direction: Direction) -> [u32; 4] {
    match app.store.get(card_id, direction).await {
        Ok(previous) => preview_intervals(previous.as_ref()),
        Err(e) => {
            log::warn!("Failed to read review state for {}: {}", card_id, e);
            preview_intervals(None)
        }
    }
}

fn render_summary(summary: &SessionSummary, format: &OutputFormat, use_color: bool) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(summary)?);
        }
        OutputFormat::Plain => {
            let stats = &summary.stats;
            println!();
            println!(
                "{} {}/{} cards, {}% correct, {}s",
                paint("Session finished:", Color::BOLD, use_color),
                stats.reviewed_cards,
                stats.total_cards,
                stats.accuracy(),
                summary.duration().num_seconds()
            );
            if !stats.grades.is_empty() {
                let grades: Vec<String> = stats
                    .grades
                    .iter()
                    .map(|g| paint(&g.to_string(), grade_color(i32::from(*g)), use_color))
                    .collect();
                println!("  Grades: {}", grades.join(" "));
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use recall_lib::config::RecallConfig;
    use recall_lib::review::{MemoryBackend, ReviewState};
    use std::sync::Arc;

    async fn open_app(backend: Arc<MemoryBackend>) -> App {
        App::open(RecallConfig::default(), backend).await.unwrap()
    }

    #[tokio::test]
    async fn test_preview_uses_stored_state() {
        let backend = Arc::new(MemoryBackend::new());
        let app = open_app(backend).await;
        let mut state = ReviewState::new("kniga", Direction::AToB, Utc::now());
        state.repetitions = 2;
        state.interval = 6;
        app.store.put(&state).await.unwrap();

        let preview = preview_for(&app, "kniga", Direction::AToB).await;
        assert_eq!(preview, preview_intervals(Some(&state)));
        assert_ne!(preview, preview_intervals(None));
    }

    #[tokio::test]
    async fn test_preview_falls_back_when_store_unavailable() {
        let backend = Arc::new(MemoryBackend::new());
        let app = open_app(backend.clone()).await;
        backend.set_available(false);

        let preview = preview_for(&app, "kniga", Direction::AToB).await;
        assert_eq!(preview, preview_intervals(None));
    }

    #[tokio::test]
    async fn test_switch_direction_survives_failed_save() {
        let backend = Arc::new(MemoryBackend::new());
        let app = open_app(backend.clone()).await;
        let before = app.directions.direction();
        backend.set_available(false);

        let next = switch_direction(&app).await;
        assert_eq!(next, before.reversed());
        assert_eq!(app.directions.direction(), next);
    }
}
