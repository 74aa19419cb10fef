//! CLI command execution.
//!
//! Every command except `serve` is a thin client of the work service.

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use tokio::sync::watch;
use tracing::debug;

use crate::cache::LocalCache;
use crate::client::{HttpWorkService, WorkService};
use crate::clock::{Clock, SystemClock};
use crate::config::Settings;
use crate::elapsed::format_hms;
use crate::engine::{Board, CardSession, SessionState};
use crate::history::HistoryAggregator;
use crate::models::{HistoryBucket, HistoryWindow};
use crate::notify::ConsoleNotifier;
use crate::server::{self, ServeOptions};
use crate::timer::run_ticker;

use super::args::{Cli, Commands, WindowArg};

/// How often `watch` asks the service whether the session is still running.
const WATCH_POLL: Duration = Duration::from_secs(10);

type HttpBoard = Board<HttpWorkService, SystemClock>;

// === Command Execution ===

pub async fn execute(cli: Cli) -> Result<()> {
    let mut settings = Settings::load()?;
    if let Some(url) = cli.api_url {
        settings.api_url = url;
    }
    debug!(api_url = %settings.api_url, "settings loaded");

    match cli.command {
        Commands::Cards => list_cards(&settings).await,
        Commands::Start { card, description } => {
            start_work(&settings, &card, &description.join(" ")).await
        }
        Commands::Complete { card, description } => {
            complete_work(&settings, &card, description.as_deref()).await
        }
        Commands::Describe { card, text } => describe_work(&settings, &card, &text.join(" ")).await,
        Commands::Watch { card } => watch_card(&settings, &card).await,
        Commands::History { window, start, end } => {
            let window = resolve_window(window, start.as_deref(), end.as_deref())?;
            show_history(&settings, window).await
        }
        Commands::Serve { port, users, data } => {
            let mut seed = settings.server.users.clone();
            seed.extend(users);
            server::start_server(ServeOptions {
                port: port.unwrap_or(settings.server.port),
                users: seed,
                data_file: data.or_else(|| settings.server.data_file.clone()),
            })
            .await
        }
    }
}

fn cache_for(settings: &Settings) -> Option<LocalCache> {
    settings.cache_dir().map(LocalCache::new)
}

async fn load_board(settings: &Settings) -> Result<HttpBoard> {
    let service = HttpWorkService::new(&settings.api_url);
    Board::load(
        service,
        SystemClock,
        Arc::new(ConsoleNotifier),
        cache_for(settings),
    )
    .await
    .with_context(|| format!("Failed to load cards from {}", settings.api_url))
}

/// Resolve a card by 1-based list number, id or name.
async fn resolve_card<S: WorkService, C: Clock>(board: &Board<S, C>, key: &str) -> Result<usize> {
    if let Ok(n) = key.parse::<usize>() {
        let len = board.snapshot().await.len();
        if (1..=len).contains(&n) {
            return Ok(n - 1);
        }
    }
    match board.find(key).await {
        Some(index) => Ok(index),
        None => bail!("No card matches '{key}'. Run 'worktrack cards' to list them."),
    }
}

fn resolve_window(window: WindowArg, start: Option<&str>, end: Option<&str>) -> Result<HistoryWindow> {
    Ok(match window {
        WindowArg::Daily => HistoryWindow::Daily,
        WindowArg::Weekly => HistoryWindow::Weekly,
        WindowArg::Monthly => HistoryWindow::Monthly,
        WindowArg::Custom => {
            let Some(start) = start else {
                bail!("--start is required for a custom window");
            };
            HistoryWindow::custom(start, end)?
        }
    })
}

/// Refuse commands against a board that only has cached data.
fn require_online(board: &HttpBoard) -> Result<()> {
    if board.is_offline() {
        bail!("The work service is unreachable; showing cached cards is all that can be done offline");
    }
    Ok(())
}

// === Commands ===

async fn list_cards(settings: &Settings) -> Result<()> {
    let board = load_board(settings).await?;
    let cards = board.snapshot().await;
    if cards.is_empty() {
        println!("No cards found.");
        return Ok(());
    }

    let now = board.clock().now();
    println!(
        "{:<4} {:<20} {:<9} {:>9}  {}",
        "#", "NAME", "STATE", "ELAPSED", "DESCRIPTION"
    );
    println!("{}", "-".repeat(72));
    for (i, card) in cards.iter().enumerate() {
        print_card_row(i + 1, card, now);
    }
    if board.is_offline() {
        println!("\n(offline: cached cards)");
    }
    Ok(())
}

fn print_card_row(number: usize, card: &CardSession, now: chrono::DateTime<chrono::Utc>) {
    let elapsed = match card.state() {
        SessionState::Idle => "-".to_string(),
        SessionState::Running | SessionState::Stopped => format_hms(card.elapsed_seconds(now)),
    };
    println!(
        "{:<4} {:<20} {:<9} {:>9}  {}",
        number,
        truncate(card.display_name(), 20),
        card.state(),
        elapsed,
        card.description(),
    );
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
        out.push('…');
        out
    }
}

async fn start_work(settings: &Settings, key: &str, description: &str) -> Result<()> {
    let board = load_board(settings).await?;
    require_online(&board)?;
    let index = resolve_card(&board, key).await?;

    // a finished session gives way to a new one
    if board.card(index).await?.state() == SessionState::Stopped {
        board.reset(index).await?;
    }
    board.edit_description(index, description).await?;
    board.start(index).await?;
    Ok(())
}

async fn complete_work(settings: &Settings, key: &str, description: Option<&str>) -> Result<()> {
    let board = load_board(settings).await?;
    require_online(&board)?;
    let index = resolve_card(&board, key).await?;

    let card = board.card(index).await?;
    if card.state() != SessionState::Running {
        bail!("{} has no running session", card.display_name());
    }
    if let Some(description) = description {
        board.edit_description(index, description).await?;
    }

    let seconds = board.complete(index).await?;
    println!("Recorded {}", format_hms(seconds));
    Ok(())
}

async fn describe_work(settings: &Settings, key: &str, text: &str) -> Result<()> {
    let board = load_board(settings).await?;
    require_online(&board)?;
    let index = resolve_card(&board, key).await?;

    let card = board.card(index).await?;
    if card.state() != SessionState::Running {
        bail!("{} has no running session to describe", card.display_name());
    }
    board.edit_description(index, text).await?;
    board.save_description(index).await?;
    Ok(())
}

async fn watch_card(settings: &Settings, key: &str) -> Result<()> {
    let board = load_board(settings).await?;
    let index = resolve_card(&board, key).await?;
    let card = board.card(index).await?;
    let name = card.display_name().to_string();

    let Some(session_id) = card
        .session()
        .filter(|_| card.state() == SessionState::Running)
        .map(|s| s.id.clone())
    else {
        println!("{name} is {}: {}", card.state(), card.timer().text());
        return Ok(());
    };

    let (stop_tx, stop_rx) = watch::channel(false);

    let ctrl_c = {
        let tx = stop_tx.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                let _ = tx.send(true);
            }
        })
    };

    let poll = {
        let service = HttpWorkService::new(&settings.api_url);
        let card_id = card.card().id.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(WATCH_POLL);
            interval.tick().await;
            loop {
                interval.tick().await;
                match service.list_cards().await {
                    Ok(cards) => {
                        let still_running = cards
                            .iter()
                            .find(|c| c.id == card_id)
                            .and_then(|c| c.current_work())
                            .is_some_and(|w| w.id == session_id);
                        if !still_running {
                            let _ = stop_tx.send(true);
                            return;
                        }
                    }
                    Err(e) => debug!(error = %e, "watch poll failed"),
                }
            }
        })
    };

    println!("Watching {name} (Ctrl-C to stop watching)");
    let label = name.clone();
    let shown = run_ticker(card.timer().clone(), Duration::from_secs(1), stop_rx, |display| {
        print!("\r{label}  {}", display.text());
        let _ = std::io::stdout().flush();
    })
    .await;

    ctrl_c.abort();
    poll.abort();
    println!();

    // The tick count is only an approximation; report the derived figure.
    let elapsed = board.card(index).await?.elapsed_seconds(board.clock().now());
    debug!(shown, elapsed, "watch ended");
    println!("{name}: {}", format_hms(elapsed));
    Ok(())
}

async fn show_history(settings: &Settings, window: HistoryWindow) -> Result<()> {
    let aggregator = HistoryAggregator::new(
        HttpWorkService::new(&settings.api_url),
        SystemClock,
        cache_for(settings),
    );
    let bucket = aggregator
        .fetch_history(window)
        .await
        .with_context(|| format!("Error fetching work history from {}", settings.api_url))?;
    print_history(&bucket);
    Ok(())
}

fn print_history(bucket: &HistoryBucket) {
    println!("Work history: {}", bucket.window);
    if bucket.stale {
        println!("(offline: cached {})", bucket.fetched_at.format("%Y-%m-%d %H:%M"));
    }
    if bucket.is_empty() {
        println!("No work recorded.");
        return;
    }

    println!(
        "{:<20} {:<10} {:>9}  {}",
        "NAME", "DATE", "ELAPSED", "DESCRIPTION"
    );
    println!("{}", "-".repeat(72));
    for row in &bucket.rows {
        let date = row
            .date
            .map_or_else(|| "-".to_string(), |d| d.format("%Y-%m-%d").to_string());
        let elapsed = if row.running {
            format!("{}*", format_hms(row.elapsed_seconds))
        } else {
            format_hms(row.elapsed_seconds)
        };
        println!(
            "{:<20} {:<10} {:>9}  {}",
            truncate(&row.owner_name, 20),
            date,
            elapsed,
            row.description,
        );
    }
    println!("{}", "-".repeat(72));
    println!(
        "{} session(s), {} total",
        bucket.len(),
        format_hms(bucket.total_seconds())
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Card;
    use crate::notify::MemoryNotifier;
    use crate::testing::{ManualClock, MockService};

    async fn board() -> Board<MockService, ManualClock> {
        let service = MockService::with_cards(vec![
            Card::new("u1", "Ada"),
            Card::new("u2", "Grace"),
        ]);
        Board::load(service, ManualClock::at(0), Arc::new(MemoryNotifier::new()), None)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn cards_resolve_by_number_id_or_name() {
        let board = board().await;
        assert_eq!(resolve_card(&board, "2").await.unwrap(), 1);
        assert_eq!(resolve_card(&board, "u1").await.unwrap(), 0);
        assert_eq!(resolve_card(&board, "grace").await.unwrap(), 1);
        assert!(resolve_card(&board, "3").await.is_err());
        assert!(resolve_card(&board, "nobody").await.is_err());
    }

    #[test]
    fn windows_resolve_from_arguments() {
        assert_eq!(
            resolve_window(WindowArg::Weekly, None, None).unwrap(),
            HistoryWindow::Weekly
        );
        assert!(resolve_window(WindowArg::Custom, None, None).is_err());
        assert!(resolve_window(WindowArg::Custom, Some("2024-02-01"), Some("2024-01-01")).is_err());

        let window = resolve_window(WindowArg::Custom, Some("2024-01-01"), None).unwrap();
        assert_eq!(window.endpoint(), "work/range?start=2024-01-01");
    }

    #[test]
    fn long_names_are_truncated() {
        assert_eq!(truncate("Ada", 20), "Ada");
        assert_eq!(truncate("Augusta Ada King, Countess", 10), "Augusta A…");
    }
}
