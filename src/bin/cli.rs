use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use odds_line_tracker::config::Config;
use odds_line_tracker::data::{
    best_price_rows, latest_snapshot, recent_snapshots, save_best_prices_to_csv, JsonFileStore,
};
use odds_line_tracker::history::select_history;
use odds_line_tracker::line_board::{format_odds, format_point};
use odds_line_tracker::{
    game_report, run_fetch_cycle, schedule, ApiKeyRing, MarketKey, OddsApiClient, Side, Sport,
};
use std::path::PathBuf;

/// Track bookmaker odds snapshots and compare lines
#[derive(Parser, Debug)]
#[command(name = "cli", version)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch current odds for every configured sport and store a snapshot
    Fetch {
        /// Sports to fetch instead of the configured list (comma separated)
        #[arg(long, value_delimiter = ',')]
        sports: Vec<Sport>,
    },
    /// List the games in a sport's latest snapshot
    Games {
        #[arg(long)]
        sport: Sport,
        #[arg(long, default_value = "spreads")]
        market: MarketKey,
    },
    /// Compare every bookmaker's line for one side of a game
    Best {
        #[arg(long)]
        sport: Sport,
        #[arg(long)]
        game: String,
        #[arg(long, default_value = "spreads")]
        market: MarketKey,
        #[arg(long, default_value = "home")]
        side: Side,
    },
    /// Show which snapshots a game's comparison is drawn from
    History {
        #[arg(long)]
        sport: Sport,
        #[arg(long)]
        game: String,
    },
    /// Write the best line for both sides of every game to CSV
    Export {
        #[arg(long)]
        sport: Sport,
        #[arg(long, default_value = "h2h")]
        market: MarketKey,
        #[arg(long, default_value = "cache/best_prices.csv")]
        out: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let config = Config::from_env()?;
    let store = JsonFileStore::new(&config.snapshot_dir);

    match args.command {
        Command::Fetch { sports } => {
            let sports = if sports.is_empty() {
                config.sports.clone()
            } else {
                sports
            };
            let keys = ApiKeyRing::new(config.odds_api_keys.clone())
                .context("ODDS_API_KEY not set in .env file")?;
            let mut client = OddsApiClient::new(keys);

            println!("Fetching odds for {} sport(s)...\n", sports.len());
            let report = run_fetch_cycle(&mut client, &store, &sports).await?;
            for ingest in &report {
                println!(
                    "{:<24} {:>4} games in {} record(s) at {}",
                    ingest.sport.title(),
                    ingest.games,
                    ingest.records,
                    ingest.timestamp.format("%Y-%m-%d %H:%M:%S")
                );
            }
            println!("\nSnapshots saved under {}", store.root().display());
        }
        Command::Games { sport, market } => {
            let Some(snapshot) = latest_snapshot(&store, &sport)? else {
                println!("No {} snapshots stored yet.", sport.title());
                return Ok(());
            };

            println!(
                "{} games as of {} ({})\n",
                sport.title(),
                snapshot.timestamp.format("%Y-%m-%d %H:%M"),
                market.label()
            );
            for entry in schedule(&snapshot, market) {
                println!(
                    "{}  {} ({}) @ {} ({})",
                    entry.game_id,
                    entry.away_team,
                    entry.away_line.as_deref().unwrap_or("-"),
                    entry.home_team,
                    entry.home_line.as_deref().unwrap_or("-"),
                );
            }
        }
        Command::Best {
            sport,
            game,
            market,
            side,
        } => {
            let snapshots = recent_snapshots(&store, &sport, config.history_window)?;
            let report = game_report(&snapshots, &game, market, side, None)?;

            println!(
                "{} | {} {}\n",
                report.game.matchup(),
                report.team,
                market.label()
            );
            if report.rows.is_empty() {
                println!("No bookmaker offers this line.");
            }
            for row in &report.rows {
                println!("{}", row.format());
            }
            if let Some(best) = &report.best {
                let line = match best.point {
                    Some(point) => format!("{} {}", format_point(point), format_odds(best.price)),
                    None => format_odds(best.price),
                };
                println!("\nBest available: {}", line);
            }
        }
        Command::History { sport, game } => {
            let snapshots = recent_snapshots(&store, &sport, config.history_window)?;
            let window = select_history(&snapshots, &game)?;

            println!("{}", window.current_game.matchup());
            println!(
                "Current:  {} ({} bookmakers)",
                window.current.timestamp,
                window.current_game.bookmakers.len()
            );
            match (window.previous, window.previous_game) {
                (Some(previous), Some(previous_game)) => println!(
                    "Previous: {} ({} bookmakers)",
                    previous.timestamp,
                    previous_game.bookmakers.len()
                ),
                _ => println!("Previous: none, movement is not available yet"),
            }
        }
        Command::Export { sport, market, out } => {
            let Some(snapshot) = latest_snapshot(&store, &sport)? else {
                println!("No {} snapshots stored yet.", sport.title());
                return Ok(());
            };

            let rows = best_price_rows(&snapshot, market);
            if let Some(parent) = out.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
            save_best_prices_to_csv(&rows, &out)?;
            println!("Saved {} best prices to {}", rows.len(), out.display());
        }
    }

    Ok(())
}
