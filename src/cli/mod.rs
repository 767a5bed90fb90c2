//! Command-line surface. `run` drives the daily pipeline; the other
//! subcommands are operator utilities for the watchlist and holdings.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use crate::config::Config;
use crate::data::validation::validate_symbol;
use crate::data::HoldingsScraper;
use crate::orchestrator::DailyOrchestrator;
use crate::registry::WatchlistStore;

#[derive(Debug, Parser)]
#[command(name = "marketpulse", version, about = "Daily market news sentiment pipeline")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run the daily fetch-analyze-report pipeline
    Run {
        /// Re-scrape fund holdings even when a cached copy exists
        #[arg(long)]
        refresh: bool,
        /// Extra fund symbols to include in this run only
        funds: Vec<String>,
    },
    /// Manage the watched funds and stocks
    Watchlist {
        #[command(subcommand)]
        action: WatchlistAction,
    },
    /// Scrape and print the current holdings of a fund
    Holdings {
        /// Fund ticker, e.g. FNILX
        fund: String,
    },
}

#[derive(Debug, Subcommand)]
pub enum WatchlistAction {
    /// Add a symbol to the watchlist
    Add {
        symbol: String,
        /// Track as an individual stock instead of a fund
        #[arg(long)]
        stock: bool,
    },
    /// Remove a symbol from both lists
    Remove { symbol: String },
    /// Print the current watchlist
    List,
}

/// Dispatches a parsed command. Returns whether the command succeeded in
/// the pipeline sense; the caller maps that onto the process exit code.
pub async fn execute(cli: Cli, config: Config) -> Result<bool> {
    match cli.command {
        Commands::Run { refresh, funds } => {
            config.validate()?;
            for fund in &funds {
                validate_symbol(fund)?;
            }
            let mut orchestrator =
                DailyOrchestrator::new(config).context("Failed to initialize pipeline")?;
            orchestrator.track_funds(&funds);
            let ok = orchestrator.run(refresh).await?;
            Ok(ok)
        }
        Commands::Watchlist { action } => {
            let store = WatchlistStore::new(&config.storage.data_dir);
            match action {
                WatchlistAction::Add { symbol, stock } => {
                    validate_symbol(&symbol)?;
                    let items = store.add(&symbol, !stock)?;
                    info!(symbol = symbol.as_str(), as_stock = stock, "Added to watchlist");
                    print_watchlist(&items.funds, &items.stocks);
                }
                WatchlistAction::Remove { symbol } => {
                    let items = store.remove(&symbol)?;
                    info!(symbol = symbol.as_str(), "Removed from watchlist");
                    print_watchlist(&items.funds, &items.stocks);
                }
                WatchlistAction::List => {
                    let items = store.load_items()?;
                    print_watchlist(&items.funds, &items.stocks);
                }
            }
            Ok(true)
        }
        Commands::Holdings { fund } => {
            validate_symbol(&fund)?;
            let scraper = HoldingsScraper::new()?;
            match scraper.get_holdings(&fund).await? {
                Some(holdings) if !holdings.is_empty() => {
                    println!("{} holdings ({}):", fund.to_uppercase(), holdings.len());
                    for holding in &holdings {
                        println!(
                            "  {:<8} {:>6.2}%  {:<24} {}",
                            holding.ticker, holding.weight, holding.sector, holding.name
                        );
                    }
                    Ok(true)
                }
                Some(_) => {
                    println!("{} is an individual stock, not a fund.", fund.to_uppercase());
                    Ok(true)
                }
                None => {
                    println!("No holdings found for {}.", fund.to_uppercase());
                    Ok(false)
                }
            }
        }
    }
}

fn print_watchlist(funds: &[String], stocks: &[String]) {
    println!("Funds:  {}", join_or_none(funds));
    println!("Stocks: {}", join_or_none(stocks));
}

fn join_or_none(symbols: &[String]) -> String {
    if symbols.is_empty() {
        "(none)".to_string()
    } else {
        symbols.join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn run_accepts_refresh_flag_and_extra_funds() {
        let cli = Cli::parse_from(["marketpulse", "run", "--refresh", "VOO", "SPY"]);
        match cli.command {
            Commands::Run { refresh, funds } => {
                assert!(refresh);
                assert_eq!(funds, vec!["VOO", "SPY"]);
            }
            other => panic!("unexpected parse: {:?}", other),
        }
    }

    #[test]
    fn watchlist_add_parses_stock_flag() {
        let cli = Cli::parse_from(["marketpulse", "watchlist", "add", "UURAF", "--stock"]);
        match cli.command {
            Commands::Watchlist {
                action: WatchlistAction::Add { symbol, stock },
            } => {
                assert_eq!(symbol, "UURAF");
                assert!(stock);
            }
            other => panic!("unexpected parse: {:?}", other),
        }
    }
}
