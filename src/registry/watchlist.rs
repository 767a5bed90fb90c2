use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info};

use super::Holding;
use crate::errors::PipelineResult;

pub const DEFAULT_FUNDS: &[&str] = &["FNILX", "FZILX"];
pub const DEFAULT_STOCKS: &[&str] = &["UURAF"];

/// Persisted watchlist: which funds and individual stocks to analyze.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchedItems {
    pub funds: Vec<String>,
    pub stocks: Vec<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

impl Default for WatchedItems {
    fn default() -> Self {
        Self {
            funds: DEFAULT_FUNDS.iter().map(|s| s.to_string()).collect(),
            stocks: DEFAULT_STOCKS.iter().map(|s| s.to_string()).collect(),
            updated_at: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct HoldingsCacheFile {
    ticker: String,
    updated_at: String,
    holdings: Vec<Holding>,
}

/// File-backed store for the watchlist and per-fund holdings caches.
#[derive(Debug, Clone)]
pub struct WatchlistStore {
    config_file: PathBuf,
    cache_dir: PathBuf,
}

impl WatchlistStore {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            config_file: data_dir.join("config").join("monitored_items.json"),
            cache_dir: data_dir.join("cache"),
        }
    }

    /// Load the watchlist, seeding the file with defaults on first run.
    pub fn load_items(&self) -> PipelineResult<WatchedItems> {
        if !self.config_file.exists() {
            let defaults = WatchedItems::default();
            self.save_items(&defaults.funds, &defaults.stocks)?;
            return Ok(defaults);
        }

        let text = fs::read_to_string(&self.config_file)?;
        let items: WatchedItems = serde_json::from_str(&text)?;
        Ok(items)
    }

    /// Save the watchlist, uppercased, sorted, and deduplicated.
    pub fn save_items(&self, funds: &[String], stocks: &[String]) -> PipelineResult<()> {
        if let Some(parent) = self.config_file.parent() {
            fs::create_dir_all(parent)?;
        }

        let items = WatchedItems {
            funds: normalize(funds),
            stocks: normalize(stocks),
            updated_at: Some(Utc::now().to_rfc3339()),
        };
        fs::write(&self.config_file, serde_json::to_string_pretty(&items)?)?;
        info!(
            funds = items.funds.len(),
            stocks = items.stocks.len(),
            path = %self.config_file.display(),
            "Saved watchlist"
        );
        Ok(())
    }

    pub fn add(&self, symbol: &str, is_fund: bool) -> PipelineResult<WatchedItems> {
        let mut items = self.load_items()?;
        let symbol = symbol.to_uppercase();
        let list = if is_fund {
            &mut items.funds
        } else {
            &mut items.stocks
        };
        if !list.contains(&symbol) {
            list.push(symbol);
        }
        self.save_items(&items.funds, &items.stocks)?;
        self.load_items()
    }

    /// Remove a symbol from both lists, whichever it is in.
    pub fn remove(&self, symbol: &str) -> PipelineResult<WatchedItems> {
        let mut items = self.load_items()?;
        let symbol = symbol.to_uppercase();
        items.funds.retain(|s| s != &symbol);
        items.stocks.retain(|s| s != &symbol);
        self.save_items(&items.funds, &items.stocks)?;
        self.load_items()
    }

    pub fn save_holdings_cache(&self, fund: &str, holdings: &[Holding]) -> PipelineResult<()> {
        fs::create_dir_all(&self.cache_dir)?;
        let fund = fund.to_uppercase();
        let file = HoldingsCacheFile {
            ticker: fund.clone(),
            updated_at: Utc::now().to_rfc3339(),
            holdings: holdings.to_vec(),
        };
        let path = self.cache_path(&fund);
        fs::write(&path, serde_json::to_string_pretty(&file)?)?;
        info!(fund = fund.as_str(), path = %path.display(), "Cached holdings");
        Ok(())
    }

    /// Cache miss or unreadable cache both yield `None`; a broken cache file
    /// is logged but never fails the run.
    pub fn load_holdings_cache(&self, fund: &str) -> Option<Vec<Holding>> {
        let path = self.cache_path(&fund.to_uppercase());
        if !path.exists() {
            return None;
        }
        match fs::read_to_string(&path)
            .map_err(anyhow::Error::from)
            .and_then(|text| serde_json::from_str::<HoldingsCacheFile>(&text).map_err(Into::into))
        {
            Ok(file) => Some(file.holdings),
            Err(e) => {
                error!(fund, error = %e, "Failed to read holdings cache");
                None
            }
        }
    }

    fn cache_path(&self, fund: &str) -> PathBuf {
        self.cache_dir.join(format!("{}_holdings.json", fund))
    }
}

fn normalize(symbols: &[String]) -> Vec<String> {
    let mut set: Vec<String> = symbols
        .iter()
        .map(|s| s.trim().to_uppercase())
        .filter(|s| !s.is_empty())
        .collect();
    set.sort();
    set.dedup();
    set
}
