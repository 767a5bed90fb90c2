//! Ticker registry: funds with weighted holdings, individually tracked
//! symbols, and company-name metadata. Owned by the run that built it and
//! passed by reference to the components that need it - no ambient state.

pub mod watchlist;

pub use watchlist::{WatchedItems, WatchlistStore};

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::info;

use crate::errors::PipelineResult;

/// A single fund holding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Holding {
    pub ticker: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub sector: String,
    #[serde(default, alias = "weightPercentage")]
    pub weight: f64,
}

/// One unit of analysis: a fund analyzed in aggregate, or a single symbol
/// analyzed on its own. Built from registry state at pipeline start and
/// immutable for the rest of the run.
#[derive(Debug, Clone)]
pub enum AnalysisTarget {
    Fund {
        name: String,
        holdings: Vec<Holding>,
    },
    Stock {
        ticker: String,
        sector: String,
    },
}

impl AnalysisTarget {
    pub fn label(&self) -> &str {
        match self {
            AnalysisTarget::Fund { name, .. } => name,
            AnalysisTarget::Stock { ticker, .. } => ticker,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Registry {
    funds: BTreeMap<String, Vec<Holding>>,
    stocks: BTreeMap<String, String>,
    company_names: HashMap<String, String>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the registry from the persisted watchlist plus any cached
    /// holdings. Funds with no cache start empty and get filled by the
    /// holdings-refresh step.
    pub fn load(store: &WatchlistStore) -> PipelineResult<Self> {
        let items = store.load_items()?;
        let mut registry = Registry::new();

        for fund in &items.funds {
            registry.funds.insert(fund.clone(), Vec::new());
            if let Some(cached) = store.load_holdings_cache(fund) {
                info!(fund = fund.as_str(), count = cached.len(), "Loaded holdings from cache");
                registry.set_fund_holdings(fund, cached);
            }
        }
        for stock in &items.stocks {
            registry.add_stock(stock, "Unknown");
        }

        Ok(registry)
    }

    /// Install holdings for a fund, normalizing sector tags and recording
    /// company names for relevance matching.
    pub fn set_fund_holdings(&mut self, fund: &str, holdings: Vec<Holding>) {
        let mapped: Vec<Holding> = holdings
            .into_iter()
            .map(|mut h| {
                h.sector = map_sector(&h.sector);
                if h.name.is_empty() {
                    h.name = h.ticker.clone();
                }
                self.company_names
                    .entry(h.ticker.clone())
                    .or_insert_with(|| h.name.clone());
                h
            })
            .collect();
        self.funds.insert(fund.to_uppercase(), mapped);
    }

    /// Track a fund for this run. Holdings start empty and get filled by
    /// the holdings-refresh step; an already-tracked fund is untouched.
    pub fn add_fund(&mut self, fund: &str) {
        self.funds.entry(fund.to_uppercase()).or_default();
    }

    pub fn add_stock(&mut self, ticker: &str, sector: &str) {
        let ticker = ticker.to_uppercase();
        self.company_names
            .entry(ticker.clone())
            .or_insert_with(|| ticker.clone());
        self.stocks.insert(
            ticker,
            if sector.is_empty() {
                "Unknown".to_string()
            } else {
                sector.to_string()
            },
        );
    }

    pub fn fund_symbols(&self) -> Vec<String> {
        self.funds.keys().cloned().collect()
    }

    /// Union of every fund holding plus every tracked symbol, deduplicated,
    /// in deterministic order.
    pub fn all_symbols(&self) -> Vec<String> {
        let mut seen = std::collections::BTreeSet::new();
        for holdings in self.funds.values() {
            for holding in holdings {
                seen.insert(holding.ticker.clone());
            }
        }
        for ticker in self.stocks.keys() {
            seen.insert(ticker.clone());
        }
        seen.into_iter().collect()
    }

    /// Sector tag for a ticker, falling back to "Unknown".
    pub fn sector_of(&self, ticker: &str) -> &str {
        if let Some(sector) = self.stocks.get(ticker) {
            return sector;
        }
        for holdings in self.funds.values() {
            if let Some(holding) = holdings.iter().find(|h| h.ticker == ticker) {
                return &holding.sector;
            }
        }
        "Unknown"
    }

    pub fn company_names(&self) -> &HashMap<String, String> {
        &self.company_names
    }

    /// Ticker -> sector for the whole universe.
    pub fn sectors(&self) -> HashMap<String, String> {
        let mut map = HashMap::new();
        for holdings in self.funds.values() {
            for holding in holdings {
                map.entry(holding.ticker.clone())
                    .or_insert_with(|| holding.sector.clone());
            }
        }
        for (ticker, sector) in &self.stocks {
            map.entry(ticker.clone()).or_insert_with(|| sector.clone());
        }
        map
    }

    /// Snapshot of analysis targets for one run.
    pub fn targets(&self) -> Vec<AnalysisTarget> {
        let mut targets: Vec<AnalysisTarget> = self
            .funds
            .iter()
            .map(|(name, holdings)| AnalysisTarget::Fund {
                name: name.clone(),
                holdings: holdings.clone(),
            })
            .collect();
        targets.extend(self.stocks.iter().map(|(ticker, sector)| {
            AnalysisTarget::Stock {
                ticker: ticker.clone(),
                sector: sector.clone(),
            }
        }));
        targets
    }

    pub fn holding_count(&self, fund: &str) -> usize {
        self.funds.get(fund).map_or(0, Vec::len)
    }
}

/// Map raw scraped sector strings onto the internal "Family/Sub" tags the
/// prompts use.
pub fn map_sector(raw: &str) -> String {
    let s = raw.to_lowercase();
    if s.contains("tech") || s.contains("computation") {
        return "Tech/General".to_string();
    }
    if s.contains("health") || s.contains("pharma") {
        return "Healthcare/General".to_string();
    }
    if s.contains("financial") || s.contains("finance") || s.contains("bank") {
        return "Financials/General".to_string();
    }
    if s.contains("energy") || s.contains("oil") {
        return "Energy/General".to_string();
    }
    if s.contains("consumer") || s.contains("retail") {
        return "Consumer/General".to_string();
    }
    if s.contains("industrial") {
        return "Industrials/General".to_string();
    }
    if s.contains("utility") || s.contains("utilities") {
        return "Utilities/General".to_string();
    }
    if s.contains("material") {
        return "Materials/General".to_string();
    }
    if s.contains("estate") {
        return "RealEstate/General".to_string();
    }
    if s.contains("communication") || s.contains("telecom") {
        return "Tech/Internet".to_string();
    }
    if s.is_empty() || s == "unknown" {
        return "Unknown".to_string();
    }
    let mut chars = raw.chars();
    let capitalized = match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase(),
        None => String::new(),
    };
    format!("Other/{}", capitalized)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn holding(ticker: &str, name: &str, sector: &str) -> Holding {
        Holding {
            ticker: ticker.to_string(),
            name: name.to_string(),
            sector: sector.to_string(),
            weight: 1.0,
        }
    }

    #[test]
    fn sector_mapping_normalizes_families() {
        assert_eq!(map_sector("Information Technology"), "Tech/General");
        assert_eq!(map_sector("HEALTH CARE"), "Healthcare/General");
        assert_eq!(map_sector("Banking"), "Financials/General");
        assert_eq!(map_sector("Oil & Gas"), "Energy/General");
        assert_eq!(map_sector("Telecommunications"), "Tech/Internet");
        assert_eq!(map_sector(""), "Unknown");
        assert_eq!(map_sector("Aerospace"), "Other/Aerospace");
    }

    #[test]
    fn all_symbols_is_deduplicated_union() {
        let mut registry = Registry::new();
        registry.set_fund_holdings(
            "FNILX",
            vec![
                holding("AAPL", "Apple Inc", "Technology"),
                holding("NVDA", "NVIDIA", "Technology"),
            ],
        );
        registry.set_fund_holdings("FZILX", vec![holding("AAPL", "Apple Inc", "Technology")]);
        registry.add_stock("UURAF", "Energy/Uranium");

        let symbols = registry.all_symbols();
        assert_eq!(symbols, vec!["AAPL", "NVDA", "UURAF"]);
    }

    #[test]
    fn sector_lookup_falls_back_to_unknown() {
        let mut registry = Registry::new();
        registry.set_fund_holdings("FNILX", vec![holding("AAPL", "Apple Inc", "Technology")]);
        registry.add_stock("UURAF", "Energy/Uranium");

        assert_eq!(registry.sector_of("AAPL"), "Tech/General");
        assert_eq!(registry.sector_of("UURAF"), "Energy/Uranium");
        assert_eq!(registry.sector_of("ZZZZ"), "Unknown");
    }

    #[test]
    fn targets_cover_funds_then_stocks() {
        let mut registry = Registry::new();
        registry.set_fund_holdings("FNILX", vec![holding("AAPL", "Apple Inc", "Technology")]);
        registry.add_stock("UURAF", "Energy/Uranium");

        let targets = registry.targets();
        assert_eq!(targets.len(), 2);
        assert_eq!(targets[0].label(), "FNILX");
        assert_eq!(targets[1].label(), "UURAF");
    }

    #[test]
    fn company_names_default_to_ticker() {
        let mut registry = Registry::new();
        registry.set_fund_holdings("FNILX", vec![holding("AAPL", "", "Technology")]);
        assert_eq!(registry.company_names()["AAPL"], "AAPL");
    }
}
