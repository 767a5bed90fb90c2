use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

use crate::analysis::{CompletionBackend, GroqClient, SentimentAnalyzer, SentimentRecord};
use crate::config::Config;
use crate::data::{FinnhubClient, HoldingsScraper, NewsApi, NewsBatch, NewsFetcher};
use crate::delivery::{ErrorRecord, Notifier, TelegramClient};
use crate::errors::PipelineResult;
use crate::registry::{AnalysisTarget, Registry, WatchlistStore};
use crate::storage::SentimentLog;

/// What one analysis pass produced, separated so persistence and reporting
/// can each consume their part.
#[derive(Debug, Default)]
pub struct AnalysisOutcome {
    pub results: Vec<SentimentRecord>,
    pub errors: Vec<ErrorRecord>,
    pub no_news: Vec<String>,
}

pub struct DailyOrchestrator {
    registry: Registry,
    store: WatchlistStore,
    fetcher: NewsFetcher,
    analyzer: SentimentAnalyzer,
    scraper: HoldingsScraper,
    log: SentimentLog,
    notifier: Arc<dyn Notifier>,
}

impl DailyOrchestrator {
    pub fn new(config: Config) -> PipelineResult<Self> {
        let store = WatchlistStore::new(&config.storage.data_dir);
        let registry = Registry::load(&store)?;
        let news_api = Arc::new(FinnhubClient::new(&config.news)?);
        let backend = Arc::new(GroqClient::new(&config.llm)?);
        let notifier = Arc::new(TelegramClient::new(&config.telegram)?);
        Self::with_components(config, registry, store, news_api, backend, notifier)
    }

    /// Wire the pipeline from explicit collaborators. Tests inject scripted
    /// providers and a recording notifier through this path.
    pub fn with_components(
        config: Config,
        registry: Registry,
        store: WatchlistStore,
        news_api: Arc<dyn NewsApi>,
        backend: Arc<dyn CompletionBackend>,
        notifier: Arc<dyn Notifier>,
    ) -> PipelineResult<Self> {
        let fetcher = NewsFetcher::new(news_api, config.fetch.clone());
        let analyzer = SentimentAnalyzer::new(backend, config.fetch.max_summary_length);
        let scraper = HoldingsScraper::new()?;
        let log = SentimentLog::new(&config.storage.sentiment_csv);

        Ok(Self {
            registry,
            store,
            fetcher,
            analyzer,
            scraper,
            log,
            notifier,
        })
    }

    /// Track extra funds for this run only, without touching the persisted
    /// watchlist. Their holdings are scraped during the refresh step.
    pub fn track_funds(&mut self, funds: &[String]) {
        for fund in funds {
            info!(fund = fund.as_str(), "Tracking extra fund for this run");
            self.registry.add_fund(fund);
        }
    }

    /// Runs the full daily pipeline. Returns `Ok(true)` when the run
    /// finished with at least one result or a legitimately quiet market,
    /// `Ok(false)` when it produced nothing useful.
    pub async fn run(&mut self, refresh_holdings: bool) -> PipelineResult<bool> {
        let started = Instant::now();
        info!(refresh_holdings, "Starting daily sentiment run");

        self.refresh_holdings(refresh_holdings).await;

        let symbols = self.registry.all_symbols();
        if symbols.is_empty() {
            warn!("Watchlist resolves to zero symbols, nothing to do");
            return Ok(false);
        }
        info!(symbols = symbols.len(), "Fetching news for watchlist");

        let batch = match self
            .fetcher
            .fetch(
                &symbols,
                self.registry.company_names(),
                &self.registry.sectors(),
            )
            .await
        {
            Ok(batch) => batch,
            Err(err) => {
                error!(error = %err, "News fetch aborted");
                self.notifier
                    .send_critical_alert("News fetch failed", &err.user_detail(), "daily run")
                    .await;
                return Ok(false);
            }
        };

        if batch.total_articles() == 0 {
            info!("No relevant news for any symbol, skipping analysis");
            self.notifier.send_market_quiet().await;
            return Ok(true);
        }
        info!(
            articles = batch.total_articles(),
            symbols_with_news = batch.symbol_count(),
            "News fetch complete"
        );

        let targets = self.registry.targets();
        let outcome = analyze_targets(&targets, &batch, &self.registry, &self.analyzer).await;

        if let Err(err) = self.log.append_all(&outcome.results) {
            // The report still carries the results; only history is lost.
            error!(error = %err, "Failed to persist results");
        }

        self.notifier
            .send_daily_report(
                &outcome.results,
                batch.total_articles(),
                &outcome.errors,
                &outcome.no_news,
                started.elapsed(),
            )
            .await;

        info!(
            results = outcome.results.len(),
            errors = outcome.errors.len(),
            quiet = outcome.no_news.len(),
            runtime_secs = started.elapsed().as_secs(),
            "Daily run finished"
        );
        Ok(!outcome.results.is_empty())
    }

    /// Fill in fund holdings, preferring the on-disk cache unless a refresh
    /// was requested. A failed scrape never discards a usable cache.
    async fn refresh_holdings(&mut self, force: bool) {
        for fund in self.registry.fund_symbols() {
            if !force && self.registry.holding_count(&fund) > 0 {
                continue;
            }
            match self.scraper.get_holdings(&fund).await {
                Ok(Some(holdings)) if !holdings.is_empty() => {
                    info!(fund = fund.as_str(), count = holdings.len(), "Scraped holdings");
                    if let Err(err) = self.store.save_holdings_cache(&fund, &holdings) {
                        warn!(fund = fund.as_str(), error = %err, "Could not cache holdings");
                    }
                    self.registry.set_fund_holdings(&fund, holdings);
                }
                Ok(Some(_)) => {
                    warn!(fund = fund.as_str(), "Symbol resolves to a single stock, no holdings");
                }
                Ok(None) => {
                    warn!(fund = fund.as_str(), "No holdings found, keeping cached data");
                }
                Err(err) => {
                    warn!(fund = fund.as_str(), error = %err, "Holdings scrape failed");
                }
            }
        }
    }

}

/// Analyze every target against the fetched batch. Failures are isolated
/// per target: one bad analysis becomes an error record, not a run abort.
pub async fn analyze_targets(
    targets: &[AnalysisTarget],
    batch: &NewsBatch,
    registry: &Registry,
    analyzer: &SentimentAnalyzer,
) -> AnalysisOutcome {
    let sectors = registry.sectors();
    let mut outcome = AnalysisOutcome::default();

    for target in targets {
        match target {
            AnalysisTarget::Fund { name, holdings } => {
                let mut fund_news: BTreeMap<String, Vec<_>> = BTreeMap::new();
                for holding in holdings {
                    if let Some(articles) = batch.get(&holding.ticker) {
                        fund_news.insert(holding.ticker.clone(), articles.to_vec());
                    }
                }
                if fund_news.is_empty() {
                    outcome.no_news.push(name.clone());
                    continue;
                }
                match analyzer
                    .analyze_aggregate(name, &fund_news, &sectors, holdings.len())
                    .await
                {
                    Ok(mut record) => {
                        record.ticker = name.clone();
                        outcome.results.push(record);
                    }
                    Err(err) => {
                        warn!(fund = name.as_str(), error = %err, "Fund analysis failed");
                        outcome.errors.push(ErrorRecord::from_error(name, &err));
                    }
                }
            }
            AnalysisTarget::Stock { ticker, sector } => {
                let articles = match batch.get(ticker) {
                    Some(articles) if !articles.is_empty() => articles,
                    _ => {
                        outcome.no_news.push(ticker.clone());
                        continue;
                    }
                };
                match analyzer.analyze_individual(ticker, sector, articles).await {
                    Ok(mut record) => {
                        record.ticker = ticker.clone();
                        outcome.results.push(record);
                    }
                    Err(err) => {
                        warn!(ticker = ticker.as_str(), error = %err, "Stock analysis failed");
                        outcome.errors.push(ErrorRecord::from_error(ticker, &err));
                    }
                }
            }
        }
    }

    outcome
}
