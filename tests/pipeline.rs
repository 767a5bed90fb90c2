//! End-to-end pipeline behavior against mocked news and LLM backends:
//! call pacing, fatal-error abort, and per-target failure isolation.

use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use marketpulse::analysis::llm::CompletionBackend;
use marketpulse::analysis::SentimentAnalyzer;
use marketpulse::config::Config;
use marketpulse::data::news::NewsApi;
use marketpulse::data::{Article, NewsBatch, NewsFetcher, RawArticle};
use marketpulse::errors::{PipelineError, PipelineResult};
use marketpulse::orchestrator::analyze_targets;
use marketpulse::registry::{Holding, Registry};

fn raw_article(symbol: &str) -> RawArticle {
    RawArticle {
        headline: format!("{} quarterly results announced", symbol),
        summary: format!("{} beat expectations this quarter.", symbol),
        source: "wire".to_string(),
        datetime: 1_700_000_000,
    }
}

/// News backend that succeeds for every symbol and counts calls.
struct CountingNews {
    calls: AtomicUsize,
}

#[async_trait]
impl NewsApi for CountingNews {
    async fn company_news(
        &self,
        symbol: &str,
        _from: NaiveDate,
        _to: NaiveDate,
    ) -> PipelineResult<Vec<RawArticle>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(vec![raw_article(symbol)])
    }
}

/// Scripted news backend: pops one canned outcome per call.
struct ScriptedNews {
    script: Mutex<VecDeque<PipelineResult<Vec<RawArticle>>>>,
    calls: AtomicUsize,
}

impl ScriptedNews {
    fn new(script: Vec<PipelineResult<Vec<RawArticle>>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl NewsApi for ScriptedNews {
    async fn company_news(
        &self,
        symbol: &str,
        _from: NaiveDate,
        _to: NaiveDate,
    ) -> PipelineResult<Vec<RawArticle>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.script
            .lock()
            .expect("script lock")
            .pop_front()
            .unwrap_or_else(|| Ok(vec![raw_article(symbol)]))
    }
}

fn fetcher_with(api: Arc<dyn NewsApi>) -> NewsFetcher {
    NewsFetcher::new(api, Config::default().fetch)
}

fn symbols(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

#[tokio::test(start_paused = true)]
async fn fetch_paces_every_call_with_the_configured_delay() {
    let api = Arc::new(CountingNews {
        calls: AtomicUsize::new(0),
    });
    let fetcher = fetcher_with(api.clone());

    let started = tokio::time::Instant::now();
    let batch = fetcher
        .fetch(&symbols(&["AAPL", "MSFT", "NVDA"]), &HashMap::new(), &HashMap::new())
        .await
        .expect("fetch succeeds");

    // 3 serial calls, 1.1s pause after each one, nothing else advances the
    // paused clock
    assert_eq!(started.elapsed(), Duration::from_millis(3 * 1100));
    assert_eq!(api.calls.load(Ordering::SeqCst), 3);
    assert_eq!(batch.symbol_count(), 3);
}

#[tokio::test(start_paused = true)]
async fn fetch_retries_rate_limits_then_succeeds() {
    let api = Arc::new(ScriptedNews::new(vec![
        Err(PipelineError::RateLimited {
            context: "company-news".to_string(),
        }),
        Err(PipelineError::RateLimited {
            context: "company-news".to_string(),
        }),
        Ok(vec![raw_article("AAPL")]),
    ]));
    let fetcher = fetcher_with(api.clone());

    let batch = fetcher
        .fetch(&symbols(&["AAPL"]), &HashMap::new(), &HashMap::new())
        .await
        .expect("fetch succeeds after retries");

    assert_eq!(api.calls.load(Ordering::SeqCst), 3);
    assert!(batch.contains("AAPL"));
}

#[tokio::test(start_paused = true)]
async fn fetch_aborts_on_authentication_failure() {
    let api = Arc::new(ScriptedNews::new(vec![
        Ok(vec![raw_article("AAPL")]),
        Err(PipelineError::Authentication("key revoked".to_string())),
        Ok(vec![raw_article("NVDA")]),
    ]));
    let fetcher = fetcher_with(api.clone());

    let started = tokio::time::Instant::now();
    let result = fetcher
        .fetch(&symbols(&["AAPL", "MSFT", "NVDA"]), &HashMap::new(), &HashMap::new())
        .await;

    assert!(matches!(result, Err(PipelineError::Authentication(_))));
    // third symbol never queried, but the pause still followed both calls
    assert_eq!(api.calls.load(Ordering::SeqCst), 2);
    assert_eq!(started.elapsed(), Duration::from_millis(2 * 1100));
}

#[tokio::test(start_paused = true)]
async fn fetch_skips_symbols_that_fail_non_fatally() {
    let api = Arc::new(ScriptedNews::new(vec![
        Err(PipelineError::Api {
            status_code: 404,
            message: "unknown symbol".to_string(),
        }),
        Ok(vec![raw_article("NVDA")]),
    ]));
    let fetcher = fetcher_with(api);

    let batch = fetcher
        .fetch(&symbols(&["ZZZZ", "NVDA"]), &HashMap::new(), &HashMap::new())
        .await
        .expect("non-fatal failure is skipped");

    assert!(!batch.contains("ZZZZ"));
    assert!(batch.contains("NVDA"));
}

/// LLM backend that pops one canned response per call.
struct ScriptedBackend {
    script: Mutex<VecDeque<String>>,
    calls: AtomicUsize,
}

impl ScriptedBackend {
    fn new(responses: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(responses.iter().map(|s| s.to_string()).collect()),
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl CompletionBackend for ScriptedBackend {
    async fn complete(&self, _system: &str, _user: &str) -> PipelineResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.script
            .lock()
            .expect("script lock")
            .pop_front()
            .ok_or_else(|| PipelineError::Api {
                status_code: 500,
                message: "script exhausted".to_string(),
            })
    }
}

fn article(ticker: &str) -> Article {
    Article {
        ticker: ticker.to_string(),
        sector: "Tech/General".to_string(),
        headline: format!("{} news", ticker),
        summary: "short summary".to_string(),
        source: "wire".to_string(),
    }
}

fn holding(ticker: &str) -> Holding {
    Holding {
        ticker: ticker.to_string(),
        name: format!("{} Inc", ticker),
        sector: "Technology".to_string(),
        weight: 2.5,
    }
}

fn test_registry() -> Registry {
    let mut registry = Registry::new();
    registry.set_fund_holdings("FNILX", vec![holding("AAPL"), holding("NVDA")]);
    registry.add_stock("UURAF", "Energy/Uranium");
    registry.add_stock("GME", "Consumer/Retail");
    registry
}

const FUND_RESPONSE: &str = r#"{"ticker": "FNILX", "sentiment_score": 7, "top_insights": ["broad strength", "tech leads"], "rationale": "Holdings news skews clearly positive today."}"#;

#[tokio::test]
async fn one_bad_target_does_not_poison_the_rest() {
    let registry = test_registry();
    let mut batch = NewsBatch::new();
    batch.insert("AAPL", vec![article("AAPL")]);
    batch.insert("UURAF", vec![article("UURAF")]);

    // Funds analyze before stocks: first response feeds FNILX, the garbage
    // second response feeds UURAF
    let backend = ScriptedBackend::new(&[FUND_RESPONSE, "not json at all"]);
    let analyzer = SentimentAnalyzer::new(backend.clone(), 200);

    let outcome = analyze_targets(&registry.targets(), &batch, &registry, &analyzer).await;

    assert_eq!(outcome.results.len(), 1);
    assert_eq!(outcome.results[0].ticker, "FNILX");
    assert_eq!(outcome.results[0].sentiment_score, 7);

    assert_eq!(outcome.errors.len(), 1);
    assert_eq!(outcome.errors[0].ticker, "UURAF");
    assert_eq!(outcome.errors[0].kind, "Parsing");

    // GME had no news: reported quiet, never analyzed
    assert_eq!(outcome.no_news, vec!["GME".to_string()]);
    assert_eq!(backend.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn empty_batch_never_reaches_the_llm() {
    let registry = test_registry();
    let batch = NewsBatch::new();

    let backend = ScriptedBackend::new(&[]);
    let analyzer = SentimentAnalyzer::new(backend.clone(), 200);

    let outcome = analyze_targets(&registry.targets(), &batch, &registry, &analyzer).await;

    assert!(outcome.results.is_empty());
    assert!(outcome.errors.is_empty());
    assert_eq!(
        outcome.no_news,
        vec!["FNILX".to_string(), "GME".to_string(), "UURAF".to_string()]
    );
    assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn fund_result_is_labeled_with_the_fund_name() {
    let registry = test_registry();
    let mut batch = NewsBatch::new();
    batch.insert("NVDA", vec![article("NVDA")]);

    // model echoes a holding ticker; the pipeline overrides it
    let stray = FUND_RESPONSE.replace("FNILX", "NVDA");
    let backend = ScriptedBackend::new(&[&stray]);
    let analyzer = SentimentAnalyzer::new(backend, 200);

    let outcome = analyze_targets(&registry.targets(), &batch, &registry, &analyzer).await;

    assert_eq!(outcome.results.len(), 1);
    assert_eq!(outcome.results[0].ticker, "FNILX");
}
