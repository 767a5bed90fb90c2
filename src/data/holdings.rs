use serde_json::Value;
use tracing::{info, warn};

use crate::errors::PipelineResult;
use crate::registry::Holding;

const NEXT_DATA_OPEN: &str = r#"<script id="__NEXT_DATA__" type="application/json">"#;

/// Best-effort fund-holdings scraper for stockanalysis.com.
///
/// Returns `None` on any miss so the caller can keep previously cached
/// holdings. Stale data is preferred over no data.
pub struct HoldingsScraper {
    http: reqwest::Client,
}

impl HoldingsScraper {
    pub fn new() -> PipelineResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .user_agent(
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36",
            )
            .build()?;
        Ok(Self { http })
    }

    /// Scrape top holdings for a fund symbol.
    ///
    /// Tries ETF, mutual-fund, and quote URL shapes in order. A hit on a
    /// stock/OTC page means the symbol is not a fund: returns an empty list.
    pub async fn get_holdings(&self, fund: &str) -> PipelineResult<Option<Vec<Holding>>> {
        let fund = fund.to_uppercase();
        let base = "https://stockanalysis.com";
        let candidates = [
            format!("{base}/etf/{}/holdings/", fund.to_lowercase()),
            format!("{base}/mutual-fund/{}/holdings/", fund.to_lowercase()),
            format!("{base}/quote/mutf/{fund}/holdings/"),
            format!("{base}/quote/otc/{fund}/holdings/"),
            format!("{base}/stocks/{}/holdings/", fund.to_lowercase()),
        ];

        for url in &candidates {
            let response = match self.http.get(url).send().await {
                Ok(r) if r.status().is_success() => r,
                _ => continue,
            };

            info!(url, "Holdings page found");
            if url.contains("/stocks/") || url.contains("/quote/otc/") {
                warn!(fund = fund.as_str(), "Symbol resolves to a stock/OTC page, not a fund");
                return Ok(Some(Vec::new()));
            }

            let body = response.text().await?;
            if let Some(payload) = extract_next_data(&body) {
                if let Some(list) = find_holdings_list(&payload) {
                    let holdings = parse_holdings(list);
                    if !holdings.is_empty() {
                        info!(
                            fund = fund.as_str(),
                            count = holdings.len(),
                            "Extracted holdings from embedded JSON"
                        );
                        return Ok(Some(holdings));
                    }
                }
            }
            warn!(fund = fund.as_str(), "No holdings payload in page");
            return Ok(None);
        }

        warn!(fund = fund.as_str(), "Failed to fetch any holdings page");
        Ok(None)
    }
}

/// Pull the `__NEXT_DATA__` JSON blob out of the page HTML.
fn extract_next_data(body: &str) -> Option<Value> {
    let start = body.find(NEXT_DATA_OPEN)? + NEXT_DATA_OPEN.len();
    let end = body[start..].find("</script>")?;
    serde_json::from_str(&body[start..start + end]).ok()
}

/// Recursively search the payload for a list that looks like holdings:
/// keyed `holdings` or `data`, first element an object with a `symbol`.
fn find_holdings_list(value: &Value) -> Option<&Vec<Value>> {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                if matches!(key.as_str(), "holdings" | "data") {
                    if let Value::Array(items) = child {
                        if items
                            .first()
                            .map_or(false, |first| first.get("symbol").is_some())
                        {
                            return Some(items);
                        }
                    }
                }
                if let Some(found) = find_holdings_list(child) {
                    return Some(found);
                }
            }
            None
        }
        Value::Array(items) => items.iter().find_map(find_holdings_list),
        _ => None,
    }
}

fn parse_holdings(items: &[Value]) -> Vec<Holding> {
    items
        .iter()
        .filter_map(|item| {
            let ticker = clean_ticker(item.get("symbol").and_then(Value::as_str).unwrap_or(""));
            if ticker.is_empty() {
                // Cash positions and index futures have no usable symbol
                return None;
            }

            let name = item
                .get("name")
                .or_else(|| item.get("companyName"))
                .and_then(Value::as_str)
                .unwrap_or(&ticker)
                .to_string();
            let sector = item
                .get("sector")
                .or_else(|| item.get("industry"))
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .unwrap_or("Unknown")
                .to_string();

            Some(Holding {
                ticker,
                name,
                sector,
                weight: parse_weight(item.get("% Weight").or_else(|| item.get("weight"))),
            })
        })
        .collect()
}

fn parse_weight(value: Option<&Value>) -> f64 {
    match value {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.trim().trim_end_matches('%').trim().parse().unwrap_or(0.0),
        _ => 0.0,
    }
}

/// Strip exchange prefixes: "TPE: 2330" -> "2330".
fn clean_ticker(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.eq_ignore_ascii_case("nan") {
        return String::new();
    }
    match trimmed.rsplit_once(':') {
        Some((_, suffix)) => suffix.trim().to_string(),
        None => trimmed.to_string(),
    }
}
