//! Prompt templates for fund-level and single-stock sentiment analysis.
//! Structural rendering only: articles arrive already truncated, so this
//! module stays free of size management and is testable by string containment.

use crate::data::Article;

pub const SYSTEM_PROMPT: &str =
    "You are a financial analyst providing sentiment analysis in JSON format.";

const AGGREGATE_TEMPLATE: &str = r#"You are a Senior Portfolio Manager at a top-tier hedge fund. Provide a high-conviction analysis of {fund_name}.

Context: Today, {active_count} out of {total_holdings} holdings in {fund_name} had newsworthy developments. The remaining stocks had no significant news.

Sector-Tagged News Articles:
{articles}

Each article is tagged with its sector (e.g., "Tech/AI", "Financials/Banking") to help you identify sector-level trends.

CRITICAL INSTRUCTIONS:
1. **Hallucination Guard**: If the provided news is insufficient, outdated, or sparse, respond with "Insufficient Data" in the rationale. DO NOT attempt to guess current sentiment based on your training data.

2. **Signal Diversification**: This fund is market-cap weighted. Explicitly identify if sentiment is driven by the largest holdings (the "Top Weights") or if there is broader "market breadth" across the mid-sized and smaller holdings in the sample.

3. **Sector Rotation**: Identify any sector rotation themes (e.g., "Tech to Financials rotation", "Risk-on to defensive shift").

4. **Macro Context**: Consider macro themes like industrial trends, interest rates, policy changes, and earnings season relevant to the holdings.

Provide an aggregate fund-level sentiment analysis in JSON format:
{
  "ticker": "{fund_name}",
  "sentiment_score": <1-10 integer>,
  "top_insights": [
    "Identify if sentiment is top-heavy or broad-based",
    "Sector rotation or dominant sector theme",
    "Key macro risk or opportunity"
  ],
  "rationale": "<fund-level explanation or 'Insufficient Data'>"
}

Sentiment Scale:
1-3: Bearish (Negative news outweighs positive, downside risks)
4-6: Neutral (Mixed signals, balanced news, or low conviction)
7-10: Bullish (Positive news dominates, upside catalysts)

Focus on: Weight concentration vs breadth, sector rotation, and relevant macro themes.

IMPORTANT: Return ONLY the JSON object, no additional text or markdown formatting."#;

const INDIVIDUAL_TEMPLATE: &str = r#"You are a Senior Equity Analyst specializing in {sector}. Analyze the following news for {ticker}:

News Articles:
{articles}

CRITICAL INSTRUCTIONS:
1. **Hallucination Guard**: If news is insufficient or outdated, respond with "Insufficient Data" in rationale. DO NOT guess based on historical knowledge.

2. **Sector-Specific Focus**: For {ticker} ({sector}), focus on industry-specific catalysts:
   - Energy/Uranium: Spot prices, policy (IRA, nuclear renaissance), production, enrichment capacity, supply/demand
   - Tech: Product launches, earnings, competitive dynamics, regulatory
   - Financials: Credit trends, rates, loan growth, capital allocation
   - Healthcare: Drug approvals, clinical trials, reimbursement, M&A
   - Consumer: Sales trends, traffic, pricing power, margin expansion
   - NOT general market sentiment or macro trends (unless directly impacting sector)

3. **Company-Specific**: Focus on company-specific news, not broader sector commentary.

Provide analysis in JSON format:
{
  "ticker": "{ticker}",
  "sentiment_score": <1-10 integer>,
  "top_insights": [
    "Sector-specific catalyst 1",
    "Sector-specific catalyst 2",
    "Sector-specific catalyst 3"
  ],
  "rationale": "<sector-focused explanation or 'Insufficient Data'>"
}

Sentiment Scale:
1-3: Bearish (Negative developments, downside risks)
4-6: Neutral (Mixed news, balanced outlook)
7-10: Bullish (Positive catalysts, upside potential)

Focus on: Industry-specific drivers, NOT general market conditions.

IMPORTANT: Return ONLY the JSON object, no additional text or markdown formatting."#;

/// Render the aggregate (fund-level) prompt. Articles carry their source
/// ticker and sector tag so the model can reason about breadth vs
/// concentration across the fund.
pub fn aggregate_prompt(
    fund_name: &str,
    articles: &[Article],
    active_count: usize,
    total_holdings: usize,
) -> String {
    let mut articles_text = String::new();
    for article in articles {
        articles_text.push_str(&format!(
            "\n[{} - {}]\nHeadline: {}\nSummary: {}\nSource: {}\n",
            article.ticker, article.sector, article.headline, article.summary, article.source
        ));
    }

    AGGREGATE_TEMPLATE
        .replace("{fund_name}", fund_name)
        .replace("{active_count}", &active_count.to_string())
        .replace("{total_holdings}", &total_holdings.to_string())
        .replace("{articles}", articles_text.trim())
}

/// Render the individual (single-stock) prompt with its sector-catalyst
/// guidance.
pub fn individual_prompt(ticker: &str, sector: &str, articles: &[Article]) -> String {
    let mut articles_text = String::new();
    for article in articles {
        articles_text.push_str(&format!(
            "\nHeadline: {}\nSummary: {}\nSource: {}\n",
            article.headline, article.summary, article.source
        ));
    }

    INDIVIDUAL_TEMPLATE
        .replace("{ticker}", ticker)
        .replace("{sector}", sector)
        .replace("{articles}", articles_text.trim())
}

/// Sentiment label for a 1-10 score: 1-3 bearish, 4-6 neutral, 7-10 bullish.
pub fn sentiment_label(score: i64) -> &'static str {
    match score {
        ..=3 => "Bearish",
        4..=6 => "Neutral",
        _ => "Bullish",
    }
}

pub fn sentiment_emoji(score: i64) -> &'static str {
    match score {
        ..=3 => "📉",
        4..=6 => "➖",
        _ => "📈",
    }
}
