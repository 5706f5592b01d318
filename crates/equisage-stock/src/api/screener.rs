//! Screener.in company page scraper
//!
//! Screener publishes one HTML page per listed company. The parser reads the
//! company heading, the top ratio panel, the pros/cons lists and two tables
//! (quarterly results, shareholding pattern). Only the structure of those
//! sections is relied upon, never their styling.

use super::{http_client, send_with_retry};
use crate::cache::{CacheKey, StockCache};
use crate::config::StockConfig;
use crate::error::{Result, StockError};
use equisage_core::{Fundamentals, Metric, Table, TableRow};
use regex::Regex;
use reqwest::{Client, StatusCode};
use tracing::{debug, info};

/// Base URL of the company pages
pub const SCREENER_BASE_URL: &str = "https://www.screener.in/company";

/// Screener.in client with a fundamentals cache
pub struct ScreenerClient {
    client: Client,
    config: StockConfig,
    base_url: String,
    cache: StockCache<Fundamentals>,
}

impl ScreenerClient {
    /// Create a client from the stock configuration
    pub fn new(config: &StockConfig) -> Result<Self> {
        Ok(Self {
            client: http_client(config)?,
            config: config.clone(),
            base_url: SCREENER_BASE_URL.to_string(),
            cache: StockCache::new(config.cache_ttl_fundamental),
        })
    }

    /// Point the client at another host (mirrors, tests)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Page URL for an exchange ticker such as `TCS.NS`
    pub fn company_url(&self, ticker: &str) -> Result<String> {
        Ok(format!("{}/{}/", self.base_url, screener_symbol(ticker)?))
    }

    /// Fetch and parse the company page, using the cache when fresh
    pub async fn company(&self, ticker: &str) -> Result<Fundamentals> {
        let url = self.company_url(ticker)?;
        let key = CacheKey::new(screener_symbol(ticker)?, "screener");
        self.cache
            .get_or_fetch(key, || self.fetch_page(ticker, url))
            .await
    }

    async fn fetch_page(&self, ticker: &str, url: String) -> Result<Fundamentals> {
        info!(ticker, url = %url, "Fetching company page");
        let response = send_with_retry(&self.config, || self.client.get(&url)).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(StockError::DataUnavailable {
                symbol: ticker.to_string(),
                reason: "company page not found".to_string(),
            });
        }

        let html = response.text().await?;
        debug!(bytes = html.len(), "Company page downloaded");
        parse_company_page(&html, &url, ticker)
    }
}

/// Screener symbol for an exchange ticker: exchange suffix removed, uppercased
pub fn screener_symbol(ticker: &str) -> Result<String> {
    let upper = ticker.trim().to_uppercase();
    let symbol = upper
        .strip_suffix(".NS")
        .or_else(|| upper.strip_suffix(".BO"))
        .unwrap_or(&upper);

    if symbol.is_empty()
        || !symbol
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '&' || c == '-')
    {
        return Err(StockError::InvalidSymbol(ticker.to_string()));
    }
    Ok(symbol.to_string())
}

struct PagePatterns {
    not_found: Regex,
    heading: Regex,
    list_item: Regex,
    ratio_name: Regex,
    pros: Regex,
    cons: Regex,
    table: Regex,
    thead: Regex,
    tbody: Regex,
    header_cell: Regex,
    row: Regex,
    cell: Regex,
    tag: Regex,
}

impl PagePatterns {
    fn compile() -> Result<Self> {
        let re = |pattern: &str| {
            Regex::new(pattern).map_err(|e| StockError::ParseError(e.to_string()))
        };
        Ok(Self {
            not_found: re(r#"<h1[^>]*class="[^"]*\btext-center\b"#)?,
            heading: re(r"(?s)<h1[^>]*>(.*?)</h1>")?,
            list_item: re(r"(?s)<li[^>]*>(.*?)</li>")?,
            ratio_name: re(r#"(?s)<span[^>]*class="[^"]*\bname\b[^"]*"[^>]*>(.*?)</span>"#)?,
            pros: re(r#"(?s)<div[^>]*class="[^"]*\bpros\b[^"]*"[^>]*>(.*?)</div>"#)?,
            cons: re(r#"(?s)<div[^>]*class="[^"]*\bcons\b[^"]*"[^>]*>(.*?)</div>"#)?,
            table: re(r"(?s)<table[^>]*>(.*?)</table>")?,
            thead: re(r"(?s)<thead[^>]*>(.*?)</thead>")?,
            tbody: re(r"(?s)<tbody[^>]*>(.*?)</tbody>")?,
            header_cell: re(r"(?s)<th[^>]*>(.*?)</th>")?,
            row: re(r"(?s)<tr[^>]*>(.*?)</tr>")?,
            cell: re(r"(?s)<td[^>]*>(.*?)</td>")?,
            tag: re(r"<[^>]*>")?,
        })
    }

    fn text(&self, fragment: &str) -> String {
        let stripped = self.tag.replace_all(fragment, " ");
        let decoded = stripped
            .replace("&nbsp;", " ")
            .replace("&amp;", "&")
            .replace("&quot;", "\"")
            .replace("&#39;", "'")
            .replace("&#x27;", "'")
            .replace("&lt;", "<")
            .replace("&gt;", ">")
            .replace("&#8377;", "₹");
        decoded.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    fn items(&self, fragment: &str) -> Vec<String> {
        self.list_item
            .captures_iter(fragment)
            .map(|cap| self.text(&cap[1]))
            .filter(|item| !item.is_empty())
            .collect()
    }

    fn ratios(&self, fragment: &str) -> Vec<Metric> {
        self.list_item
            .captures_iter(fragment)
            .filter_map(|cap| {
                let item = &cap[1];
                let name_match = self.ratio_name.captures(item)?;
                let name = self.text(&name_match[1]);
                let value = self.text(&item.replacen(&name_match[0], "", 1));
                (!name.is_empty()).then(|| Metric::new(name, value))
            })
            .collect()
    }

    fn table(&self, fragment: &str) -> Table {
        let Some(table) = self.table.captures(fragment) else {
            return Table::default();
        };
        let table = &table[1];

        let headers = self
            .thead
            .captures(table)
            .map(|head| {
                self.header_cell
                    .captures_iter(&head[1])
                    .skip(1)
                    .map(|cell| self.text(&cell[1]))
                    .collect()
            })
            .unwrap_or_default();

        let body = self
            .tbody
            .captures(table)
            .and_then(|body| body.get(1))
            .map_or(table, |m| m.as_str());
        let rows = self
            .row
            .captures_iter(body)
            .filter_map(|row| {
                let mut cells = self.cell.captures_iter(&row[1]).map(|cell| self.text(&cell[1]));
                let metric = cells.next()?.replace('+', "").trim().to_string();
                Some(TableRow {
                    metric,
                    values: cells.collect(),
                })
            })
            .collect();

        Table { headers, rows }
    }
}

/// Slice of `html` starting at the element with `id` and ending at `close`
fn section<'a>(html: &'a str, id: &str, close: &str) -> Option<&'a str> {
    let start = html.find(&format!("id=\"{id}\""))?;
    let rest = &html[start..];
    let end = rest.find(close).map_or(rest.len(), |pos| pos + close.len());
    Some(&rest[..end])
}

/// Parse a Screener company page
///
/// `ticker` is used as the company name when the page has no heading.
pub fn parse_company_page(html: &str, source_url: &str, ticker: &str) -> Result<Fundamentals> {
    let patterns = PagePatterns::compile()?;

    if patterns.not_found.is_match(html) {
        return Err(StockError::DataUnavailable {
            symbol: ticker.to_string(),
            reason: "company page not found".to_string(),
        });
    }

    let heading = patterns
        .heading
        .captures(html)
        .map(|cap| patterns.text(&cap[1]))
        .filter(|name| !name.is_empty());

    let key_ratios = section(html, "top-ratios", "</ul>")
        .map(|ratios| patterns.ratios(ratios))
        .unwrap_or_default();

    if heading.is_none() && key_ratios.is_empty() {
        return Err(StockError::ParseError(format!(
            "{source_url} has neither a company heading nor a ratio panel"
        )));
    }

    let pros = patterns
        .pros
        .captures(html)
        .map(|cap| patterns.items(&cap[1]))
        .unwrap_or_default();
    let cons = patterns
        .cons
        .captures(html)
        .map(|cap| patterns.items(&cap[1]))
        .unwrap_or_default();

    let quarterly_results = section(html, "quarters", "</section>")
        .map(|s| patterns.table(s))
        .unwrap_or_default();
    let shareholding_pattern = section(html, "shareholding", "</section>")
        .map(|s| patterns.table(s))
        .unwrap_or_default();

    debug!(
        ratios = key_ratios.len(),
        pros = pros.len(),
        cons = cons.len(),
        quarters = quarterly_results.rows.len(),
        holders = shareholding_pattern.rows.len(),
        "Parsed company page"
    );

    Ok(Fundamentals {
        company_name: heading.unwrap_or_else(|| ticker.to_string()),
        source_url: source_url.to_string(),
        key_ratios,
        pros,
        cons,
        quarterly_results,
        shareholding_pattern,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
<html><body>
<div class="company-info">
  <h1 class="h2 shrink-text" style="margin: 0.25em 0">Tata Consultancy Services Ltd</h1>
</div>
<ul id="top-ratios">
  <li class="flex flex-space-between" data-source="default">
    <span class="name">Market Cap</span>
    <span class="nowrap value">&#8377; <span class="number">14,12,345</span> Cr.</span>
  </li>
  <li class="flex flex-space-between">
    <span class="name">Stock P/E</span>
    <span class="nowrap value"><span class="number">31.2</span></span>
  </li>
  <li class="flex flex-space-between">
    <span class="name">ROCE</span>
    <span class="nowrap value"><span class="number">64.3</span> %</span>
  </li>
</ul>
<section id="analysis">
  <div class="pros">
    <p class="title">Pros</p>
    <ul><li>Company is almost debt free.</li><li>Healthy dividend payout of 80.2%</li></ul>
  </div>
  <div class="cons">
    <p class="title">Cons</p>
    <ul><li>Stock is trading at 14.2 times its book value</li></ul>
  </div>
</section>
<section id="quarters" class="card">
  <table class="data-table">
    <thead><tr><th class="text"></th><th>Dec 2023</th><th>Mar 2024</th></tr></thead>
    <tbody>
      <tr><td class="text"><button>Sales&nbsp;<span>+</span></button></td><td>60,583</td><td>61,237</td></tr>
      <tr class="strong"><td class="text">Net Profit&nbsp;+</td><td>11,097</td><td>12,502</td></tr>
    </tbody>
  </table>
</section>
<section id="shareholding" class="card">
  <table class="data-table">
    <thead><tr><th class="text"></th><th>Dec 2023</th><th>Mar 2024</th></tr></thead>
    <tbody>
      <tr><td class="text">Promoters&nbsp;<span>+</span></td><td>72.41%</td><td>71.77%</td></tr>
      <tr><td class="text">FIIs +</td><td>12.47%</td><td>12.70%</td></tr>
    </tbody>
  </table>
  <table><tbody><tr><td>Yearly</td></tr></tbody></table>
</section>
</body></html>
"#;

    #[test]
    fn test_screener_symbol() {
        assert_eq!(screener_symbol("tcs.ns").unwrap(), "TCS");
        assert_eq!(screener_symbol("M&M.NS").unwrap(), "M&M");
        assert_eq!(screener_symbol("500325.BO").unwrap(), "500325");
        assert!(matches!(screener_symbol(" .NS"), Err(StockError::InvalidSymbol(_))));
        assert!(screener_symbol("../admin").is_err());
    }

    #[test]
    fn test_parse_company_page() {
        let url = "https://www.screener.in/company/TCS/";
        let fundamentals = parse_company_page(PAGE, url, "TCS.NS").unwrap();

        assert_eq!(fundamentals.company_name, "Tata Consultancy Services Ltd");
        assert_eq!(fundamentals.source_url, url);
        assert_eq!(fundamentals.key_ratios.len(), 3);
        assert_eq!(fundamentals.ratio("Stock P/E"), Some("31.2"));
        assert_eq!(fundamentals.ratio("ROCE"), Some("64.3 %"));
        assert_eq!(fundamentals.pros.len(), 2);
        assert_eq!(fundamentals.cons, vec!["Stock is trading at 14.2 times its book value"]);
    }

    #[test]
    fn test_parse_tables() {
        let fundamentals = parse_company_page(PAGE, "u", "TCS.NS").unwrap();

        let quarters = &fundamentals.quarterly_results;
        assert_eq!(quarters.headers, vec!["Dec 2023", "Mar 2024"]);
        assert_eq!(quarters.rows[0].metric, "Sales");
        assert_eq!(quarters.row("net profit").unwrap().values, vec!["11,097", "12,502"]);

        let holders = &fundamentals.shareholding_pattern;
        assert_eq!(holders.rows.len(), 2);
        assert_eq!(holders.rows[0].metric, "Promoters");
        assert_eq!(holders.row("FIIs").unwrap().values[1], "12.70%");
    }

    #[test]
    fn test_not_found_page() {
        let html = r#"<html><h1 class="text-center">Page not found</h1></html>"#;
        let err = parse_company_page(html, "u", "NOPE.NS").unwrap_err();
        assert!(matches!(err, StockError::DataUnavailable { .. }));
    }

    #[test]
    fn test_unrecognised_layout() {
        let err = parse_company_page("<html><p>maintenance</p></html>", "u", "TCS.NS").unwrap_err();
        assert!(matches!(err, StockError::ParseError(_)));
    }

    #[test]
    fn test_missing_sections_are_empty() {
        let html = r#"<h1>Small Cap Ltd</h1>"#;
        let fundamentals = parse_company_page(html, "u", "SMALL.NS").unwrap();
        assert!(fundamentals.key_ratios.is_empty());
        assert!(fundamentals.quarterly_results.is_empty());
        assert!(fundamentals.shareholding_pattern.is_empty());
    }

    #[tokio::test]
    #[ignore = "requires network access"]
    async fn test_live_company_page() {
        let client = ScreenerClient::new(&StockConfig::default()).unwrap();
        let fundamentals = client.company("TCS.NS").await.unwrap();
        assert!(!fundamentals.key_ratios.is_empty());
    }
}
