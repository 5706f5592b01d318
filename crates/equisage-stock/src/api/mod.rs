//! Clients for the external data sources

pub mod google_news;
pub mod screener;
pub mod yahoo;

pub use google_news::{GoogleNewsClient, NewsQuery};
pub use screener::{ScreenerClient, parse_company_page};
pub use yahoo::{Quote, YahooFinanceClient};

use crate::config::StockConfig;
use crate::error::{Result, StockError};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use tracing::warn;

/// HTTP client shared by the scraping clients
pub(crate) fn http_client(config: &StockConfig) -> Result<Client> {
    Client::builder()
        .user_agent(config.user_agent.clone())
        .timeout(config.request_timeout)
        .build()
        .map_err(StockError::NetworkError)
}

/// Send a request, retrying transport failures and 5xx answers
///
/// `build` is called once per attempt. A 404 is returned as-is so callers
/// can tell "not found" apart from an outage.
pub(crate) async fn send_with_retry<F>(config: &StockConfig, build: F) -> Result<Response>
where
    F: Fn() -> RequestBuilder,
{
    let mut attempt = 0;
    loop {
        let outcome = build().send().await;
        let retryable = match &outcome {
            Ok(response) => response.status().is_server_error(),
            Err(err) => err.is_timeout() || err.is_connect(),
        };

        attempt += 1;
        if !retryable || attempt >= config.max_retries {
            let response = outcome?;
            let status = response.status();
            if status.is_success() || status == StatusCode::NOT_FOUND {
                return Ok(response);
            }
            return Err(StockError::ApiError(format!(
                "{} answered {status}",
                response.url()
            )));
        }

        let backoff = config.retry_backoff(attempt - 1);
        warn!(attempt, ?backoff, "Request failed, retrying");
        tokio::time::sleep(backoff).await;
    }
}
