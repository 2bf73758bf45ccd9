//! Price observation scraped from a public web page.
//!
//! The page is fetched once with a bounded timeout; the price is the
//! `index`-th element matching a CSS selector. When the page arrives but the
//! price cannot be found, the HTML is kept as a snapshot for inspection.

use std::path::PathBuf;

use reqwest::blocking::Client;
use scraper::{Html, Selector};
use tracing::{debug, info, warn};

use crate::data::{PriceSource, validate_price};
use crate::domain::{SourceConfig, is_valid_price};
use crate::error::AppError;

pub struct PageSource {
    client: Client,
    config: SourceConfig,
    selector: Selector,
    snapshot_dir: Option<PathBuf>,
}

impl PageSource {
    pub fn new(config: SourceConfig, snapshot_dir: Option<PathBuf>) -> Result<Self, AppError> {
        let selector = Selector::parse(&config.selector)
            .map_err(|e| {
                AppError::invalid_config(format!(
                    "Invalid CSS selector '{}': {e}",
                    config.selector
                ))
            })?;

        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| AppError::invalid_config(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            config,
            selector,
            snapshot_dir,
        })
    }

    fn fetch_page(&self) -> Result<String, AppError> {
        debug!(url = %self.config.url, "fetching price page");

        let resp = self.client.get(&self.config.url).send().map_err(|e| {
            if e.is_timeout() {
                AppError::observation(format!(
                    "Timed out after {}s waiting for '{}'.",
                    self.config.timeout.as_secs(),
                    self.config.url
                ))
            } else {
                AppError::observation(format!("Request to '{}' failed: {e}", self.config.url))
            }
        })?;

        if !resp.status().is_success() {
            return Err(AppError::observation(format!(
                "Request to '{}' failed with status {}.",
                self.config.url,
                resp.status()
            )));
        }

        resp.text()
            .map_err(|e| AppError::observation(format!("Failed to read page body: {e}")))
    }

    fn keep_snapshot(&self, body: &str) {
        let Some(dir) = &self.snapshot_dir else { return };
        match crate::debug::write_page_snapshot(dir, body) {
            Ok(path) => info!(path = %path.display(), "page snapshot saved"),
            Err(e) => warn!(error = %e, "failed to save page snapshot"),
        }
    }
}

impl PriceSource for PageSource {
    fn observe(&self) -> Result<f64, AppError> {
        let body = self.fetch_page()?;

        match extract_price(&body, &self.selector, self.config.index) {
            Ok(price) => {
                info!(price, "price observed");
                validate_price(price)
            }
            Err(reason) => {
                self.keep_snapshot(&body);
                Err(AppError::observation(reason))
            }
        }
    }
}

/// Find the `index`-th selector match in `html` and parse it as a price.
pub fn extract_price(html: &str, selector: &Selector, index: usize) -> Result<f64, String> {
    let document = Html::parse_document(html);
    let cells: Vec<String> = document
        .select(selector)
        .map(|el| el.text().collect::<String>())
        .collect();

    let text = cells.get(index).ok_or_else(|| {
        format!(
            "Price element not found: expected at least {} match(es), page had {}.",
            index + 1,
            cells.len()
        )
    })?;

    parse_price_text(text).ok_or_else(|| format!("Could not parse price from '{}'.", text.trim()))
}

/// Parse a displayed price such as `44,56 ₺`, `1.234,56` or `44.56`.
///
/// A comma marks the decimal separator when present; dots are then thousands
/// separators.
pub fn parse_price_text(text: &str) -> Option<f64> {
    let cleaned: String = text
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, ',' | '.' | '-'))
        .collect();

    let normalized = if cleaned.contains(',') {
        cleaned.replace('.', "").replace(',', ".")
    } else {
        cleaned
    };

    let value: f64 = normalized.parse().ok()?;
    is_valid_price(value).then_some(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
        <html><body><table><tr>
            <td class="text-bold p-12 text-center">45,12 ₺</td>
            <td class="text-bold p-12 text-center"> 46,78 ₺ </td>
            <td class="p-12">ignored</td>
        </tr></table></body></html>
    "#;

    fn selector() -> Selector {
        Selector::parse(crate::domain::DEFAULT_PRICE_SELECTOR).unwrap()
    }

    #[test]
    fn parse_price_text_handles_local_formats() {
        assert_eq!(parse_price_text("44,56 ₺"), Some(44.56));
        assert_eq!(parse_price_text("₺44.56"), Some(44.56));
        assert_eq!(parse_price_text("1.234,56"), Some(1234.56));
        assert_eq!(parse_price_text("  52 "), Some(52.0));
        assert_eq!(parse_price_text("n/a"), None);
        assert_eq!(parse_price_text("0,00"), None);
        assert_eq!(parse_price_text("-3,10"), None);
    }

    #[test]
    fn extract_price_picks_indexed_cell() {
        assert_eq!(extract_price(PAGE, &selector(), 0).unwrap(), 45.12);
        assert_eq!(extract_price(PAGE, &selector(), 1).unwrap(), 46.78);
    }

    #[test]
    fn extract_price_reports_missing_element() {
        let err = extract_price(PAGE, &selector(), 2).unwrap_err();
        assert!(err.contains("page had 2"), "{err}");
    }

    #[test]
    fn invalid_selector_is_a_config_error() {
        let config = SourceConfig {
            selector: "td[".to_string(),
            ..SourceConfig::default()
        };
        assert!(matches!(
            PageSource::new(config, None),
            Err(AppError::InvalidConfig(_))
        ));
    }

    #[test]
    fn unreachable_host_is_an_observation_failure() {
        let config = SourceConfig {
            url: "http://127.0.0.1:9/prices".to_string(),
            timeout: std::time::Duration::from_secs(2),
            ..SourceConfig::default()
        };
        let source = PageSource::new(config, None).unwrap();
        assert!(matches!(source.observe(), Err(AppError::ObservationFailed(_))));
    }
}
