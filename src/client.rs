use async_trait::async_trait;
use eyre::{bail, eyre, Result};
use reqwest::Client;
use serde_json::Value;
use url::Url;

const API_ENDPOINT: &str = "https://api.scrapfly.io/scrape";
const DEFAULT_CONCURRENCY: usize = 10;

/// Fetches page HTML on behalf of the scraper.
///
/// The implementation owns everything network-related: anti-bot bypass,
/// retries, timeouts and the concurrency cap honored by batched fetches.
/// Scraping operations take a `Fetch` value explicitly, scoped to one
/// collection run.
#[async_trait]
pub trait Fetch {
    /// Fetch the document at `url` and return its HTML body.
    async fn fetch(&self, url: Url) -> Result<String>;

    /// Upper bound on in-flight requests when pages are fetched as a batch.
    fn max_concurrency(&self) -> usize {
        DEFAULT_CONCURRENCY
    }
}

/// Fetch client backed by the Scrapfly scrape API.
///
/// Each fetch asks Scrapfly to retrieve the page with anti scrape
/// protection enabled and from the configured country, and returns the
/// rendered HTML from the API response.
pub struct ScrapflyClient {
    key: String,
    country: String,
    max_concurrency: usize,
    http: Client,
}

impl ScrapflyClient {
    /// Creates a client with the given API key, targeting the US with a
    /// concurrency cap of 10.
    pub fn new(key: impl Into<String>) -> Result<Self> {
        Ok(ScrapflyClient {
            key: key.into(),
            country: "US".into(),
            max_concurrency: DEFAULT_CONCURRENCY,
            http: Client::builder().build()?,
        })
    }

    /// Sets the country requests appear to originate from.
    pub fn with_country(mut self, country: impl Into<String>) -> Self {
        self.country = country.into();
        self
    }

    /// Sets the cap on concurrent in-flight requests.
    pub fn with_max_concurrency(mut self, limit: usize) -> Self {
        self.max_concurrency = limit;
        self
    }
}

#[async_trait]
impl Fetch for ScrapflyClient {
    async fn fetch(&self, url: Url) -> Result<String> {
        tracing::debug!("fetching {url}");
        let request = Url::parse_with_params(
            API_ENDPOINT,
            &[
                ("key", self.key.as_str()),
                ("url", url.as_str()),
                ("country", self.country.as_str()),
                ("asp", "true"),
            ],
        )?;
        let response = self.http.get(request).send().await?;
        let status = response.status();
        if !status.is_success() {
            bail!("fetch of {url} failed with status {status}");
        }
        let body: Value = response.json().await?;
        body.pointer("/result/content")
            .and_then(Value::as_str)
            .map(str::to_owned)
            .ok_or_else(|| eyre!("scrape response for {url} carried no content"))
    }

    fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }
}
