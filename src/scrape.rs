use eyre::Result;
use futures::stream::{self, StreamExt};
use url::Url;

use crate::client::Fetch;
use crate::product::ProductRecord;
use crate::search::{ProductPreview, ProductSearch};

/// Scrapes full product records for every product matching `query`.
///
/// Runs discovery across all search pages, resolves each preview to
/// its product-page URL and scrapes those pages. Records arrive in
/// fetch-completion order. Individual fetch or parse failures abort
/// the run; pages without an embedded state blob are skipped.
pub async fn collect_products<C: Fetch>(query: &str, client: &C) -> Result<Vec<ProductRecord>> {
    let search = ProductSearch::discover(query, client).await?;
    let urls = search
        .previews
        .iter()
        .map(ProductPreview::product_url)
        .collect::<Result<Vec<_>>>()?;
    scrape_products(urls, client).await
}

/// Scrapes the given product-page URLs as one concurrent batch and
/// collects the records that yielded data.
pub async fn scrape_products<C: Fetch>(urls: Vec<Url>, client: &C) -> Result<Vec<ProductRecord>> {
    tracing::info!("scraping {} product urls", urls.len());
    let mut fetches = stream::iter(urls)
        .map(|url| client.fetch(url))
        .buffer_unordered(client.max_concurrency());
    let mut records = Vec::new();
    while let Some(body) = fetches.next().await {
        if let Some(record) = ProductRecord::parse(&body?)? {
            records.push(record);
        }
    }
    tracing::info!("collected {} product records", records.len());
    Ok(records)
}
