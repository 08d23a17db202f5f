use eyre::{eyre, Result};
use scraper::Html;
use serde_json::{Map, Value};
use url::Url;

use crate::client::Fetch;

/// Product attributes kept from the raw page state. Everything else
/// the page carries (tracking data, fulfillment internals) is dropped.
const KEPT_ATTRIBUTES: [&str; 12] = [
    "availabilityStatus",
    "averageRating",
    "brand",
    "id",
    "imageInfo",
    "manufacturerName",
    "name",
    "orderLimit",
    "orderMinLimit",
    "priceInfo",
    "shortDescription",
    "type",
];

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
/// Product attributes and reviews extracted from a product page.
///
/// Use the `ProductRecord::fetch` method to scrape a single product
/// from its page URL.
pub struct ProductRecord {
    /// Allow-listed product attributes.
    pub product: Map<String, Value>,
    /// Review payload, passed through unfiltered.
    pub reviews: Value,
}

impl ProductRecord {
    /// Extracts a product record from a product page's HTML.
    ///
    /// A page without the embedded state blob yields `Ok(None)` and
    /// should be skipped by the caller. A page with the blob but
    /// without the expected product structure is an error.
    pub fn parse(html: &str) -> Result<Option<Self>> {
        let document = Html::parse_document(html);
        let Some(state) = crate::page_state(&document)? else {
            return Ok(None);
        };
        let data = state
            .pointer("/props/pageProps/initialData/data")
            .ok_or_else(|| eyre!("product page state is missing its data section"))?;
        let raw_product = data
            .get("product")
            .and_then(Value::as_object)
            .ok_or_else(|| eyre!("product page state carries no product object"))?;
        let product = raw_product
            .iter()
            .filter(|(key, _)| KEPT_ATTRIBUTES.contains(&key.as_str()))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        let reviews = data
            .get("reviews")
            .cloned()
            .ok_or_else(|| eyre!("product page state carries no reviews object"))?;
        Ok(Some(ProductRecord { product, reviews }))
    }

    /// Fetches a product page and extracts its record.
    pub async fn fetch<C: Fetch>(url: Url, client: &C) -> Result<Option<Self>> {
        let body = client.fetch(url).await?;
        Self::parse(&body)
    }
}
