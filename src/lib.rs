//! Scrape Walmart search results and product details.
//!
//! `ProductSearch` paginates a search query and collects product
//! previews, and `ProductRecord` extracts a product page's attributes
//! and reviews. Both read the server-rendered `__NEXT_DATA__` page
//! state instead of the visible markup, so they keep working across
//! layout changes.
//!
//! All fetching goes through the [`Fetch`] trait; the default
//! implementation is [`ScrapflyClient`], which delegates anti-bot
//! bypass, retries and concurrency limiting to the Scrapfly API.

mod client;
mod product;
mod scrape;
mod search;

use eyre::Result;
use scraper::{Html, Selector};
use serde_json::Value;

pub use client::{Fetch, ScrapflyClient};
pub use product::ProductRecord;
pub use scrape::{collect_products, scrape_products};
pub use search::{search_url, ProductPreview, ProductSearch, SearchPage, SearchSort};
pub use url::Url;

/// Base URL that relative product paths are resolved against.
pub const BASE_URL: &str = "https://www.walmart.com/";

/// Locates the embedded `__NEXT_DATA__` page state in a fetched document.
///
/// Returns `Ok(None)` when the script element is absent (blocked page,
/// empty shell). A present element whose text is not valid JSON is an
/// error, not a missing blob.
fn page_state(document: &Html) -> Result<Option<Value>> {
    let script_selector = &Selector::parse(r#"script[id="__NEXT_DATA__"]"#).unwrap();
    let Some(script) = document.select(script_selector).next() else {
        return Ok(None);
    };
    let text = script.text().collect::<String>();
    Ok(Some(serde_json::from_str(&text)?))
}
