use eyre::{eyre, Result};
use futures::stream::{self, StreamExt};
use scraper::Html;
use serde_json::Value;
use url::Url;

use crate::client::Fetch;
use crate::search::SearchSort;
use crate::BASE_URL;

/// Results per page the site returns for search queries.
const PAGE_SIZE: u64 = 40;
/// The site stops serving search results past this page.
const MAX_PAGES: u64 = 25;

/// Builds the URL for a single search results page.
///
/// Accepts any query string; the term is percent-encoded into the `q`
/// parameter. The `Result` is only there for `?`-style call sites and
/// never errors.
pub fn search_url(query: &str, page: u64, sort: SearchSort) -> Result<Url> {
    let url = Url::parse_with_params(
        "https://www.walmart.com/search",
        &[
            ("q", query),
            ("sort", sort.as_param()),
            ("page", &page.to_string()),
            ("affinityOverride", "default"),
        ],
    )?;
    Ok(url)
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
/// Partial product record as it appears in search results.
///
/// Only the fields the scraper acts on are typed; everything else the
/// listing carries is passed through untouched in `fields`.
pub struct ProductPreview {
    /// Listing entry discriminator. Search listings mix products with
    /// ads and placeholders; only `"Product"` entries survive parsing.
    #[serde(rename = "__typename")]
    pub typename: String,
    /// Site-relative path identifying the product's detail page.
    #[serde(rename = "canonicalUrl")]
    pub canonical_url: String,
    /// Remaining preview fields, opaque to the scraper.
    #[serde(flatten)]
    pub fields: serde_json::Map<String, Value>,
}

impl ProductPreview {
    /// Resolves the preview's canonical path into an absolute
    /// product-page URL.
    pub fn product_url(&self) -> Result<Url> {
        Ok(Url::parse(BASE_URL)?.join(&self.canonical_url)?)
    }
}

#[derive(Debug)]
/// One parsed page of search results.
pub struct SearchPage {
    /// Product previews in site ranking order.
    pub previews: Vec<ProductPreview>,
    /// Total matching products site-wide, as reported by the first
    /// item stack. Sponsored stacks are not counted.
    pub total_count: u64,
}

impl SearchPage {
    /// Extracts product previews and the total result count from a
    /// search page's HTML.
    ///
    /// A page without the embedded state blob parses as an empty page
    /// with a zero count. A page with the blob but without the
    /// expected result structure is an error.
    pub fn parse(html: &str) -> Result<Self> {
        let document = Html::parse_document(html);
        let Some(state) = crate::page_state(&document)? else {
            return Ok(SearchPage {
                previews: Vec::new(),
                total_count: 0,
            });
        };
        let stack = state
            .pointer("/props/pageProps/initialData/searchResult/itemStacks/0")
            .ok_or_else(|| eyre!("search page state is missing its item stack"))?;
        let total_count = stack
            .get("count")
            .and_then(Value::as_u64)
            .ok_or_else(|| eyre!("item stack carries no result count"))?;
        let items = stack
            .get("items")
            .and_then(Value::as_array)
            .ok_or_else(|| eyre!("item stack carries no item list"))?;
        let previews = items
            .iter()
            .filter(|item| item.get("__typename").and_then(Value::as_str) == Some("Product"))
            .map(|item| serde_json::from_value(item.clone()))
            .collect::<Result<Vec<_>, _>>()?;
        tracing::debug!("parsed {} search product previews", previews.len());
        Ok(SearchPage {
            previews,
            total_count,
        })
    }
}

#[derive(Debug)]
/// Accumulated search results for a query, across all result pages.
///
/// Use the `ProductSearch::discover` method to run a search.
pub struct ProductSearch {
    /// Original query used to search.
    pub query: String,
    /// Total matching products reported by the site.
    pub total_count: u64,
    /// Collected previews. Page 1 leads; previews from the remaining
    /// pages follow in fetch-completion order, not page order.
    pub previews: Vec<ProductPreview>,
}

impl ProductSearch {
    /// Searches Walmart for products matching `query`.
    ///
    /// Page 1 is fetched first to learn the total result count, the
    /// remaining pages (at most 25 in total) are then fetched as one
    /// concurrent batch through `client`.
    pub async fn discover<C: Fetch>(query: impl Into<String>, client: &C) -> Result<Self> {
        let query = query.into();
        tracing::info!("searching walmart for {query}");
        let first_page = client.fetch(search_url(&query, 1, SearchSort::default())?).await?;
        let SearchPage {
            mut previews,
            total_count,
        } = SearchPage::parse(&first_page)?;

        let max_page = total_count.div_ceil(PAGE_SIZE).min(MAX_PAGES);
        tracing::info!("found {max_page} pages of results ({total_count} products)");
        let other_page_urls = (2..=max_page)
            .map(|page| search_url(&query, page, SearchSort::default()))
            .collect::<Result<Vec<_>>>()?;

        let mut pages = stream::iter(other_page_urls)
            .map(|url| client.fetch(url))
            .buffer_unordered(client.max_concurrency());
        while let Some(body) = pages.next().await {
            previews.extend(SearchPage::parse(&body?)?.previews);
        }

        tracing::info!("collected {} product previews for {query}", previews.len());
        Ok(ProductSearch {
            query,
            total_count,
            previews,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn search_html(count: u64, items: Value) -> String {
        let state = json!({
            "props": {
                "pageProps": {
                    "initialData": {
                        "searchResult": {
                            "itemStacks": [{ "count": count, "items": items }]
                        }
                    }
                }
            }
        });
        format!(
            r#"<html><head><script id="__NEXT_DATA__" type="application/json">{state}</script></head><body></body></html>"#
        )
    }

    #[test]
    fn search_url_encodes_query_and_fixed_params() {
        let url = search_url("wireless mouse & pad", 1, SearchSort::PriceAsc).unwrap();
        let query = url.query().unwrap();
        assert!(query.contains("page=1"));
        assert!(query.contains("sort=price_low"));
        assert!(query.contains("affinityOverride=default"));
        // raw term must not appear unencoded in the query string
        assert!(!query.contains("wireless mouse"));
        let q = url
            .query_pairs()
            .find(|(k, _)| k == "q")
            .map(|(_, v)| v.into_owned())
            .unwrap();
        assert_eq!(q, "wireless mouse & pad");
    }

    #[test]
    fn search_url_varies_page_and_sort() {
        let url = search_url("tv", 7, SearchSort::HighestRating).unwrap();
        let query = url.query().unwrap();
        assert!(query.contains("page=7"));
        assert!(query.contains("sort=rating_high"));
    }

    #[test]
    fn parse_without_state_blob_is_empty() {
        let page = SearchPage::parse("<html><body><p>captcha</p></body></html>").unwrap();
        assert!(page.previews.is_empty());
        assert_eq!(page.total_count, 0);
    }

    #[test]
    fn parse_keeps_only_products_in_order() {
        let html = search_html(
            312,
            json!([
                { "__typename": "Product", "canonicalUrl": "/ip/first/1", "name": "first" },
                { "__typename": "AdPlaceholder" },
                { "__typename": "Product", "canonicalUrl": "/ip/second/2", "name": "second" },
                { "__typename": "TileTakeOver" }
            ]),
        );
        let page = SearchPage::parse(&html).unwrap();
        assert_eq!(page.total_count, 312);
        let paths: Vec<_> = page.previews.iter().map(|p| p.canonical_url.as_str()).collect();
        assert_eq!(paths, ["/ip/first/1", "/ip/second/2"]);
    }

    #[test]
    fn parse_passes_extra_preview_fields_through() {
        let html = search_html(
            1,
            json!([{
                "__typename": "Product",
                "canonicalUrl": "/ip/thing/3",
                "name": "thing",
                "price": 12.99
            }]),
        );
        let page = SearchPage::parse(&html).unwrap();
        let preview = &page.previews[0];
        assert_eq!(preview.typename, "Product");
        assert_eq!(preview.fields["name"], json!("thing"));
        assert_eq!(preview.fields["price"], json!(12.99));
    }

    #[test]
    fn parse_with_blob_but_no_search_result_errors() {
        let state = json!({ "props": { "pageProps": { "initialData": {} } } });
        let html = format!(
            r#"<html><script id="__NEXT_DATA__" type="application/json">{state}</script></html>"#
        );
        assert!(SearchPage::parse(&html).is_err());
    }

    #[test]
    fn preview_resolves_absolute_product_url() {
        let preview = ProductPreview {
            typename: "Product".into(),
            canonical_url: "/ip/some-widget/12345".into(),
            fields: serde_json::Map::new(),
        };
        let url = preview.product_url().unwrap();
        assert_eq!(url.as_str(), "https://www.walmart.com/ip/some-widget/12345");
    }
}
