use eyre::{Result, WrapErr};
use tracing_subscriber::EnvFilter;
use walmart_scraper::{collect_products, ScrapflyClient};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let key = std::env::var("SCRAPFLY_KEY").wrap_err("SCRAPFLY_KEY must be set")?;
    let client = ScrapflyClient::new(key)?.with_max_concurrency(10);
    let products = collect_products("spider", &client).await?;
    println!("{}", serde_json::to_string_pretty(&products)?);
    Ok(())
}
