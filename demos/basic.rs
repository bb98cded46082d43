use retry_fetch::{RequestSpec, RetryingFetcher};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let url = std::env::var("ADMISSIONS_STATUS_URL")?;
    let fetcher = RetryingFetcher::from_env()?;

    let mut request = RequestSpec::get(url).timeout_ms(5_000);
    if let Ok(token) = std::env::var("ADMISSIONS_TOKEN") {
        request = request.bearer_auth(token);
    }

    let response = fetcher.execute(&request).await?;
    println!("{}", response.status());
    println!("{}", response.text().await?);

    Ok(())
}
