use cnc_commission_scraper::data::AidList;
use cnc_commission_scraper::{fetch_all_aid_names, Config, HttpFetcher};
use tracing::info;
use tracing_error::ErrorLayer;
use tracing_subscriber::prelude::*;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_env("LOG_LEVEL")
                .unwrap_or_else(|_| "info,html5ever=error,selectors=error,hyper=warn".into()),
        )
        .with(ErrorLayer::default())
        .init();

    let config = Config::default();
    let aids = fetch_all_aid_names(&HttpFetcher::new(), &config).await;

    println!("Found {} aid types:\n", aids.len());
    for (i, aid) in aids.iter().enumerate() {
        println!("{:>3}. {}", i + 1, aid);
    }

    let path = config.aids_path();
    AidList::new(aids).save(&path)?;
    info!("Saved to {}", path.display());

    Ok(())
}
