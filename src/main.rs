use clap::Parser;
use cnc_commission_scraper::config::DEFAULT_AID;
use cnc_commission_scraper::{fetch_all_aid_names, run_scraper, Config, Fetcher, HttpFetcher};
use std::path::PathBuf;
use tokio::time::Duration;
use tracing::{info, warn};
use tracing_error::ErrorLayer;
use tracing_subscriber::prelude::*;

/// Scrapes CNC grant commission results into the viewer's JSON dataset.
#[derive(Parser, Debug)]
#[command(version)]
struct Args {
    /// Scrape a single aid.
    #[arg(long, value_name = "NAME", conflicts_with_all = ["aids", "all"])]
    aid: Option<String>,

    /// Scrape several aids, comma separated.
    #[arg(long, value_name = "A,B,...", value_delimiter = ',', conflicts_with = "all")]
    aids: Vec<String>,

    /// Scrape every aid offered by the search form.
    #[arg(long)]
    all: bool,

    /// Cap listing pages and commissions per aid.
    #[arg(long, value_name = "N", value_parser = clap::value_parser!(u32).range(1..))]
    limit: Option<u32>,

    #[arg(long, value_name = "PATH", default_value = "data")]
    data_dir: PathBuf,

    /// Pause between page requests. Aids are spaced by twice this.
    #[arg(long, value_name = "MS", default_value_t = 1000)]
    delay_ms: u64,
}

impl Args {
    fn config(&self) -> Config {
        let delay = Duration::from_millis(self.delay_ms);
        Config {
            data_dir: self.data_dir.clone(),
            page_delay: delay,
            aid_delay: delay * 2,
            limit: self.limit,
            ..Config::default()
        }
    }

    async fn target_aids<F: Fetcher>(&self, fetcher: &F, config: &Config) -> Vec<String> {
        if self.all {
            let aids = fetch_all_aid_names(fetcher, config).await;
            if aids.is_empty() {
                warn!("Could not fetch aid names. Using default.");
                return vec![DEFAULT_AID.to_string()];
            }
            return aids;
        }
        if let Some(aid) = &self.aid {
            return vec![aid.trim().to_string()];
        }
        let aids: Vec<String> = self
            .aids
            .iter()
            .map(|a| a.trim().to_string())
            .filter(|a| !a.is_empty())
            .collect();
        if aids.is_empty() {
            vec![DEFAULT_AID.to_string()]
        } else {
            aids
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_env("LOG_LEVEL").unwrap_or_else(|_| {
                "info,html5ever=error,selectors=error,hyper=warn,reqwest=info".into()
            }),
        )
        .with(ErrorLayer::default())
        .init();

    let args = Args::parse();
    let config = args.config();
    let fetcher = HttpFetcher::new();

    if let Some(limit) = config.limit {
        warn!("Test mode: limiting to {} commission(s) per aid", limit);
    }

    let target_aids = args.target_aids(&fetcher, &config).await;
    info!("Scraping {} aid type(s)", target_aids.len());
    for (i, aid) in target_aids.iter().enumerate() {
        info!("  {}. {}", i + 1, aid);
    }

    let snapshot = run_scraper(&fetcher, &config, &target_aids).await?;
    info!("Scraping completed\n{}", snapshot.metadata);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use cnc_commission_scraper::ScraperError;
    use pretty_assertions::assert_eq;

    struct Offline;

    #[async_trait::async_trait]
    impl Fetcher for Offline {
        async fn fetch(&self, url: &str) -> Result<String, ScraperError> {
            Err(ScraperError::InvalidUrl(url.to_string()))
        }
    }

    async fn targets(argv: &[&str]) -> Vec<String> {
        let args = Args::try_parse_from(argv.iter().copied()).expect("Valid arguments");
        args.target_aids(&Offline, &args.config()).await
    }

    #[tokio::test]
    async fn test_target_aids() {
        assert_eq!(targets(&["scraper"]).await, vec![DEFAULT_AID]);
        assert_eq!(targets(&["scraper", "--aid", "Aide B"]).await, vec!["Aide B"]);
        assert_eq!(
            targets(&["scraper", "--aids", "Aide A, Aide B"]).await,
            vec!["Aide A", "Aide B"]
        );
        assert_eq!(targets(&["scraper", "--all"]).await, vec![DEFAULT_AID]);
    }

    #[test]
    fn test_args() {
        let args = Args::try_parse_from(["scraper", "--limit", "2", "--delay-ms", "10"])
            .expect("Valid arguments");
        let config = args.config();
        assert_eq!(config.limit, Some(2));
        assert_eq!(config.aid_delay, Duration::from_millis(20));
        assert_eq!(config.data_dir, PathBuf::from("data"));

        assert!(Args::try_parse_from(["scraper", "--limit", "0"]).is_err());
        assert!(Args::try_parse_from(["scraper", "--aid", "A", "--all"]).is_err());
    }
}
