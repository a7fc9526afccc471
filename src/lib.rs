use scraper::Html;
use tokio::time::Duration;
use tracing::{debug, error, info};

pub mod cnc;
pub mod config;
pub mod data;
pub mod ids;
pub mod merge;
pub mod store;

mod error;
mod html;
mod utils;

pub use config::Config;
pub use error::ScraperError;
pub use utils::{normalize_name, parse_french_date, slugify};

use cnc::{parse_aid_names, parse_commission_page, parse_listing_page};
use config::MAX_LISTING_PAGES;
use data::{AidSnapshot, Snapshot};
use store::EntityStore;

/// Source of raw HTML pages.
#[async_trait::async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String, ScraperError>;
}

#[derive(Debug, Clone, Default)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String, ScraperError> {
        let html = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        Ok(html)
    }
}

async fn pause(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}

/// Walks the search results of `aid_name` and returns the commission URLs in
/// listing order.
pub async fn fetch_commission_list<F: Fetcher>(
    fetcher: &F,
    config: &Config,
    aid_name: &str,
) -> Result<Vec<String>, ScraperError> {
    info!("Fetching commission list for: {}", aid_name);

    let last_page = config
        .limit
        .map_or(MAX_LISTING_PAGES, |limit| limit.min(MAX_LISTING_PAGES));
    let mut links: Vec<String> = vec![];
    let mut page = 1;

    while page <= last_page {
        let url = config.listing_url(aid_name, page)?;
        debug!("Visit {}", url);
        let html = fetcher.fetch(&url).await?;

        let listing = {
            let doc = Html::parse_document(&html);
            parse_listing_page(&doc, &config.base_url)
        };

        let before = links.len();
        for link in listing.links {
            if !links.contains(&link) {
                links.push(link);
            }
        }
        let found = links.len() - before;
        info!("Found {} commissions on page {}", found, page);

        if found == 0 || (!listing.has_next && page > 1) {
            break;
        }
        page += 1;
        if page > last_page {
            break;
        }
        pause(config.page_delay).await;
    }

    info!("Found {} total commission pages", links.len());
    Ok(links)
}

/// Aid names offered by the search form. A failed fetch yields no names.
pub async fn fetch_all_aid_names<F: Fetcher>(fetcher: &F, config: &Config) -> Vec<String> {
    info!("Fetching list of all available aids");

    match fetcher.fetch(&config.search_url()).await {
        Ok(html) => {
            let aids = {
                let doc = Html::parse_document(&html);
                parse_aid_names(&doc)
            };
            info!("Found {} aid types", aids.len());
            aids
        }
        Err(e) => {
            error!("Error fetching aid names: {:?}", e);
            vec![]
        }
    }
}

/// Scrapes `target_aids`, merges the result with the prior snapshot and writes
/// every output file. Commission pages that fail to download are skipped.
pub async fn run_scraper<F: Fetcher>(
    fetcher: &F,
    config: &Config,
    target_aids: &[String],
) -> Result<Snapshot, ScraperError> {
    let mut store = EntityStore::new();

    let preserved = match Snapshot::load(&config.snapshot_path())? {
        Some(snapshot) => {
            info!("Loading existing data for partial update");
            Some(merge::partition_snapshot(&mut store, snapshot, target_aids))
        }
        None => {
            info!("No existing data found, starting fresh");
            None
        }
    };
    let is_partial_update = preserved.is_some();

    for (aid_index, aid_name) in target_aids.iter().enumerate() {
        info!(
            "[{}/{}] Processing: {}",
            aid_index + 1,
            target_aids.len(),
            aid_name
        );

        let mut urls = fetch_commission_list(fetcher, config, aid_name).await?;
        let found = urls.len();
        if let Some(limit) = config.limit {
            urls.truncate(limit as usize);
        }
        info!("Processing {} of {} commission(s)", urls.len(), found);

        for (i, url) in urls.iter().enumerate() {
            debug!("[{}/{}] Visit {}", i + 1, urls.len(), url);
            match fetcher.fetch(url).await {
                Ok(html) => {
                    let doc = Html::parse_document(&html);
                    parse_commission_page(&mut store, url, aid_name, &doc);
                }
                Err(e) => error!("Error fetching {}: {:?}", url, e),
            }

            if i + 1 < urls.len() {
                pause(config.page_delay).await;
            }
        }

        if aid_index + 1 < target_aids.len() {
            pause(config.aid_delay).await;
        }
    }

    if let Some(preserved) = preserved {
        merge::merge_with_preserved_data(&mut store, preserved);
    }

    info!("Cleaning up orphaned entities");
    store.cleanup_orphaned_entities();

    for aid_name in target_aids {
        AidSnapshot::from_store(&store, aid_name).save(&config.aid_snapshot_path(aid_name))?;
    }

    let snapshot = Snapshot::from_store(&store, target_aids, is_partial_update);
    snapshot.save(&config.snapshot_path())?;
    Ok(snapshot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;
    use std::fs;
    use std::path::Path;

    const TALENT: &str = "CNC Talent";
    const OTHER: &str = "Aide B";
    const NEW_PAGE: &str = "https://www.cnc.fr/professionnels/aides-et-financements/resultats-de-la-commission-du-3-juillet-2025";
    const OLD_PAGE: &str = "https://www.cnc.fr/professionnels/aides-et-financements/resultats-de-la-commission-du-21-fevrier-2019";

    #[derive(Default)]
    struct MemoryFetcher {
        pages: HashMap<String, String>,
    }

    impl MemoryFetcher {
        fn with(mut self, url: String, html: String) -> Self {
            self.pages.insert(url, html);
            self
        }

        fn with_listing(self, config: &Config, aid: &str, pages: &[(Vec<&str>, bool)]) -> Self {
            pages
                .iter()
                .enumerate()
                .fold(self, |fetcher, (i, (links, has_next))| {
                    let url = config.listing_url(aid, i as u32 + 1).expect("Valid url");
                    fetcher.with(url, listing_html(links, *has_next))
                })
        }
    }

    #[async_trait::async_trait]
    impl Fetcher for MemoryFetcher {
        async fn fetch(&self, url: &str) -> Result<String, ScraperError> {
            self.pages
                .get(url)
                .cloned()
                .ok_or_else(|| ScraperError::InvalidUrl(url.to_string()))
        }
    }

    fn listing_html(links: &[&str], has_next: bool) -> String {
        let rows: String = links
            .iter()
            .map(|href| format!("<tr><td><a href=\"{}\">Résultats</a></td></tr>", href))
            .collect();
        let next = if has_next {
            "<a class=\"next\" href=\"#\">Suivant</a>"
        } else {
            ""
        };
        format!(
            "<html><body><table class=\"table-striped\"><tbody>{}</tbody></table>{}</body></html>",
            rows, next
        )
    }

    fn fixture(file: &str) -> String {
        fs::read_to_string(format!("tests/htmls/{}", file)).expect("Invalid file path")
    }

    fn test_config(data_dir: &Path) -> Config {
        Config {
            data_dir: data_dir.to_path_buf(),
            page_delay: Duration::ZERO,
            aid_delay: Duration::ZERO,
            ..Config::default()
        }
    }

    #[tokio::test]
    async fn test_listing_walk_stops_on_a_page_without_new_links() {
        let config = test_config(Path::new("unused"));
        let fetcher = MemoryFetcher::default().with_listing(
            &config,
            TALENT,
            &[
                (vec![NEW_PAGE], true),
                (vec!["/professionnels/aides-et-financements/resultats-de-la-commission-x"], true),
                (vec![NEW_PAGE], true),
            ],
        );

        let links = fetch_commission_list(&fetcher, &config, TALENT)
            .await
            .expect("Listing");
        assert_eq!(
            links,
            vec![
                NEW_PAGE.to_string(),
                "https://www.cnc.fr/professionnels/aides-et-financements/resultats-de-la-commission-x"
                    .to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_listing_walk_checks_a_second_page_without_next_marker() {
        let config = test_config(Path::new("unused"));
        let fetcher = MemoryFetcher::default().with_listing(
            &config,
            TALENT,
            &[(vec![NEW_PAGE], false), (vec![OLD_PAGE], false)],
        );

        let links = fetch_commission_list(&fetcher, &config, TALENT)
            .await
            .expect("Listing");
        assert_eq!(links, vec![NEW_PAGE.to_string(), OLD_PAGE.to_string()]);
    }

    #[tokio::test]
    async fn test_listing_walk_respects_limit() {
        let config = Config {
            limit: Some(1),
            ..test_config(Path::new("unused"))
        };
        let fetcher =
            MemoryFetcher::default().with_listing(&config, TALENT, &[(vec![NEW_PAGE, OLD_PAGE], true)]);

        let links = fetch_commission_list(&fetcher, &config, TALENT)
            .await
            .expect("Listing");
        assert_eq!(links.len(), 2);
    }

    #[tokio::test]
    async fn test_fetch_all_aid_names() {
        let config = test_config(Path::new("unused"));
        let fetcher = MemoryFetcher::default().with(config.search_url(), fixture("search.html"));

        assert_eq!(
            fetch_all_aid_names(&fetcher, &config).await,
            vec![
                "Aide à la distribution (ACM)",
                "Fonds d'aide aux créateurs vidéo sur Internet (CNC Talent)",
            ]
        );
        assert!(fetch_all_aid_names(&MemoryFetcher::default(), &config)
            .await
            .is_empty());
    }

    #[tokio::test]
    async fn test_run_scraper_from_scratch() {
        let dir = tempfile::tempdir().expect("Temp dir");
        let config = test_config(dir.path());
        let missing = "https://www.cnc.fr/professionnels/aides-et-financements/resultats-de-la-commission-disparue";
        let fetcher = MemoryFetcher::default()
            .with_listing(&config, TALENT, &[(vec![NEW_PAGE, missing, OLD_PAGE], true), (vec![], false)])
            .with(NEW_PAGE.to_string(), fixture("commission_new.html"))
            .with(OLD_PAGE.to_string(), fixture("commission_old.html"));

        let snapshot = run_scraper(&fetcher, &config, &[TALENT.to_string()])
            .await
            .expect("Scraped");

        assert_eq!(
            snapshot
                .commissions
                .iter()
                .map(|c| c.id.as_str())
                .collect::<Vec<_>>(),
            vec!["com_cnc-talent_2019-02-21", "com_cnc-talent_2025-07-03"]
        );
        assert!(!snapshot.metadata.is_partial_update);
        assert_eq!(snapshot.metadata.scraped_aids, vec![TALENT]);
        assert_eq!(snapshot.metadata.all_aids, vec![TALENT]);
        assert_eq!(snapshot.metadata.total_projects, snapshot.projects.len());

        let saved = Snapshot::load(&config.snapshot_path())
            .expect("Readable")
            .expect("Present");
        assert_eq!(saved, snapshot);

        let source: serde_json::Value = serde_json::from_str(
            &fs::read_to_string(config.aid_snapshot_path(TALENT)).expect("Readable"),
        )
        .expect("Json");
        assert_eq!(source["aidName"], TALENT);
        assert_eq!(source["stats"]["totalCommissions"], 2);
    }

    #[tokio::test]
    async fn test_run_scraper_partial_update() {
        let dir = tempfile::tempdir().expect("Temp dir");
        let config = test_config(dir.path());
        let both = [TALENT.to_string(), OTHER.to_string()];

        let first = MemoryFetcher::default()
            .with_listing(&config, TALENT, &[(vec![NEW_PAGE], false), (vec![], false)])
            .with_listing(&config, OTHER, &[(vec![OLD_PAGE], false), (vec![], false)])
            .with(NEW_PAGE.to_string(), fixture("commission_new.html"))
            .with(OLD_PAGE.to_string(), fixture("commission_old.html"));
        let before = run_scraper(&first, &config, &both).await.expect("Scraped");

        assert_eq!(before.metadata.all_aids, vec![OTHER, TALENT]);
        assert!(before
            .beneficiaries
            .iter()
            .any(|b| b.id == "ben_david-mirailles"));

        // Aide B no longer lists any commission.
        let second = MemoryFetcher::default().with_listing(&config, OTHER, &[(vec![], false)]);
        let after = run_scraper(&second, &config, &[OTHER.to_string()])
            .await
            .expect("Scraped");

        let talent_commission = before
            .commissions
            .iter()
            .find(|c| c.aid_name == TALENT)
            .expect("Talent commission");
        assert_eq!(after.commissions, vec![talent_commission.clone()]);
        assert_eq!(
            after.projects,
            before
                .projects
                .iter()
                .filter(|p| p.commission_id == talent_commission.id)
                .cloned()
                .collect::<Vec<_>>()
        );
        assert!(after.beneficiaries.iter().any(|b| b.id == "ben_dada-media"));
        assert!(!after
            .beneficiaries
            .iter()
            .any(|b| b.id == "ben_david-mirailles"));
        assert!(after.metadata.is_partial_update);
        assert_eq!(after.metadata.scraped_aids, vec![OTHER]);
        assert_eq!(after.metadata.all_aids, vec![TALENT]);
    }
}
