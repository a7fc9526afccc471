use crate::error::ScraperError;
use crate::utils::slugify;
use reqwest::Url;
use std::path::PathBuf;
use std::time::Duration;

pub const BASE_URL: &str = "https://www.cnc.fr";
pub const SEARCH_PATH: &str = "/professionnels/aides-et-financements/resultats-commissions";
/// Liferay portlet instance behind the search form.
pub const PORTLET: &str = "CncPortletRechercheResultatsCommissions_INSTANCE_xLSVbj1jyJkM";
pub const DEFAULT_AID: &str = "Fonds d'aide aux créateurs vidéo sur Internet (CNC Talent)";
pub const MAX_LISTING_PAGES: u32 = 100;

const SNAPSHOT_FILE: &str = "cnc-data.json";
const AIDS_FILE: &str = "available-aids.json";
const SOURCES_DIR: &str = "sources";

#[derive(Debug, Clone)]
pub struct Config {
    pub base_url: String,
    pub data_dir: PathBuf,
    /// Pause between two page fetches.
    pub page_delay: Duration,
    /// Pause between two aids.
    pub aid_delay: Duration,
    /// Caps both listing pages walked and commissions parsed per aid.
    pub limit: Option<u32>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: BASE_URL.to_string(),
            data_dir: PathBuf::from("data"),
            page_delay: Duration::from_millis(1000),
            aid_delay: Duration::from_millis(2000),
            limit: None,
        }
    }
}

impl Config {
    pub fn search_url(&self) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), SEARCH_PATH)
    }

    /// Search results page `page` (1-based) for `aid_name`.
    pub fn listing_url(&self, aid_name: &str, page: u32) -> Result<String, ScraperError> {
        let page = page.to_string();
        let params = [
            ("nomAide".to_string(), aid_name),
            (format!("_{}_cur", PORTLET), page.as_str()),
            ("p_p_id".to_string(), PORTLET),
            (format!("_{}_secteur", PORTLET), ""),
            (format!("_{}_annee", PORTLET), ""),
            (format!("_{}_nomAide", PORTLET), ""),
        ];
        Url::parse_with_params(&self.search_url(), params)
            .map(String::from)
            .map_err(|e| ScraperError::InvalidUrl(format!("{}: {}", self.search_url(), e)))
    }

    pub fn snapshot_path(&self) -> PathBuf {
        self.data_dir.join(SNAPSHOT_FILE)
    }

    pub fn sources_dir(&self) -> PathBuf {
        self.data_dir.join(SOURCES_DIR)
    }

    pub fn aid_snapshot_path(&self, aid_name: &str) -> PathBuf {
        self.sources_dir().join(format!("{}.json", slugify(aid_name)))
    }

    pub fn aids_path(&self) -> PathBuf {
        self.data_dir.join(AIDS_FILE)
    }
}
