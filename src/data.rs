use crate::cnc::{Beneficiary, Commission, Person, Project, Talent};
use crate::error::ScraperError;
use crate::store::EntityStore;
use crate::utils;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::{fmt, fs, path::Path};
use tracing::{debug, info};

const DATA_STRUCTURE: &str = "normalized";
const VERSION: &str = "2.0";

/// The combined dataset read by the viewer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    #[serde(default)]
    pub commissions: Vec<Commission>,
    #[serde(default)]
    pub projects: Vec<Project>,
    #[serde(default)]
    pub beneficiaries: Vec<Beneficiary>,
    #[serde(default)]
    pub talents: Vec<Talent>,
    #[serde(default)]
    pub people: Vec<Person>,
    #[serde(default)]
    pub metadata: Metadata,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    pub scraped_at: String,
    pub total_commissions: usize,
    pub total_projects: usize,
    pub total_beneficiaries: usize,
    pub total_talents: usize,
    pub data_structure: String,
    pub version: String,
    /// Aids scraped by the run that wrote the snapshot.
    pub scraped_aids: Vec<String>,
    /// Every aid present in the snapshot.
    pub all_aids: Vec<String>,
    pub is_partial_update: bool,
}

impl fmt::Display for Metadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Scraped at      : {}", self.scraped_at)?;
        writeln!(f, "Scraped aids    : {}", self.scraped_aids.join(", "))?;
        writeln!(f, "Aids in data    : {}", self.all_aids.len())?;
        writeln!(f, "Partial update  : {}", self.is_partial_update)?;
        writeln!(f, "Commissions     : {}", self.total_commissions)?;
        writeln!(f, "Projects        : {}", self.total_projects)?;
        writeln!(f, "Beneficiaries   : {}", self.total_beneficiaries)?;
        writeln!(f, "Talents         : {}", self.total_talents)?;
        Ok(())
    }
}

impl Snapshot {
    pub fn from_store(store: &EntityStore, scraped_aids: &[String], is_partial_update: bool) -> Self {
        let all_aids = store
            .commissions
            .values()
            .map(|c| c.aid_name.clone())
            .sorted()
            .dedup()
            .collect();

        Snapshot {
            commissions: store.commissions.values().cloned().collect(),
            projects: store.projects.values().cloned().collect(),
            beneficiaries: store.beneficiaries.values().cloned().collect(),
            talents: store.talents.values().cloned().collect(),
            people: store.people.values().cloned().collect(),
            metadata: Metadata {
                scraped_at: utils::get_now(),
                total_commissions: store.commissions.len(),
                total_projects: store.projects.len(),
                total_beneficiaries: store.beneficiaries.len(),
                total_talents: store.talents.len(),
                data_structure: DATA_STRUCTURE.to_string(),
                version: VERSION.to_string(),
                scraped_aids: scraped_aids.to_vec(),
                all_aids,
                is_partial_update,
            },
        }
    }

    /// Reads the snapshot at `path`. A missing file is not an error.
    pub fn load(path: &Path) -> Result<Option<Snapshot>, ScraperError> {
        if !path.exists() {
            debug!("No snapshot at {}", path.display());
            return Ok(None);
        }
        let raw = fs::read_to_string(path)?;
        let snapshot = serde_json::from_str(&raw).map_err(|source| ScraperError::MalformedSnapshot {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Some(snapshot))
    }

    pub fn save(&self, path: &Path) -> Result<(), ScraperError> {
        write_json(path, self)?;
        info!("Data saved to: {}", path.display());
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AidStats {
    pub total_commissions: usize,
    pub total_projects: usize,
    pub total_beneficiaries: usize,
    pub total_talents: usize,
}

/// Everything scraped for a single aid. Written for reference, never read back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AidSnapshot {
    pub aid_name: String,
    pub scraped_at: String,
    pub commissions: Vec<Commission>,
    pub projects: Vec<Project>,
    pub beneficiaries: Vec<Beneficiary>,
    pub talents: Vec<Talent>,
    pub stats: AidStats,
}

impl AidSnapshot {
    pub fn from_store(store: &EntityStore, aid_name: &str) -> Self {
        let subset = store.aid_subset(aid_name);
        AidSnapshot {
            aid_name: aid_name.to_string(),
            scraped_at: utils::get_now(),
            stats: AidStats {
                total_commissions: subset.commissions.len(),
                total_projects: subset.projects.len(),
                total_beneficiaries: subset.beneficiaries.len(),
                total_talents: subset.talents.len(),
            },
            commissions: subset.commissions.into_values().collect(),
            projects: subset.projects.into_values().collect(),
            beneficiaries: subset.beneficiaries.into_values().collect(),
            talents: subset.talents.into_values().collect(),
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), ScraperError> {
        write_json(path, self)?;
        info!(
            "Saved: {} ({} commissions, {} projects)",
            path.display(),
            self.stats.total_commissions,
            self.stats.total_projects
        );
        Ok(())
    }
}

/// Output of the aid discovery binary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AidList {
    pub fetched_at: String,
    pub total_aids: usize,
    pub aids: Vec<String>,
}

impl AidList {
    pub fn new(aids: Vec<String>) -> Self {
        AidList {
            fetched_at: utils::get_now(),
            total_aids: aids.len(),
            aids,
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), ScraperError> {
        write_json(path, self)
    }
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), ScraperError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, serde_json::to_string_pretty(value)?)?;
    Ok(())
}
