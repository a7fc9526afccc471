pub mod extractors;
mod listing;
mod parser;

pub use listing::{parse_aid_names, parse_listing_page, ListingPage};
pub use parser::{parse_commission_page, parse_project, ProjectContext};

use serde::{Deserialize, Serialize};
use std::fmt;

/// One dated review-panel session of an aid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Commission {
    pub id: String,
    pub url: String,
    pub date: Option<String>,
    pub aid_name: String,
    pub president_id: Option<String>,
    #[serde(default)]
    pub member_ids: Vec<String>,
    #[serde(default)]
    pub project_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub beneficiary_id: Option<String>,
    #[serde(default)]
    pub talent_ids: Vec<String>,
    pub amount: Option<u64>,
    #[serde(default)]
    pub category: String,
    pub commission_id: String,
}

/// Shape shared by beneficiaries, talents and people.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NamedEntity {
    pub id: String,
    pub slug: String,
    pub name: String,
    #[serde(default)]
    pub project_ids: Vec<String>,
    #[serde(default)]
    pub commission_ids: Vec<String>,
}

pub type Beneficiary = NamedEntity;
pub type Talent = NamedEntity;
pub type Person = NamedEntity;

impl NamedEntity {
    pub fn new(id: String, slug: String, name: String) -> Self {
        Self {
            id,
            slug,
            name,
            project_ids: vec![],
            commission_ids: vec![],
        }
    }
}

/// Pushes `item` unless it is already present.
pub(crate) fn push_unique(list: &mut Vec<String>, item: &str) {
    if !list.iter().any(|i| i == item) {
        list.push(item.to_string());
    }
}

impl fmt::Display for Commission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Commission      : {}", self.id)?;
        writeln!(f, "Aid             : {}", self.aid_name)?;
        writeln!(
            f,
            "Date            : {}",
            self.date.as_deref().unwrap_or("None")
        )?;
        writeln!(
            f,
            "President       : {}",
            self.president_id.as_deref().unwrap_or("None")
        )?;
        writeln!(f, "Members         : {}", self.member_ids.join(", "))?;
        writeln!(f, "Projects        : {}", self.project_ids.len())?;
        Ok(())
    }
}
