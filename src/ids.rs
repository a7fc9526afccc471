//! Deterministic entity identifiers.
//!
//! Every ID is a pure function of slugified text, so scraping the same page
//! twice yields the same IDs. Commissions sharing an aid and a date collide.

use crate::utils::slugify;

const NO_DATE: &str = "no-date";
const PROJECT_SLUG_MAX: usize = 50;

/// `com_<aid-slug>_<date>`
pub fn commission_id(aid_name: &str, date: Option<&str>) -> String {
    format!("com_{}_{}", slugify(aid_name), date.unwrap_or(NO_DATE))
}

/// `pro_<aid-slug>_<project-slug (50 chars max)>_<date>`
pub fn project_id(aid_name: &str, project_name: &str, commission_date: Option<&str>) -> String {
    let project_slug: String = slugify(project_name).chars().take(PROJECT_SLUG_MAX).collect();
    format!(
        "pro_{}_{}_{}",
        slugify(aid_name),
        project_slug,
        commission_date.unwrap_or(NO_DATE)
    )
}

pub fn beneficiary_id(name: &str) -> String {
    format!("ben_{}", slugify(name))
}

pub fn talent_id(name: &str) -> String {
    format!("tal_{}", slugify(name))
}
