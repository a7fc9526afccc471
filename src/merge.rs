//! Partial updates against a prior snapshot.
//!
//! Beneficiaries and talents of the prior snapshot are all re-indexed so that
//! dedup carries across runs. Commissions and projects of aids the run does not
//! target are held aside verbatim and put back once the scrape is over.

use crate::cnc::{Commission, Project};
use crate::data::Snapshot;
use crate::store::EntityStore;
use std::collections::HashSet;
use tracing::info;

/// Records of untargeted aids, carried through a run untouched.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PreservedData {
    pub commissions: Vec<Commission>,
    pub projects: Vec<Project>,
}

/// Hydrates `store` from `snapshot` and returns what must survive the run.
pub fn partition_snapshot(
    store: &mut EntityStore,
    snapshot: Snapshot,
    target_aids: &[String],
) -> PreservedData {
    store
        .beneficiaries
        .extend(snapshot.beneficiaries.into_iter().map(|b| (b.id.clone(), b)));
    info!("Loaded {} existing beneficiaries", store.beneficiaries.len());

    store
        .talents
        .extend(snapshot.talents.into_iter().map(|t| (t.id.clone(), t)));
    info!("Loaded {} existing talents", store.talents.len());

    let commissions: Vec<Commission> = snapshot
        .commissions
        .into_iter()
        .filter(|c| !target_aids.contains(&c.aid_name))
        .collect();
    info!("Preserving {} commissions from other aids", commissions.len());

    let kept: HashSet<&str> = commissions.iter().map(|c| c.id.as_str()).collect();
    let projects: Vec<Project> = snapshot
        .projects
        .into_iter()
        .filter(|p| kept.contains(p.commission_id.as_str()))
        .collect();
    info!("Preserving {} projects from other aids", projects.len());

    PreservedData {
        commissions,
        projects,
    }
}

/// Puts the preserved records back after a scrape.
pub fn merge_with_preserved_data(store: &mut EntityStore, preserved: PreservedData) {
    info!("Merging with preserved data from other aids");

    store
        .commissions
        .extend(preserved.commissions.into_iter().map(|c| (c.id.clone(), c)));
    store
        .projects
        .extend(preserved.projects.into_iter().map(|p| (p.id.clone(), p)));

    info!("Total commissions after merge: {}", store.commissions.len());
    info!("Total projects after merge: {}", store.projects.len());
}
