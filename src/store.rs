use crate::cnc::{push_unique, Beneficiary, Commission, NamedEntity, Person, Project, Talent};
use crate::ids;
use crate::utils::{has_proper_case, normalize_name, slugify};
use std::collections::{BTreeMap, HashSet};
use tracing::debug;

/// In-memory graph of everything scraped during one run, keyed by ID.
///
/// Built empty or hydrated from a prior snapshot, threaded through the parse
/// loop, then handed over for serialization.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct EntityStore {
    pub commissions: BTreeMap<String, Commission>,
    pub projects: BTreeMap<String, Project>,
    pub beneficiaries: BTreeMap<String, Beneficiary>,
    pub talents: BTreeMap<String, Talent>,
    pub people: BTreeMap<String, Person>,
}

fn get_or_create(
    entities: &mut BTreeMap<String, NamedEntity>,
    name: &str,
    make_id: fn(&str) -> String,
) -> Option<String> {
    if name.trim().is_empty() {
        return None;
    }

    let normalized = normalize_name(name);
    let id = make_id(name);

    match entities.get_mut(&id) {
        Some(existing) => {
            if has_proper_case(&normalized) && !has_proper_case(&existing.name) {
                debug!("Rename {} from {:?} to {:?}", id, existing.name, normalized);
                existing.name = normalized;
            }
        }
        None => {
            let entity = NamedEntity::new(id.clone(), slugify(name), normalized);
            entities.insert(id.clone(), entity);
        }
    }
    Some(id)
}

impl EntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the ID for `name`, registering the beneficiary on first sight.
    /// Blank names yield `None`.
    pub fn get_or_create_beneficiary(&mut self, name: &str) -> Option<String> {
        get_or_create(&mut self.beneficiaries, name, ids::beneficiary_id)
    }

    pub fn get_or_create_talent(&mut self, name: &str) -> Option<String> {
        get_or_create(&mut self.talents, name, ids::talent_id)
    }

    pub fn link_project_to_beneficiary(&mut self, project_id: &str, beneficiary_id: &str) {
        if let Some(b) = self.beneficiaries.get_mut(beneficiary_id) {
            push_unique(&mut b.project_ids, project_id);
        }
    }

    pub fn link_project_to_talent(&mut self, project_id: &str, talent_id: &str) {
        if let Some(t) = self.talents.get_mut(talent_id) {
            push_unique(&mut t.project_ids, project_id);
        }
    }

    pub fn link_commission_to_talent(&mut self, commission_id: &str, talent_id: &str) {
        if let Some(t) = self.talents.get_mut(talent_id) {
            push_unique(&mut t.commission_ids, commission_id);
        }
    }

    pub fn link_commission_to_beneficiary(&mut self, commission_id: &str, beneficiary_id: &str) {
        if let Some(b) = self.beneficiaries.get_mut(beneficiary_id) {
            push_unique(&mut b.commission_ids, commission_id);
        }
    }

    /// Drops project references that no longer resolve, then removes
    /// beneficiaries left without projects and talents left without both
    /// projects and commission seats.
    pub fn cleanup_orphaned_entities(&mut self) {
        let existing: HashSet<&String> = self.projects.keys().collect();

        for b in self.beneficiaries.values_mut() {
            b.project_ids.retain(|id| existing.contains(id));
        }
        for t in self.talents.values_mut() {
            t.project_ids.retain(|id| existing.contains(id));
        }

        let before = (self.beneficiaries.len(), self.talents.len());
        self.beneficiaries.retain(|_, b| !b.project_ids.is_empty());
        self.talents
            .retain(|_, t| !t.project_ids.is_empty() || !t.commission_ids.is_empty());

        debug!(
            "Removed {} orphaned beneficiaries and {} orphaned talents",
            before.0 - self.beneficiaries.len(),
            before.1 - self.talents.len()
        );
    }

    /// Commissions of `aid_name` with the projects, beneficiaries and talents
    /// attached to them.
    pub fn aid_subset(&self, aid_name: &str) -> EntityStore {
        let commissions: BTreeMap<_, _> = self
            .commissions
            .iter()
            .filter(|(_, c)| c.aid_name == aid_name)
            .map(|(id, c)| (id.clone(), c.clone()))
            .collect();
        let projects: BTreeMap<_, _> = self
            .projects
            .iter()
            .filter(|(_, p)| commissions.contains_key(&p.commission_id))
            .map(|(id, p)| (id.clone(), p.clone()))
            .collect();
        let beneficiaries = self
            .beneficiaries
            .iter()
            .filter(|(_, b)| b.project_ids.iter().any(|id| projects.contains_key(id)))
            .map(|(id, b)| (id.clone(), b.clone()))
            .collect();
        let talents = self
            .talents
            .iter()
            .filter(|(_, t)| {
                t.project_ids.iter().any(|id| projects.contains_key(id))
                    || t.commission_ids.iter().any(|id| commissions.contains_key(id))
            })
            .map(|(id, t)| (id.clone(), t.clone()))
            .collect();

        EntityStore {
            commissions,
            projects,
            beneficiaries,
            talents,
            people: BTreeMap::new(),
        }
    }
}
