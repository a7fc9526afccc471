use crate::cnc::extractors::{
    extract_commission_date, extract_commission_members, extract_project_amount,
    extract_project_beneficiary, extract_project_name, extract_project_talent,
    is_commission_header,
};
use crate::cnc::{push_unique, Commission, Project};
use crate::html::{document_text, flatten_text, has_bold};
use crate::ids;
use crate::store::EntityStore;
use crate::utils::split_talent_names;
use lazy_regex::regex;
use lazy_static::lazy_static;
use scraper::{ElementRef, Html, Selector};
use tracing::{info, warn};

lazy_static! {
    static ref CONTENT_BLOCKS: Selector =
        Selector::parse(".col-12.col-lg-10 .clearfix").expect("Invalid selector");
}

/// Where a project block sits: its aid, its commission and the active heading.
#[derive(Debug, Clone, Copy)]
pub struct ProjectContext<'a> {
    pub aid_name: &'a str,
    pub commission_id: &'a str,
    pub commission_date: Option<&'a str>,
    pub category: Option<&'a str>,
}

/// Parses one commission page into the store and returns the stored commission.
///
/// Older pages put one project per paragraph; newer ones pack several into a
/// paragraph, separated by a blank line (`<br><br>`).
pub fn parse_commission_page(
    store: &mut EntityStore,
    url: &str,
    aid_name: &str,
    doc: &Html,
) -> Commission {
    info!("Parsing commission: {}", url);

    let date = extract_commission_date(doc, Some(url));
    let commission_id = ids::commission_id(aid_name, date.as_deref());

    let members = extract_commission_members(
        doc,
        |name| {
            let talent_id = store.get_or_create_talent(name)?;
            store.link_commission_to_talent(&commission_id, &talent_id);
            Some(talent_id)
        },
        Some(url),
    );

    let mut commission = Commission {
        id: commission_id.clone(),
        url: url.to_string(),
        date: date.clone(),
        aid_name: aid_name.to_string(),
        president_id: members.president_id,
        member_ids: members.member_ids,
        project_ids: vec![],
    };

    let mut category: Option<String> = None;
    for block in doc.select(&CONTENT_BLOCKS) {
        for el in block.children().filter_map(ElementRef::wrap) {
            match el.value().name() {
                "h3" => category = Some(flatten_text(el).trim().to_string()),
                "p" => {
                    let context = ProjectContext {
                        aid_name,
                        commission_id: &commission_id,
                        commission_date: date.as_deref(),
                        category: category.as_deref(),
                    };
                    for project_id in parse_paragraph(store, el, &context) {
                        push_unique(&mut commission.project_ids, &project_id);
                    }
                }
                _ => {}
            }
        }
    }

    if commission.project_ids.is_empty() {
        warn!("No projects found in commission (url: {})", url);
    }

    store
        .commissions
        .insert(commission_id, commission.clone());
    commission
}

fn parse_paragraph(
    store: &mut EntityStore,
    paragraph: ElementRef,
    context: &ProjectContext,
) -> Vec<String> {
    let markup = paragraph.inner_html();
    if !has_bold(&markup) || is_commission_header(flatten_text(paragraph).trim()) {
        return vec![];
    }

    let blocks: Vec<&str> = regex!(r"(?i)<br\s*/?>\s*<br\s*/?>").split(&markup).collect();
    let blocks: Vec<&str> = if blocks.len() == 1 {
        blocks
    } else {
        blocks.into_iter().filter(|b| has_bold(b)).collect()
    };

    let mut project_ids = vec![];
    for block in blocks {
        let Some(project_id) = parse_project(store, block, context) else {
            continue;
        };
        let beneficiary_id = store
            .projects
            .get(&project_id)
            .and_then(|p| p.beneficiary_id.clone());
        if let Some(beneficiary_id) = beneficiary_id {
            store.link_commission_to_beneficiary(context.commission_id, &beneficiary_id);
        }
        project_ids.push(project_id);
    }
    project_ids
}

/// Parses a single project block and stores it, returning its ID.
///
/// Blocks without a usable project name are skipped.
pub fn parse_project(
    store: &mut EntityStore,
    markup: &str,
    context: &ProjectContext,
) -> Option<String> {
    let fragment = Html::parse_fragment(markup);
    let text = document_text(&fragment);

    let commission_context = format!(
        "Commission {} - {}",
        context.commission_date.unwrap_or("unknown date"),
        context.aid_name
    );
    let name = extract_project_name(&fragment, Some(&commission_context))?;
    let project_context = format!("{} - Project: {}", commission_context, name);

    let beneficiary_name = extract_project_beneficiary(&text, Some(&project_context));
    let talent_names = extract_project_talent(&text)
        .map(|t| split_talent_names(&t))
        .unwrap_or_default();
    let amount = extract_project_amount(&text, Some(&project_context));

    let beneficiary_id = beneficiary_name.and_then(|n| store.get_or_create_beneficiary(&n));
    let mut talent_ids = vec![];
    for talent_id in talent_names
        .iter()
        .filter_map(|n| store.get_or_create_talent(n))
    {
        push_unique(&mut talent_ids, &talent_id);
    }

    let project_id = ids::project_id(context.aid_name, &name, context.commission_date);
    let project = Project {
        id: project_id.clone(),
        description: describe(&text, &name),
        name,
        beneficiary_id: beneficiary_id.clone(),
        talent_ids: talent_ids.clone(),
        amount,
        category: project_category(context.category, &text),
        commission_id: context.commission_id.to_string(),
    };
    store.projects.insert(project_id.clone(), project);

    if let Some(beneficiary_id) = beneficiary_id {
        store.link_project_to_beneficiary(&project_id, &beneficiary_id);
    }
    for talent_id in &talent_ids {
        store.link_project_to_talent(&project_id, talent_id);
    }

    Some(project_id)
}

/// Text after `<name> –` on the first line of the block.
fn describe(text: &str, name: &str) -> String {
    let first_line = text.trim_start().split('\n').next().unwrap_or_default();
    first_line
        .replacen(name, "", 1)
        .trim()
        .strip_prefix('–')
        .map(|d| d.trim().to_string())
        .unwrap_or_default()
}

fn project_category(category: Option<&str>, text: &str) -> String {
    let annotation = if text.contains("aide au pilote") {
        Some("Aide au pilote")
    } else if text.contains("bourse d'encouragement") || text.contains("bourse d\u{2019}encouragement")
    {
        Some("Bourse d'encouragement")
    } else {
        None
    };

    match (category.filter(|c| !c.is_empty()), annotation) {
        (Some(c), Some(a)) => format!("{} - {}", c, a),
        (Some(c), None) => c.to_string(),
        (None, Some(a)) => a.to_string(),
        (None, None) => String::new(),
    }
}
