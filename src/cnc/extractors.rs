//! Field extractors for commission pages.
//!
//! The site's markup changed several times over the years, so each field is
//! recovered by an ordered list of independent strategies. The first strategy
//! producing a value wins; a strategy that finds nothing hands over to the next.

use crate::cnc::push_unique;
use crate::html::{document_text, first_text, flatten_text};
use crate::utils::{fold, normalize_name, parse_french_date};
use itertools::Itertools;
use lazy_regex::{regex, Regex};
use lazy_static::lazy_static;
use scraper::{Html, Selector};
use std::collections::HashSet;
use tracing::{debug, warn};

const E: &str = "Invalid selector";
lazy_static! {
    static ref P_INLINE: Selector = Selector::parse("p.inline").expect(E);
    static ref P: Selector = Selector::parse("p").expect(E);
    static ref TITLE: Selector = Selector::parse("h1, .page-title").expect(E);
    static ref CLEARFIX: Selector = Selector::parse(".clearfix").expect(E);
    static ref LIST_ITEM: Selector = Selector::parse("ul li").expect(E);
    static ref CONTENT: Selector = Selector::parse(".clearfix, .content, .main-content").expect(E);
    static ref STRONG: Selector = Selector::parse("strong").expect(E);
    static ref B: Selector = Selector::parse("b").expect(E);
    static ref BOLD_STYLE: Selector = Selector::parse(r#"[style*="font-weight: bold"]"#).expect(E);
}

const MEMBERS_MARKER: &str = "Membres présents";

const PRESIDENT_TITLES: [&str; 8] = [
    "president",
    "presidente",
    "président",
    "présidente",
    "president suppleant",
    "presidente suppleante",
    "président suppléant",
    "présidente suppléante",
];

const PROJECT_NAME_MAX: usize = 100;
const BARE_AMOUNT_MIN: u64 = 100;
const BARE_AMOUNT_MAX: u64 = 1_000_000;

/// A named heuristic over some input.
pub type Strategy<I, T> = (&'static str, fn(&I) -> Option<T>);

/// Runs `strategies` in order and returns the first value found.
pub fn first_success<I: ?Sized, T>(input: &I, strategies: &[Strategy<I, T>]) -> Option<T> {
    first_accepted(input, strategies, |_| true)
}

/// Like [`first_success`], but a value rejected by `accept` also hands over to
/// the next strategy.
pub fn first_accepted<I: ?Sized, T>(
    input: &I,
    strategies: &[Strategy<I, T>],
    accept: impl Fn(&T) -> bool,
) -> Option<T> {
    strategies.iter().find_map(|(name, strategy)| {
        let value = strategy(input).filter(|v| accept(v))?;
        debug!("Strategy {} matched", name);
        Some(value)
    })
}

fn with_url(url: Option<&str>) -> String {
    url.map(|u| format!(" (url: {})", u)).unwrap_or_default()
}

fn with_context(context: Option<&str>) -> String {
    context.map(|c| format!(" (context: {})", c)).unwrap_or_default()
}

fn date_pattern() -> &'static Regex {
    regex!(
        r"(?i)([0-9]{1,2})\s+(janvier|février|mars|avril|mai|juin|juillet|août|septembre|octobre|novembre|décembre)\s+([0-9]{4})"
    )
}

// ---- Commission date ----

fn date_from_inline(doc: &Html) -> Option<String> {
    first_text(doc, &P_INLINE)
        .filter(|t| !t.is_empty())
        .and_then(|t| parse_french_date(&t))
}

fn date_from_paragraphs(doc: &Html) -> Option<String> {
    doc.select(&P).find_map(|p| {
        let text = flatten_text(p);
        let found = date_pattern().find(text.trim())?;
        parse_french_date(found.as_str())
    })
}

fn date_from_title(doc: &Html) -> Option<String> {
    let title = first_text(doc, &TITLE)?;
    let found = date_pattern().find(&title)?;
    parse_french_date(found.as_str())
}

const DATE_STRATEGIES: &[Strategy<Html, String>] = &[
    ("inline date", date_from_inline),
    ("dated paragraph", date_from_paragraphs),
    ("dated title", date_from_title),
];

/// ISO date of the commission, or the raw date text when it does not convert.
pub fn extract_commission_date(doc: &Html, url: Option<&str>) -> Option<String> {
    let date = first_success(doc, DATE_STRATEGIES);
    if date.is_none() {
        warn!("Could not extract commission date{}", with_url(url));
    }
    date
}

// ---- Commission members ----

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    President,
    Member,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct CommissionMembers {
    pub president_id: Option<String>,
    pub member_ids: Vec<String>,
}

fn is_president_title(text: &str) -> bool {
    let folded = fold(text);
    PRESIDENT_TITLES.iter().any(|t| folded.contains(&fold(t)))
}

fn strip_president_title(text: &str) -> String {
    let text = normalize_name(text);
    regex!(r"(?i)\(?\s*pr[ée]sident(?:e|\(e\))?(?:\s*\(?\s*suppl[ée]ant(?:e|\(e\))?\s*\)?)?\s*\)?")
        .replace_all(&text, "")
        .trim_matches(|c: char| c.is_whitespace() || ",;:–-".contains(c))
        .to_string()
}

fn classify_member(text: &str) -> (Role, String) {
    if is_president_title(text) {
        (Role::President, strip_president_title(text))
    } else {
        (Role::Member, text.trim().to_string())
    }
}

fn non_empty(names: Vec<(Role, String)>) -> Option<Vec<(Role, String)>> {
    let names: Vec<_> = names
        .into_iter()
        .filter(|(_, name)| !name.trim().is_empty())
        .collect();
    (!names.is_empty()).then_some(names)
}

fn members_from_list(doc: &Html) -> Option<Vec<(Role, String)>> {
    let mut seen = HashSet::new();
    let mut names = vec![];
    for section in doc
        .select(&CLEARFIX)
        .filter(|el| flatten_text(*el).contains(MEMBERS_MARKER))
    {
        for li in section.select(&LIST_ITEM) {
            if seen.insert(li.id()) {
                names.push(classify_member(flatten_text(li).trim()));
            }
        }
    }
    non_empty(names)
}

fn members_from_labels(doc: &Html) -> Option<Vec<(Role, String)>> {
    let text = doc.select(&CONTENT).map(flatten_text).join("\n");
    let mut names = vec![];

    if let Some(caps) = regex!(r"(?i)Président[e]?\s*[:：]\s*([^\n,]+)").captures(&text) {
        names.push((Role::President, caps[1].trim().to_string()));
    }
    if let Some(caps) = regex!(r"(?i)Membres\s*[:：]\s*([^\n]+)").captures(&text) {
        names.extend(
            caps[1]
                .split(|c| c == ',' || c == ';')
                .map(str::trim)
                .filter(|n| !n.is_empty())
                .map(|n| (Role::Member, n.to_string())),
        );
    }
    non_empty(names)
}

const MEMBER_STRATEGIES: &[Strategy<Html, Vec<(Role, String)>>] = &[
    ("members list", members_from_list),
    ("labelled members", members_from_labels),
];

/// President and members of the panel.
///
/// Every name found goes through `on_member_found`, which registers it and
/// returns its talent ID. The extractor itself never touches the store.
pub fn extract_commission_members<F>(
    doc: &Html,
    mut on_member_found: F,
    url: Option<&str>,
) -> CommissionMembers
where
    F: FnMut(&str) -> Option<String>,
{
    let mut members = CommissionMembers::default();

    for (role, name) in first_success(doc, MEMBER_STRATEGIES).unwrap_or_default() {
        let Some(talent_id) = on_member_found(&name) else {
            continue;
        };
        match role {
            Role::President => members.president_id = Some(talent_id),
            Role::Member => push_unique(&mut members.member_ids, &talent_id),
        }
    }

    if members.president_id.is_none() && members.member_ids.is_empty() {
        warn!("Could not extract commission members{}", with_url(url));
    } else if members.president_id.is_none() {
        warn!(
            "Could not extract commission president (found {} members){}",
            members.member_ids.len(),
            with_url(url)
        );
    }
    members
}

// ---- Project name ----

/// Headings of a commission page that carry bold markup but are not projects.
pub(crate) fn is_commission_header(text: &str) -> bool {
    [
        regex!(r"(?i)membres?\s+présents?\s+(à|a)\s+la\s+commission"),
        regex!(r"(?i)composition\s+de\s+la\s+commission"),
        regex!(r"(?i)commission\s+(réunie|spéciale)"),
        regex!(r"(?i)^résultats?\s+commission"),
    ]
    .iter()
    .any(|re| re.is_match(text))
}

fn is_not_a_project_name(name: &str) -> bool {
    is_commission_header(name)
        || regex!(r"(?i)liste\s+des\s+membres").is_match(name)
        || regex!(r"(?i)president\s+(de\s+)?la\s+commission").is_match(name)
}

fn bold_text(fragment: &Html, selector: &Selector) -> Option<String> {
    first_text(fragment, selector).filter(|t| !t.is_empty())
}

fn name_from_strong(fragment: &Html) -> Option<String> {
    bold_text(fragment, &STRONG)
}

fn name_from_b(fragment: &Html) -> Option<String> {
    bold_text(fragment, &B)
}

fn name_from_bold_style(fragment: &Html) -> Option<String> {
    bold_text(fragment, &BOLD_STYLE)
}

fn name_from_first_line(fragment: &Html) -> Option<String> {
    let text = document_text(fragment);
    let line: String = text
        .trim()
        .split('\n')
        .next()?
        .chars()
        .take(PROJECT_NAME_MAX)
        .collect();
    (!line.is_empty()).then_some(line)
}

const PROJECT_NAME_STRATEGIES: &[Strategy<Html, String>] = &[
    ("strong", name_from_strong),
    ("b", name_from_b),
    ("bold style", name_from_bold_style),
    ("first line", name_from_first_line),
];

pub fn extract_project_name(fragment: &Html, context: Option<&str>) -> Option<String> {
    let name = first_accepted(fragment, PROJECT_NAME_STRATEGIES, |name| {
        !is_not_a_project_name(name)
    })
    .map(|name| {
        name.strip_suffix('–')
            .unwrap_or(name.as_str())
            .trim()
            .to_string()
    })
    .filter(|name| !name.is_empty());

    if name.is_none() {
        warn!("Could not extract project name{}", with_context(context));
    }
    name
}

// ---- Beneficiary and talent ----

fn capture(re: &Regex, text: &str) -> Option<String> {
    let caps = re.captures(text)?;
    let value = caps.get(1)?.as_str().trim();
    (!value.is_empty()).then(|| value.to_string())
}

fn beneficiary_accented(text: &str) -> Option<String> {
    capture(
        regex!(r"(?i)Bénéficiaire[\s\x{a0}]*[:：]?[\s\x{a0}]*([^\n]+?)(?:\n|$|<br|Aide)"),
        text,
    )
}

fn beneficiary_unaccented(text: &str) -> Option<String> {
    capture(
        regex!(r"(?i)Beneficiaire[\s\x{a0}]*[:：]?[\s\x{a0}]*([^\n]+?)(?:\n|$|<br|Aide)"),
        text,
    )
}

fn beneficiary_misspelled(text: &str) -> Option<String> {
    capture(
        regex!(r"(?i)Bénéficaire[\s\x{a0}]*[:：]?[\s\x{a0}]*([^\n]+?)(?:\n|$|<br|Aide)"),
        text,
    )
}

fn beneficiary_applicant(text: &str) -> Option<String> {
    capture(
        regex!(r"(?i)Demandeur[\s\x{a0}]*[:：]?[\s\x{a0}]*([^\n]+?)(?:\n|$|<br|Aide)"),
        text,
    )
}

fn beneficiary_company(text: &str) -> Option<String> {
    capture(
        regex!(r"(?i)(?:Société|Entreprise)[\s\x{a0}]*[:：]?[\s\x{a0}]*([^\n]+?)(?:\n|$|<br|Aide)"),
        text,
    )
}

const BENEFICIARY_STRATEGIES: &[Strategy<str, String>] = &[
    ("Bénéficiaire", beneficiary_accented),
    ("Beneficiaire", beneficiary_unaccented),
    ("Bénéficaire", beneficiary_misspelled),
    ("Demandeur", beneficiary_applicant),
    ("Société/Entreprise", beneficiary_company),
];

pub fn extract_project_beneficiary(text: &str, context: Option<&str>) -> Option<String> {
    let beneficiary = first_success(text, BENEFICIARY_STRATEGIES);
    if beneficiary.is_none() {
        warn!("Could not extract project beneficiary{}", with_context(context));
    }
    beneficiary
}

fn talent_label(text: &str) -> Option<String> {
    capture(
        regex!(r"(?i)Talent[\s\x{a0}]*[:：][\s\x{a0}]*([^\n]+?)(?:\n|$|<br|Bénéficiaire|Aide)"),
        text,
    )
}

fn talent_author(text: &str) -> Option<String> {
    capture(
        regex!(r"(?i)Auteur[\s\x{a0}]*[:：][\s\x{a0}]*([^\n]+?)(?:\n|$|<br|Bénéficiaire|Aide)"),
        text,
    )
}

fn talent_director(text: &str) -> Option<String> {
    capture(
        regex!(r"(?i)Réalisateur[\s\x{a0}]*[:：][\s\x{a0}]*([^\n]+?)(?:\n|$|<br|Bénéficiaire|Aide)"),
        text,
    )
}

fn talent_creator(text: &str) -> Option<String> {
    capture(
        regex!(r"(?i)Créateur[\s\x{a0}]*[:：][\s\x{a0}]*([^\n]+?)(?:\n|$|<br|Bénéficiaire|Aide)"),
        text,
    )
}

const TALENT_STRATEGIES: &[Strategy<str, String>] = &[
    ("Talent", talent_label),
    ("Auteur", talent_author),
    ("Réalisateur", talent_director),
    ("Créateur", talent_creator),
];

/// Raw credit line of the project. Often absent, so no warning.
pub fn extract_project_talent(text: &str) -> Option<String> {
    first_success(text, TALENT_STRATEGIES)
}

// ---- Amount ----

/// Parses a digit run that may hold French thousands separators.
fn parse_amount(digits: &str) -> Option<u64> {
    let digits: String = digits.chars().filter(|c| !c.is_whitespace()).collect();
    digits.parse().ok()
}

fn amount_capture(re: &Regex, text: &str) -> Option<u64> {
    parse_amount(re.captures(text)?.get(1)?.as_str())
}

fn amount_granted(text: &str) -> Option<u64> {
    amount_capture(
        regex!(r"(?i)Aide accordée[\s\x{a0}]*[:：][\s\x{a0}]*:?[\s\x{a0}]*([0-9\s\x{a0}]+)[\s\x{a0}]*€"),
        text,
    )
}

fn amount_labelled(text: &str) -> Option<u64> {
    amount_capture(regex!(r"(?i)Montant\s*[:：]\s*([0-9\s]+)\s*€"), text)
}

fn amount_trailing_label(text: &str) -> Option<u64> {
    amount_capture(regex!(r"(?i)([0-9\s]+)\s*€\s*accordé"), text)
}

fn amount_bare(text: &str) -> Option<u64> {
    amount_capture(regex!(r"([0-9\s]+)\s*€"), text)
        .filter(|amount| (BARE_AMOUNT_MIN..=BARE_AMOUNT_MAX).contains(amount))
}

const AMOUNT_STRATEGIES: &[Strategy<str, u64>] = &[
    ("Aide accordée", amount_granted),
    ("Montant", amount_labelled),
    ("accordé", amount_trailing_label),
    ("bare euros", amount_bare),
];

pub fn extract_project_amount(text: &str, context: Option<&str>) -> Option<u64> {
    let amount = first_success(text, AMOUNT_STRATEGIES);
    if amount.is_none() {
        warn!("Could not extract project amount{}", with_context(context));
    }
    amount
}
