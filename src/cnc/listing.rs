use crate::config::PORTLET;
use itertools::Itertools;
use lazy_regex::regex;
use lazy_static::lazy_static;
use scraper::{Html, Selector};

const E: &str = "Invalid selector";
lazy_static! {
    static ref ROWS: Selector = Selector::parse("table.table-striped tbody tr").expect(E);
    static ref COMMISSION_LINK: Selector =
        Selector::parse(r#"a[href*="resultats-de-la-commission"]"#).expect(E);
    static ref NEXT_PAGE: Selector = Selector::parse(r#"a.next, a[rel="next"]"#).expect(E);
    static ref AID_OPTIONS: Selector =
        Selector::parse(&format!("#_{}_nomAide option", PORTLET)).expect(E);
}

/// One page of the commission search results.
#[derive(Debug, PartialEq, Eq)]
pub struct ListingPage {
    pub links: Vec<String>,
    pub has_next: bool,
}

/// Absolute URLs of the commission pages listed on a results page, in row order.
pub fn parse_listing_page(doc: &Html, base_url: &str) -> ListingPage {
    let links = doc
        .select(&ROWS)
        .filter_map(|row| row.select(&COMMISSION_LINK).next())
        .filter_map(|a| a.value().attr("href"))
        .map(str::trim)
        .filter(|href| !href.is_empty())
        .map(|href| {
            if href.starts_with("http") {
                href.to_string()
            } else {
                format!("{}{}", base_url.trim_end_matches('/'), href)
            }
        })
        .unique()
        .collect();

    ListingPage {
        links,
        has_next: doc.select(&NEXT_PAGE).next().is_some(),
    }
}

/// Aid names offered by the search form, sorted, without placeholders or years.
pub fn parse_aid_names(doc: &Html) -> Vec<String> {
    doc.select(&AID_OPTIONS)
        .filter_map(|option| option.value().attr("value"))
        .map(str::trim)
        .filter(|value| {
            value.chars().count() > 2
                && !value.to_lowercase().contains("sélectionnez")
                && !regex!(r"^[0-9]{4}$").is_match(value)
        })
        .map(ToString::to_string)
        .sorted()
        .dedup()
        .collect()
}
