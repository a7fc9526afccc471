use chrono::NaiveDate;
use lazy_regex::regex;
use tracing::warn;
use unicode_normalization::UnicodeNormalization;

pub(crate) const FRENCH_MONTHS: [&str; 12] = [
    "janvier",
    "février",
    "mars",
    "avril",
    "mai",
    "juin",
    "juillet",
    "août",
    "septembre",
    "octobre",
    "novembre",
    "décembre",
];

/// Lowercase, accent-stripped, hyphen-separated form of `text` used inside IDs.
pub fn slugify(text: &str) -> String {
    let folded = fold(text.trim());
    let folded = regex!(r"['\x{2019}]").replace_all(&folded, "");
    regex!(r"[^a-z0-9]+")
        .replace_all(&folded, "-")
        .trim_matches('-')
        .to_string()
}

/// Display form of a name: trimmed, single spaced, accents composed.
pub fn normalize_name(name: &str) -> String {
    regex!(r"\s+")
        .replace_all(name.trim(), " ")
        .nfc()
        .collect()
}

/// Lowercases and strips combining diacritics (U+0300..U+036F).
pub(crate) fn fold(text: &str) -> String {
    text.to_lowercase()
        .nfd()
        .filter(|c| !('\u{0300}'..='\u{036f}').contains(c))
        .collect()
}

/// Converts `"3 juillet 2025"` into `"2025-07-03"`.
///
/// Text that does not form a valid date is handed back unchanged, with a warning.
/// Only blank input yields `None`.
pub fn parse_french_date(french_date: &str) -> Option<String> {
    if french_date.trim().is_empty() {
        return None;
    }

    match to_naive_date(french_date.trim()) {
        Some(date) => Some(date.format("%Y-%m-%d").to_string()),
        None => {
            warn!("Could not parse date: {:?}", french_date);
            Some(french_date.to_string())
        }
    }
}

fn to_naive_date(text: &str) -> Option<NaiveDate> {
    let caps = regex!(r"^([0-9]{1,2})\s+(\p{L}+)\s+([0-9]{4})$").captures(text)?;
    let day: u32 = caps[1].parse().ok()?;
    let month = month_number(&caps[2])?;
    let year: i32 = caps[3].parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

fn month_number(name: &str) -> Option<u32> {
    let name: String = name.nfc().collect::<String>().to_lowercase();
    FRENCH_MONTHS
        .iter()
        .position(|m| *m == name)
        .and_then(|i| u32::try_from(i + 1).ok())
}

/// Splits a credit line on commas and on the conjunction "et".
pub fn split_talent_names(talents: &str) -> Vec<String> {
    talents
        .split(',')
        .flat_map(|part| regex!(r"(?i)\s+et\s+").split(part))
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(ToString::to_string)
        .collect()
}

/// True when `name` carries both an ASCII lowercase and an ASCII uppercase letter.
pub(crate) fn has_proper_case(name: &str) -> bool {
    name.chars().any(|c| c.is_ascii_lowercase()) && name.chars().any(|c| c.is_ascii_uppercase())
}

pub(crate) fn get_now() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Hello World"), "hello-world");
        assert_eq!(slugify("Café Crème"), "cafe-creme");
        assert_eq!(slugify("José García"), "jose-garcia");
        assert_eq!(slugify("L'Amour"), "lamour");
        assert_eq!(slugify("C\u{2019}est"), "cest");
        assert_eq!(slugify("Multiple   Spaces"), "multiple-spaces");
        assert_eq!(slugify("Hello! World?"), "hello-world");
        assert_eq!(slugify("Test (2024)"), "test-2024");
        assert_eq!(slugify("-Hello-"), "hello");
        assert_eq!(slugify("Hello World-"), "hello-world");
    }

    #[test]
    fn test_slugify_decomposed_input() {
        assert_eq!(slugify("Cafe\u{301}"), "cafe");
    }

    #[test]
    fn test_normalize_name() {
        assert_eq!(normalize_name("JOHN DOE"), "JOHN DOE");
        assert_eq!(normalize_name("McDonald"), "McDonald");
        assert_eq!(normalize_name("  John   Doe  "), "John Doe");
        assert_eq!(normalize_name("John\t\tDoe"), "John Doe");
        assert_eq!(normalize_name("Jose\u{301} Garci\u{301}a"), "José García");
    }

    #[test]
    fn test_parse_french_date() {
        assert_eq!(parse_french_date("3 juillet 2025").as_deref(), Some("2025-07-03"));
        assert_eq!(parse_french_date(" 21 février 2019 ").as_deref(), Some("2019-02-21"));
        assert_eq!(parse_french_date("15 DÉCEMBRE 2022").as_deref(), Some("2022-12-15"));
        assert_eq!(parse_french_date(""), None);
    }

    #[test]
    fn test_parse_french_date_all_months() {
        for (i, month) in FRENCH_MONTHS.iter().enumerate() {
            let expected = format!("2024-{:02}-01", i + 1);
            assert_eq!(
                parse_french_date(&format!("1 {} 2024", month)),
                Some(expected)
            );
        }
    }

    #[test]
    fn test_parse_french_date_returns_raw_text_when_invalid() {
        assert_eq!(
            parse_french_date("Commission du printemps").as_deref(),
            Some("Commission du printemps")
        );
        assert_eq!(
            parse_french_date("31 février 2020").as_deref(),
            Some("31 février 2020")
        );
    }

    #[test]
    fn test_split_talent_names() {
        assert_eq!(
            split_talent_names("Chloé CATOEN et Marine MANICHINI"),
            vec!["Chloé CATOEN", "Marine MANICHINI"]
        );
        assert_eq!(split_talent_names("A, B et C"), vec!["A", "B", "C"]);
        assert_eq!(split_talent_names("Léa ET Hugo"), vec!["Léa", "Hugo"]);
        assert_eq!(split_talent_names("Benet Cortès"), vec!["Benet Cortès"]);
        assert!(split_talent_names("  ").is_empty());
    }

    #[test]
    fn test_has_proper_case() {
        assert!(has_proper_case("Dada Media"));
        assert!(!has_proper_case("DADA MEDIA"));
        assert!(!has_proper_case("dada media"));
    }
}
