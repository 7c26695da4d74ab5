use regex::Regex;
use std::sync::LazyLock;

use crate::traits::{TitleMatcher, TitleQuery};

static NON_ALPHANUMERIC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\p{L}\p{N}]+").expect("static regex"));

/// Lowercase a title and collapse every run of punctuation or whitespace
/// into a single space.
pub fn normalize_title(title: &str) -> String {
    NON_ALPHANUMERIC
        .replace_all(&title.to_lowercase(), " ")
        .trim()
        .to_string()
}

/// Case-insensitive equality of the raw titles; the year is ignored.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExactTitleMatcher;

impl TitleMatcher for ExactTitleMatcher {
    fn name(&self) -> &'static str {
        "exact"
    }

    fn matches(&self, query: TitleQuery<'_>, candidate_title: &str, _: Option<u16>) -> bool {
        query.title.trim().to_lowercase() == candidate_title.trim().to_lowercase()
    }
}

/// Equality of normalized titles. When both sides know the year it has to
/// agree too, which keeps remakes apart.
#[derive(Debug, Clone, Copy, Default)]
pub struct NormalizedTitleMatcher;

impl TitleMatcher for NormalizedTitleMatcher {
    fn name(&self) -> &'static str {
        "normalized"
    }

    fn matches(
        &self,
        query: TitleQuery<'_>,
        candidate_title: &str,
        candidate_year: Option<u16>,
    ) -> bool {
        if let (Some(a), Some(b)) = (query.year, candidate_year) {
            if a != b {
                return false;
            }
        }
        normalize_title(query.title) == normalize_title(candidate_title)
    }
}

/// Build a matcher from its configured name.
pub fn matcher_by_name(name: &str) -> Option<Box<dyn TitleMatcher>> {
    match name.trim().to_lowercase().as_str() {
        "exact" => Some(Box::new(ExactTitleMatcher)),
        "normalized" => Some(Box::new(NormalizedTitleMatcher)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(title: &str, year: Option<u16>) -> TitleQuery<'_> {
        TitleQuery { title, year }
    }

    #[test]
    fn normalize_collapses_punctuation() {
        assert_eq!(normalize_title("  Alpha: The   Return! "), "alpha the return");
        assert_eq!(normalize_title("Amélie"), "amélie");
        assert_eq!(normalize_title("Se7en"), "se7en");
    }

    #[test]
    fn exact_matcher_ignores_case_only() {
        let matcher = ExactTitleMatcher;
        assert!(matcher.matches(query("The Office", None), "the office", Some(2005)));
        assert!(!matcher.matches(query("The Office (US)", None), "The Office", None));
    }

    #[test]
    fn normalized_matcher_checks_year_when_known() {
        let matcher = NormalizedTitleMatcher;
        assert!(matcher.matches(query("Doctor Who", Some(2005)), "Doctor-Who", Some(2005)));
        assert!(!matcher.matches(query("Doctor Who", Some(1963)), "Doctor Who", Some(2005)));
        assert!(matcher.matches(query("Doctor Who", None), "doctor who", Some(2005)));
    }

    #[test]
    fn matcher_lookup_by_name() {
        assert_eq!(matcher_by_name("Exact").map(|m| m.name()), Some("exact"));
        assert_eq!(matcher_by_name("normalized").map(|m| m.name()), Some("normalized"));
        assert!(matcher_by_name("fuzzy").is_none());
    }
}
