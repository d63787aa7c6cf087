// Category name normalization for navigation-derived labels

use regex::Regex;
use std::sync::LazyLock;

static SUBMENU_PREFIX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(Open|Close)\s+submenu\s*[\(\[]?").unwrap());
static TRAILING_BRACKET_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[\)\]]$").unwrap());
static TOGGLE_PREFIX_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)^Toggle\s+").unwrap());
static COUNT_SUFFIX_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s*\(\d+\)$").unwrap());

/// Navigation labels that are never category names.
pub const SKIP_TEXTS: &[&str] = &[
    "home",
    "about",
    "contact",
    "blog",
    "news",
    "login",
    "register",
    "cart",
    "checkout",
    "account",
    "search",
    "menu",
    "close",
    "more",
    "view all",
    "see all",
    "all products",
    "shop",
    "store",
    "back",
    "close submenu",
    "open submenu",
];

/// Strip accessibility scaffolding and counters from a navigation label,
/// e.g. "Open submenu (Chairs)" becomes "Chairs" and "Seating (12)"
/// becomes "Seating".
pub fn clean_category_name(name: &str) -> String {
    let collapsed = name.split_whitespace().collect::<Vec<_>>().join(" ");

    let cleaned = SUBMENU_PREFIX_RE.replace(&collapsed, "");
    let cleaned = TRAILING_BRACKET_RE.replace(&cleaned, "");
    let cleaned = TOGGLE_PREFIX_RE.replace(&cleaned, "");
    let cleaned = COUNT_SUFFIX_RE.replace(&cleaned, "");

    cleaned.trim().to_string()
}

/// A label qualifies as a category name if cleaning leaves at least two
/// characters and neither the raw nor the cleaned form is a known
/// navigation chrome label.
pub fn is_valid_category_name(raw: &str, cleaned: &str) -> bool {
    if cleaned.len() < 2 {
        return false;
    }
    let raw_lower = raw.trim().to_lowercase();
    let cleaned_lower = cleaned.to_lowercase();
    if SKIP_TEXTS.contains(&raw_lower.as_str()) || SKIP_TEXTS.contains(&cleaned_lower.as_str()) {
        return false;
    }
    if cleaned_lower.contains("close submenu") {
        return false;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_submenu_parenthesized() {
        assert_eq!(clean_category_name("Open submenu (Chairs)"), "Chairs");
    }

    #[test]
    fn test_close_submenu_bracketed() {
        assert_eq!(clean_category_name("Close submenu [Tables]"), "Tables");
    }

    #[test]
    fn test_toggle_prefix() {
        assert_eq!(clean_category_name("Toggle Storage"), "Storage");
    }

    #[test]
    fn test_count_suffix() {
        assert_eq!(clean_category_name("Seating (12)"), "Seating");
    }

    #[test]
    fn test_whitespace_collapsed() {
        assert_eq!(clean_category_name("  Lounge \n  Chairs "), "Lounge Chairs");
    }

    #[test]
    fn test_plain_name_untouched() {
        assert_eq!(clean_category_name("Outdoor Furniture"), "Outdoor Furniture");
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(clean_category_name(""), "");
    }

    #[test]
    fn test_validity_rejects_chrome_labels() {
        assert!(!is_valid_category_name("Cart", "Cart"));
        assert!(!is_valid_category_name("Open submenu", ""));
        assert!(!is_valid_category_name("X", "X"));
        assert!(is_valid_category_name("Seating (12)", "Seating"));
    }

    #[test]
    fn test_validity_checks_raw_label_too() {
        // Cleaning may produce a plausible name from a chrome label; the raw
        // form still disqualifies it.
        assert!(!is_valid_category_name("view all", "view all"));
    }
}
