// Tests for CLI helper functions

use curio::handlers::{expand_output_dir, parse_target_url};

#[test]
fn test_parse_target_url_with_scheme() {
    assert_eq!(
        parse_target_url("https://example.com/shop/"),
        Some("https://example.com/shop/".to_string())
    );
}

#[test]
fn test_parse_target_url_adds_scheme() {
    assert_eq!(
        parse_target_url("example.com/shop/"),
        Some("https://example.com/shop/".to_string())
    );
}

#[test]
fn test_expand_output_dir_plain_path() {
    assert_eq!(
        expand_output_dir("./reports"),
        std::path::PathBuf::from("./reports")
    );
}

#[test]
fn test_expand_output_dir_tilde() {
    let expanded = expand_output_dir("~/reports");
    assert!(!expanded.to_string_lossy().starts_with('~'));
    assert!(expanded.to_string_lossy().ends_with("reports"));
}
