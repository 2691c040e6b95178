use super::*;

#[test]
fn test_extracts_bracketed_names() {
    assert_eq!(
        formula_references("[PRICE] * [QUANTITY]"),
        vec!["PRICE", "QUANTITY"]
    );
}

#[test]
fn test_names_with_digits_and_underscores() {
    assert_eq!(
        formula_references("([CELL_1] + [CELL_2]) / 2"),
        vec!["CELL_1", "CELL_2"]
    );
}

#[test]
fn test_repeated_reference_listed_once() {
    assert_eq!(
        formula_references("[A] + [B] * [A]"),
        vec!["A", "B"]
    );
}

#[test]
fn test_lowercase_and_spaced_names_ignored() {
    assert!(formula_references("[price] + [TOTAL COST]").is_empty());
}

#[test]
fn test_empty_formula_has_no_references() {
    assert!(formula_references("").is_empty());
    assert!(formula_references("42 * 3").is_empty());
}

#[test]
fn test_blank_formula_detection() {
    assert!(is_blank(None));
    assert!(is_blank(Some("")));
    assert!(is_blank(Some("   ")));
    assert!(!is_blank(Some("[A] + 1")));
}
