//! Tests for the character reference decoder.

use wallaby_html::entities::{decode, is_legacy_entity, lookup_entity, normalize_code_point};

#[test]
fn lookup_common_entities() {
    assert_eq!(lookup_entity("amp;"), Some("&"));
    assert_eq!(lookup_entity("lt;"), Some("<"));
    assert_eq!(lookup_entity("hellip;"), Some("\u{2026}"));
    assert_eq!(lookup_entity("nosuchentity;"), None);
}

#[test]
fn legacy_entities_work_without_semicolon() {
    assert_eq!(lookup_entity("amp"), Some("&"));
    assert_eq!(lookup_entity("copy"), Some("\u{A9}"));
    assert!(is_legacy_entity("nbsp"));
    // apos is not on the legacy list.
    assert_eq!(lookup_entity("apos"), None);
    assert!(!is_legacy_entity("apos"));
}

#[test]
fn multi_character_replacement() {
    assert_eq!(lookup_entity("fjlig;"), Some("fj"));
}

#[test]
fn decode_plain_text_is_borrowed() {
    let decoded = decode("no references here", false);
    assert!(matches!(decoded, std::borrow::Cow::Borrowed(_)));
}

#[test]
fn decode_named_references() {
    assert_eq!(decode("a&amp;b&lt;c", false), "a&b<c");
}

#[test]
fn decode_longest_match_wins() {
    // "&notit;" resolves the "not" prefix; the rest stays.
    assert_eq!(decode("&notit;", false), "\u{AC}it;");
    // "&notin;" is an exact match.
    assert_eq!(decode("&notin;", false), "\u{2209}");
}

#[test]
fn decode_legacy_without_semicolon() {
    assert_eq!(decode("&amp", false), "&");
    assert_eq!(decode("&copy today", false), "\u{A9} today");
}

#[test]
fn decode_attribute_suppression_rule() {
    // Followed by '=' or alphanumeric: the reference is suppressed in
    // attribute context only.
    assert_eq!(decode("&amp=x", true), "&amp=x");
    assert_eq!(decode("&ampx", true), "&ampx");
    assert_eq!(decode("&amp=x", false), "&=x");
    // With an explicit semicolon the rule does not apply.
    assert_eq!(decode("&amp;=x", true), "&=x");
}

#[test]
fn decode_numeric_references() {
    assert_eq!(decode("&#65;", false), "A");
    assert_eq!(decode("&#x41;", false), "A");
    assert_eq!(decode("&#X41;", false), "A");
    // Trailing semicolon is optional.
    assert_eq!(decode("&#65", false), "A");
}

#[test]
fn decode_numeric_edge_cases() {
    assert_eq!(decode("&#0;", false), "\u{FFFD}");
    assert_eq!(decode("&#xD800;", false), "\u{FFFD}");
    assert_eq!(decode("&#x110000;", false), "\u{FFFD}");
    // The windows-1252 mapping for the C1 range.
    assert_eq!(decode("&#128;", false), "\u{20AC}");
    assert_eq!(decode("&#x9f;", false), "\u{178}");
}

#[test]
fn decode_leaves_bare_ampersands_alone() {
    assert_eq!(decode("a & b", false), "a & b");
    assert_eq!(decode("&", false), "&");
    assert_eq!(decode("&#", false), "&#");
    assert_eq!(decode("&#x;", false), "&#x;");
    assert_eq!(decode("&;", false), "&;");
}

#[test]
fn normalize_code_point_table() {
    assert_eq!(normalize_code_point(0x41), 'A');
    assert_eq!(normalize_code_point(0), '\u{FFFD}');
    assert_eq!(normalize_code_point(0xDFFF), '\u{FFFD}');
    assert_eq!(normalize_code_point(0x0011_0000), '\u{FFFD}');
    assert_eq!(normalize_code_point(0x80), '\u{20AC}');
    assert_eq!(normalize_code_point(0x9C), '\u{153}');
    // 0x81 has no windows-1252 replacement and passes through.
    assert_eq!(normalize_code_point(0x81), '\u{81}');
}
