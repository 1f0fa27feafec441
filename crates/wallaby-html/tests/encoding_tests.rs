//! Tests for encoding sniffing and byte decoding.

use wallaby_html::encoding::{ResolvedEncoding, decode_bytes, resolve_label, sniff};

fn exact_name(resolved: ResolvedEncoding) -> &'static str {
    match resolved {
        ResolvedEncoding::Exact(encoding) => encoding.name(),
        ResolvedEncoding::Utf16BomSensitive => "UTF-16",
    }
}

#[test]
fn label_normalization_accepts_aliases() {
    assert_eq!(exact_name(resolve_label("UTF-8").unwrap()), "UTF-8");
    assert_eq!(exact_name(resolve_label("utf8").unwrap()), "UTF-8");
    assert_eq!(exact_name(resolve_label(" latin1 ").unwrap()), "windows-1252");
    assert_eq!(exact_name(resolve_label("cp1252").unwrap()), "windows-1252");
    assert_eq!(exact_name(resolve_label("iso8859-2").unwrap()), "ISO-8859-2");
    assert_eq!(exact_name(resolve_label("EUC-JP").unwrap()), "EUC-JP");
    assert!(resolve_label("klingon").is_none());
}

#[test]
fn utf7_folds_to_windows_1252() {
    assert_eq!(exact_name(resolve_label("utf-7").unwrap()), "windows-1252");
}

#[test]
fn transport_hint_wins() {
    let bytes = b"<meta charset=\"utf-8\">";
    let (resolved, skip) = sniff(bytes, Some("iso-8859-2"));
    assert_eq!(exact_name(resolved), "ISO-8859-2");
    assert_eq!(skip, 0);
}

#[test]
fn unknown_transport_hint_falls_through() {
    let bytes = b"<meta charset=\"utf-8\">";
    let (resolved, _) = sniff(bytes, Some("klingon"));
    assert_eq!(exact_name(resolved), "UTF-8");
}

#[test]
fn bom_detection() {
    let (resolved, skip) = sniff(b"\xEF\xBB\xBFhello", None);
    assert_eq!(exact_name(resolved), "UTF-8");
    assert_eq!(skip, 3);

    let (resolved, skip) = sniff(b"\xFF\xFEh\x00", None);
    assert_eq!(exact_name(resolved), "UTF-16LE");
    assert_eq!(skip, 2);

    let (resolved, skip) = sniff(b"\xFE\xFF\x00h", None);
    assert_eq!(exact_name(resolved), "UTF-16BE");
    assert_eq!(skip, 2);
}

#[test]
fn default_is_windows_1252() {
    let (resolved, _) = sniff(b"plain text, nothing declared", None);
    assert_eq!(exact_name(resolved), "windows-1252");
}

#[test]
fn meta_charset_prescan() {
    let bytes = b"<html><head><meta charset='utf-8'></head></html>";
    let (resolved, _) = sniff(bytes, None);
    assert_eq!(exact_name(resolved), "UTF-8");
}

#[test]
fn meta_http_equiv_content_type() {
    let bytes =
        b"<meta http-equiv=\"Content-Type\" content=\"text/html; charset=iso-8859-2\">";
    let (resolved, _) = sniff(bytes, None);
    assert_eq!(exact_name(resolved), "ISO-8859-2");
}

#[test]
fn prescan_skips_comments() {
    let bytes = b"<!-- <meta charset='utf-16le'> --><meta charset=utf-8>";
    let (resolved, _) = sniff(bytes, None);
    assert_eq!(exact_name(resolved), "UTF-8");
}

#[test]
fn prescan_honors_quoted_attribute_values() {
    // The `>` inside the quoted attribute must not end the tag early.
    let bytes = b"<div title=\"a > b\"><meta charset=utf-8>";
    let (resolved, _) = sniff(bytes, None);
    assert_eq!(exact_name(resolved), "UTF-8");
}

#[test]
fn meta_utf16_is_read_as_utf8() {
    // A UTF-16 label the prescan could read is necessarily wrong.
    let bytes = b"<meta charset=\"utf-16\">";
    let (resolved, _) = sniff(bytes, None);
    assert_eq!(exact_name(resolved), "UTF-8");
}

#[test]
fn decode_utf16le_bytes() {
    let decoded = decode_bytes(b"\xFF\xFEh\x00i\x00", None);
    assert_eq!(decoded.text, "hi");
    assert_eq!(decoded.encoding.name(), "UTF-16LE");
}

#[test]
fn decode_unmarked_utf16_defaults_to_little_endian() {
    let decoded = decode_bytes(b"h\x00i\x00", Some("utf-16"));
    assert_eq!(decoded.text, "hi");
    assert_eq!(decoded.encoding.name(), "UTF-16LE");
}

#[test]
fn decode_unmarked_utf16_honors_embedded_big_endian_bom() {
    let decoded = decode_bytes(b"\xFE\xFF\x00h\x00i", Some("utf-16"));
    assert_eq!(decoded.text, "hi");
    assert_eq!(decoded.encoding.name(), "UTF-16BE");
}

#[test]
fn decode_windows_1252_smart_quotes() {
    let decoded = decode_bytes(b"\x93quoted\x94", None);
    assert_eq!(decoded.text, "\u{201C}quoted\u{201D}");
}

#[test]
fn decode_euc_jp() {
    let decoded = decode_bytes(b"\xB0\xA1", Some("euc-jp"));
    assert_eq!(decoded.text, "\u{4E9C}");
}
