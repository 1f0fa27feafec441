//! Conformance-format serialization tests.
//!
//! Expected trees are written in the html5lib-tests `| <tag>` indented
//! format.

use wallaby_html::test_format::to_test_format;
use wallaby_html::{ByteParseOptions, ParseOptions, parse_bytes, parse_document};

fn format(html: &str) -> String {
    let output = parse_document(html, &ParseOptions::default()).unwrap();
    to_test_format(&output.tree)
}

#[test]
fn simple_paragraph() {
    assert_eq!(
        format("<p>Hello</p>"),
        "\
| <html>
|   <head>
|   <body>
|     <p>
|       \"Hello\"
"
    );
}

#[test]
fn explicit_document_with_doctype() {
    assert_eq!(
        format("<!DOCTYPE html><html><head></head><body><p>Hi</p></body></html>"),
        "\
| <!DOCTYPE html>
| <html>
|   <head>
|   <body>
|     <p>
|       \"Hi\"
"
    );
}

#[test]
fn doctype_with_identifiers() {
    assert_eq!(
        format(r#"<!DOCTYPE html PUBLIC "pub" "sys"><p>x"#),
        "\
| <!DOCTYPE html \"pub\" \"sys\">
| <html>
|   <head>
|   <body>
|     <p>
|       \"x\"
"
    );
}

#[test]
fn misnested_formatting_elements() {
    assert_eq!(
        format("<b><i></b></i>"),
        "\
| <html>
|   <head>
|   <body>
|     <b>
|       <i>
"
    );
}

#[test]
fn implicit_tbody() {
    assert_eq!(
        format("<table><tr><td>A"),
        "\
| <html>
|   <head>
|   <body>
|     <table>
|       <tbody>
|         <tr>
|           <td>
|             \"A\"
"
    );
}

#[test]
fn svg_namespace_prefixes_and_integration_point() {
    assert_eq!(
        format("<svg><g><foreignObject><p>x</p>"),
        "\
| <html>
|   <head>
|   <body>
|     <svg svg>
|       <svg g>
|         <svg foreignObject>
|           <p>
|             \"x\"
"
    );
}

#[test]
fn attributes_are_sorted_in_output() {
    assert_eq!(
        format(r#"<p id="z" class="a">x"#),
        "\
| <html>
|   <head>
|   <body>
|     <p>
|       class=\"a\"
|       id=\"z\"
|       \"x\"
"
    );
}

#[test]
fn namespaced_attributes_print_with_a_space() {
    assert_eq!(
        format(r##"<svg xlink:href="#a"></svg>"##),
        "\
| <html>
|   <head>
|   <body>
|     <svg svg>
|       xlink href=\"#a\"
"
    );
}

#[test]
fn template_contents_marker() {
    assert_eq!(
        format("<template>x</template>"),
        "\
| <html>
|   <head>
|     <template>
|       content
|         \"x\"
|   <body>
"
    );
}

#[test]
fn comments_in_output() {
    assert_eq!(
        format("<!--c--><p>x"),
        "\
| <!-- c -->
| <html>
|   <head>
|   <body>
|     <p>
|       \"x\"
"
    );
}

#[test]
fn utf8_bytes_with_bom() {
    // EF BB BF "<p>" E2 9C 93 "</p>": the BOM selects UTF-8 and the body
    // is a single U+2713 check mark.
    let bytes = [
        0xEF, 0xBB, 0xBF, 0x3C, 0x70, 0x3E, 0xE2, 0x9C, 0x93, 0x3C, 0x2F, 0x70, 0x3E,
    ];
    let output = parse_bytes(&bytes, &ByteParseOptions::default()).unwrap();
    assert_eq!(output.encoding_name, Some("UTF-8"));
    assert_eq!(
        to_test_format(&output.tree),
        "\
| <html>
|   <head>
|   <body>
|     <p>
|       \"\u{2713}\"
"
    );
}

#[test]
fn serialization_is_deterministic() {
    let input = "<div a=1 b=2><p>x<table><tr><td>y";
    assert_eq!(format(input), format(input));
}
