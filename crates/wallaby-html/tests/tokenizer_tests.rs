//! Integration tests for the HTML tokenizer.

use wallaby_html::{Token, Tokenizer, TokenizerErrorKind, TokenizerOptions, TokenizerState};

/// Helper to tokenize a string and return the tokens.
fn tokenize(input: &str) -> Vec<Token> {
    Tokenizer::new(input).into_tokens()
}

fn tokenize_with(input: &str, opts: &TokenizerOptions) -> Vec<Token> {
    Tokenizer::with_options(input, opts).into_tokens()
}

/// Collapse character tokens into a string, ignoring everything else.
fn text_of(tokens: &[Token]) -> String {
    tokens
        .iter()
        .filter_map(|t| match t {
            Token::Character { data } => Some(*data),
            _ => None,
        })
        .collect()
}

#[test]
fn plain_text() {
    let tokens = tokenize("Hello");
    assert_eq!(tokens.len(), 6); // 5 chars + EOF
    assert!(matches!(tokens[0], Token::Character { data: 'H' }));
    assert!(matches!(tokens[4], Token::Character { data: 'o' }));
    assert!(matches!(tokens[5], Token::EndOfFile));
}

#[test]
fn doctype() {
    let tokens = tokenize("<!DOCTYPE html>");
    assert_eq!(tokens.len(), 2); // DOCTYPE + EOF
    match &tokens[0] {
        Token::Doctype {
            name, force_quirks, ..
        } => {
            assert_eq!(name.as_deref(), Some("html"));
            assert!(!force_quirks);
        }
        other => panic!("expected DOCTYPE token, got {other}"),
    }
}

#[test]
fn doctype_with_public_and_system_identifier() {
    let tokens = tokenize(
        r#"<!DOCTYPE html PUBLIC "-//W3C//DTD HTML 4.01//EN" "http://www.w3.org/TR/html4/strict.dtd">"#,
    );
    match &tokens[0] {
        Token::Doctype {
            name,
            public_identifier,
            system_identifier,
            force_quirks,
        } => {
            assert_eq!(name.as_deref(), Some("html"));
            assert_eq!(public_identifier.as_deref(), Some("-//W3C//DTD HTML 4.01//EN"));
            assert_eq!(
                system_identifier.as_deref(),
                Some("http://www.w3.org/TR/html4/strict.dtd")
            );
            assert!(!force_quirks);
        }
        other => panic!("expected DOCTYPE token, got {other}"),
    }
}

#[test]
fn bogus_doctype_forces_quirks() {
    let tokens = tokenize("<!DOCTYPE html BLAH>");
    match &tokens[0] {
        Token::Doctype { force_quirks, .. } => assert!(force_quirks),
        other => panic!("expected DOCTYPE token, got {other}"),
    }
}

#[test]
fn start_tag() {
    let tokens = tokenize("<div>");
    assert_eq!(tokens.len(), 2);
    match &tokens[0] {
        Token::StartTag {
            name,
            self_closing,
            attributes,
        } => {
            assert_eq!(name, "div");
            assert!(!self_closing);
            assert!(attributes.is_empty());
        }
        other => panic!("expected StartTag token, got {other}"),
    }
}

#[test]
fn tag_names_are_lowercased() {
    let tokens = tokenize("<DiV>");
    assert_eq!(tokens[0].tag_name(), Some("div"));
}

#[test]
fn end_tag() {
    let tokens = tokenize("</div>");
    assert_eq!(tokens.len(), 2);
    assert!(matches!(&tokens[0], Token::EndTag { name, .. } if name == "div"));
}

#[test]
fn self_closing_tag() {
    let tokens = tokenize("<br/>");
    match &tokens[0] {
        Token::StartTag {
            name, self_closing, ..
        } => {
            assert_eq!(name, "br");
            assert!(self_closing);
        }
        other => panic!("expected self-closing StartTag token, got {other}"),
    }
}

#[test]
fn comment() {
    let tokens = tokenize("<!-- hello -->");
    assert_eq!(tokens.len(), 2);
    assert!(matches!(&tokens[0], Token::Comment { data } if data == " hello "));
}

#[test]
fn bogus_comment_from_bang() {
    // `<!x>` is an incorrectly opened comment; the data starts right
    // after `<!`.
    let tokens = tokenize("<!x>");
    assert!(matches!(&tokens[0], Token::Comment { data } if data == "x"));
}

#[test]
fn attributes_single_double_and_unquoted() {
    let tokens = tokenize(r#"<div a="1" b='2' c=3>"#);
    match &tokens[0] {
        Token::StartTag { attributes, .. } => {
            let pairs: Vec<(&str, &str)> = attributes
                .iter()
                .map(|a| (a.name.as_str(), a.value.as_str()))
                .collect();
            assert_eq!(pairs, [("a", "1"), ("b", "2"), ("c", "3")]);
        }
        other => panic!("expected StartTag token, got {other}"),
    }
}

#[test]
fn duplicate_attribute_first_wins() {
    let mut tokenizer = Tokenizer::new(r#"<div id="first" id="second">"#);
    tokenizer.run();
    let errors: Vec<_> = tokenizer.errors().iter().map(|e| e.kind).collect();
    assert!(errors.contains(&TokenizerErrorKind::DuplicateAttribute));
    let tokens = tokenizer.into_tokens();
    match &tokens[0] {
        Token::StartTag { attributes, .. } => {
            assert_eq!(attributes.len(), 1);
            assert_eq!(attributes[0].value, "first");
        }
        other => panic!("expected StartTag token, got {other}"),
    }
}

#[test]
fn named_entity_in_text() {
    let tokens = tokenize("a&amp;b");
    assert_eq!(text_of(&tokens), "a&b");
}

#[test]
fn legacy_entity_without_semicolon_in_text() {
    let tokens = tokenize("&amp");
    assert_eq!(text_of(&tokens), "&");
}

#[test]
fn entity_suppressed_in_attribute_before_equals() {
    // "&amp" followed by "=" inside an attribute value stays verbatim.
    let tokens = tokenize(r#"<a href="&amp=x">"#);
    match &tokens[0] {
        Token::StartTag { attributes, .. } => {
            assert_eq!(attributes[0].value, "&amp=x");
        }
        other => panic!("expected StartTag token, got {other}"),
    }
}

#[test]
fn entity_decoded_in_attribute_with_semicolon() {
    let tokens = tokenize(r#"<a href="a&amp;b">"#);
    match &tokens[0] {
        Token::StartTag { attributes, .. } => {
            assert_eq!(attributes[0].value, "a&b");
        }
        other => panic!("expected StartTag token, got {other}"),
    }
}

#[test]
fn numeric_entities() {
    let tokens = tokenize("&#65;&#x42;");
    assert_eq!(text_of(&tokens), "AB");
}

#[test]
fn numeric_entity_windows_1252_mapping() {
    let tokens = tokenize("&#128;");
    assert_eq!(text_of(&tokens), "\u{20AC}");
}

#[test]
fn carriage_returns_normalize_to_line_feeds() {
    let tokens = tokenize("a\r\nb\rc");
    assert_eq!(text_of(&tokens), "a\nb\nc");
}

#[test]
fn lone_carriage_return_at_eof() {
    let tokens = tokenize("a\r");
    assert_eq!(text_of(&tokens), "a\n");
}

#[test]
fn bom_is_discarded_by_default() {
    let tokens = tokenize("\u{FEFF}x");
    assert_eq!(text_of(&tokens), "x");

    let opts = TokenizerOptions {
        discard_bom: false,
        ..TokenizerOptions::default()
    };
    let tokens = tokenize_with("\u{FEFF}x", &opts);
    assert_eq!(text_of(&tokens), "\u{FEFF}x");
}

#[test]
fn rcdata_title_content_is_text() {
    let tokens = tokenize("<title>a<b>c</title>");
    assert_eq!(text_of(&tokens), "a<b>c");
    assert!(matches!(&tokens[0], Token::StartTag { name, .. } if name == "title"));
    assert!(
        tokens
            .iter()
            .any(|t| matches!(t, Token::EndTag { name, .. } if name == "title"))
    );
}

#[test]
fn rcdata_entities_still_decode() {
    let tokens = tokenize("<textarea>&lt;</textarea>");
    assert_eq!(text_of(&tokens), "<");
}

#[test]
fn rawtext_style_content_ignores_entities() {
    let tokens = tokenize("<style>&lt;</style>");
    assert_eq!(text_of(&tokens), "&lt;");
}

#[test]
fn rawtext_partial_end_tag_is_text() {
    let tokens = tokenize("<style>a</sty</style>");
    assert_eq!(text_of(&tokens), "a</sty");
}

#[test]
fn script_data_escape_machinery() {
    let tokens = tokenize("<script>x<!--y</script>");
    assert_eq!(text_of(&tokens), "x<!--y");
    assert!(
        tokens
            .iter()
            .any(|t| matches!(t, Token::EndTag { name, .. } if name == "script"))
    );
}

#[test]
fn script_data_double_escaped() {
    // Inside <!-- <script> ... --> the inner close tag is text.
    let tokens = tokenize("<script><!--<script></script>--></script>");
    assert_eq!(text_of(&tokens), "<!--<script></script>-->");
}

#[test]
fn plaintext_absorbs_everything() {
    let tokens = tokenize("<plaintext></plaintext><div>");
    assert_eq!(text_of(&tokens), "</plaintext><div>");
}

#[test]
fn cdata_outside_foreign_content_is_bogus_comment() {
    let mut tokenizer = Tokenizer::new("<![CDATA[x]]>");
    tokenizer.run();
    let errors: Vec<_> = tokenizer.errors().iter().map(|e| e.kind).collect();
    assert!(errors.contains(&TokenizerErrorKind::CdataInHtmlContent));
    let tokens = tokenizer.into_tokens();
    assert!(matches!(&tokens[0], Token::Comment { data } if data == "[CDATA[x]]"));
}

#[test]
fn cdata_in_foreign_content_is_text() {
    let mut tokenizer = Tokenizer::new("<![CDATA[x]]>");
    tokenizer.set_cdata_allowed(true);
    tokenizer.run();
    let tokens: Vec<Token> = tokenizer.into_tokens();
    assert_eq!(text_of(&tokens), "x");
}

#[test]
fn initial_state_override_for_tests() {
    let opts = TokenizerOptions {
        initial_state: Some(TokenizerState::RCDATA),
        initial_rawtext_tag: Some("title".to_string()),
        ..TokenizerOptions::default()
    };
    let tokens = tokenize_with("a</title>b", &opts);
    assert_eq!(text_of(&tokens), "ab");
    assert!(
        tokens
            .iter()
            .any(|t| matches!(t, Token::EndTag { name, .. } if name == "title"))
    );
}

#[test]
fn step_drives_tokens_lazily() {
    let mut tokenizer = Tokenizer::new("<p>x");
    let first = tokenizer.next_token();
    assert!(matches!(first, Some(Token::StartTag { .. })));
    let second = tokenizer.next_token();
    assert!(matches!(second, Some(Token::Character { data: 'x' })));
    assert!(matches!(tokenizer.next_token(), Some(Token::EndOfFile)));
    assert_eq!(tokenizer.next_token(), None);
}

#[test]
fn errors_carry_offsets() {
    let mut tokenizer = Tokenizer::new("a\0b");
    tokenizer.run();
    let errors = tokenizer.into_errors();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].kind, TokenizerErrorKind::UnexpectedNullCharacter);
    assert_eq!(errors[0].offset, 2);
}

#[test]
fn xml_coercion_rewrites_comments_and_codepoints() {
    let opts = TokenizerOptions {
        coerce_to_xml: true,
        ..TokenizerOptions::default()
    };
    let tokens = tokenize_with("<!--a--b-->\x0C", &opts);
    assert!(matches!(&tokens[0], Token::Comment { data } if data == "a- -b"));
    assert_eq!(text_of(&tokens), " ");
}

#[test]
fn end_tag_with_attributes_is_an_error() {
    let mut tokenizer = Tokenizer::new(r#"</div class="x">"#);
    tokenizer.run();
    let errors: Vec<_> = tokenizer.errors().iter().map(|e| e.kind).collect();
    assert!(errors.contains(&TokenizerErrorKind::EndTagWithAttributes));
}
