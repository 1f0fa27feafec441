//! Tests for the lazy event stream adapter.

use wallaby_html::{Event, TokenizerOptions, events};

fn collect(input: &str) -> Vec<Event> {
    events(input, &TokenizerOptions::default()).collect()
}

#[test]
fn basic_event_sequence() {
    let got = collect("a<b>c</b>");
    assert_eq!(got.len(), 4);
    assert_eq!(got[0], Event::Text("a".to_string()));
    assert!(matches!(&got[1], Event::Start { name, .. } if name == "b"));
    assert_eq!(got[2], Event::Text("c".to_string()));
    assert!(matches!(&got[3], Event::End { name } if name == "b"));
}

#[test]
fn adjacent_characters_coalesce() {
    let got = collect("one two three");
    assert_eq!(got, [Event::Text("one two three".to_string())]);
}

#[test]
fn entities_decode_into_text_events() {
    let got = collect("a&amp;b");
    assert_eq!(got, [Event::Text("a&b".to_string())]);
}

#[test]
fn comment_and_doctype_events() {
    let got = collect("<!DOCTYPE html><!--note-->x");
    assert!(matches!(
        &got[0],
        Event::Doctype { name: Some(name), .. } if name == "html"
    ));
    assert_eq!(got[1], Event::Comment("note".to_string()));
    assert_eq!(got[2], Event::Text("x".to_string()));
}

#[test]
fn start_tag_attributes_and_self_closing() {
    let got = collect(r#"<img src="x"/>"#);
    match &got[0] {
        Event::Start {
            name,
            attrs,
            self_closing,
        } => {
            assert_eq!(name, "img");
            assert_eq!(attrs[0].name, "src");
            assert_eq!(attrs[0].value, "x");
            assert!(self_closing);
        }
        other => panic!("expected start event, got {other:?}"),
    }
}

#[test]
fn rcdata_elements_stream_as_text() {
    let got = collect("<title>a<b>c</title>");
    assert!(matches!(&got[0], Event::Start { name, .. } if name == "title"));
    assert_eq!(got[1], Event::Text("a<b>c".to_string()));
    assert!(matches!(&got[2], Event::End { name } if name == "title"));
}

#[test]
fn trailing_text_flushes_at_eof() {
    let got = collect("<br>tail");
    assert!(matches!(&got[0], Event::Start { name, .. } if name == "br"));
    assert_eq!(got[1], Event::Text("tail".to_string()));
}

#[test]
fn iteration_is_lazy() {
    let mut stream = events("a<b>", &TokenizerOptions::default());
    assert_eq!(stream.next(), Some(Event::Text("a".to_string())));
    assert!(matches!(stream.next(), Some(Event::Start { .. })));
    assert_eq!(stream.next(), None);
}

#[test]
fn errors_surface_after_exhaustion() {
    let mut stream = events("a\0b", &TokenizerOptions::default());
    while stream.next().is_some() {}
    assert!(!stream.into_errors().is_empty());
}
