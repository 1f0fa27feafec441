//! Doctype-driven quirks mode classification.
//!
//! [§ 13.2.6.4.1 The "initial" insertion mode](https://html.spec.whatwg.org/multipage/parsing.html#the-initial-insertion-mode)
//!
//! The doctype token's name, public identifier, and system identifier are
//! matched (ASCII case-insensitively) against the constant tables below to
//! pick one of the three document modes.

/// "A Document is always set to one of three modes: no-quirks mode, the
/// default; quirks mode...; and limited-quirks mode."
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QuirksMode {
    /// The default mode.
    #[default]
    NoQuirks,
    /// A small set of legacy layout behaviors.
    LimitedQuirks,
    /// Full legacy compatibility mode.
    Quirks,
}

/// Public identifiers whose prefix forces quirks mode.
const QUIRKY_PUBLIC_ID_PREFIXES: &[&str] = &[
    "+//silmaril//dtd html pro v0r11 19970101//",
    "-//as//dtd html 3.0 aswedit + extensions//",
    "-//advasoft ltd//dtd html 3.0 aswedit + extensions//",
    "-//ietf//dtd html 2.0 level 1//",
    "-//ietf//dtd html 2.0 level 2//",
    "-//ietf//dtd html 2.0 strict level 1//",
    "-//ietf//dtd html 2.0 strict level 2//",
    "-//ietf//dtd html 2.0 strict//",
    "-//ietf//dtd html 2.0//",
    "-//ietf//dtd html 2.1e//",
    "-//ietf//dtd html 3.0//",
    "-//ietf//dtd html 3.2 final//",
    "-//ietf//dtd html 3.2//",
    "-//ietf//dtd html 3//",
    "-//ietf//dtd html level 0//",
    "-//ietf//dtd html level 1//",
    "-//ietf//dtd html level 2//",
    "-//ietf//dtd html level 3//",
    "-//ietf//dtd html strict level 0//",
    "-//ietf//dtd html strict level 1//",
    "-//ietf//dtd html strict level 2//",
    "-//ietf//dtd html strict level 3//",
    "-//ietf//dtd html strict//",
    "-//ietf//dtd html//",
    "-//metrius//dtd metrius presentational//",
    "-//microsoft//dtd internet explorer 2.0 html strict//",
    "-//microsoft//dtd internet explorer 2.0 html//",
    "-//microsoft//dtd internet explorer 2.0 tables//",
    "-//microsoft//dtd internet explorer 3.0 html strict//",
    "-//microsoft//dtd internet explorer 3.0 html//",
    "-//microsoft//dtd internet explorer 3.0 tables//",
    "-//netscape comm. corp.//dtd html//",
    "-//netscape comm. corp.//dtd strict html//",
    "-//o'reilly and associates//dtd html 2.0//",
    "-//o'reilly and associates//dtd html extended 1.0//",
    "-//o'reilly and associates//dtd html extended relaxed 1.0//",
    "-//sq//dtd html 2.0 hotmetal + extensions//",
    "-//softquad software//dtd hotmetal pro 6.0::19990601::extensions to html 4.0//",
    "-//softquad//dtd hotmetal pro 4.0::19971010::extensions to html 4.0//",
    "-//spyglass//dtd html 2.0 extended//",
    "-//sun microsystems corp.//dtd hotjava html//",
    "-//sun microsystems corp.//dtd hotjava strict html//",
    "-//w3c//dtd html 3 1995-03-24//",
    "-//w3c//dtd html 3.2 draft//",
    "-//w3c//dtd html 3.2 final//",
    "-//w3c//dtd html 3.2//",
    "-//w3c//dtd html 3.2s draft//",
    "-//w3c//dtd html 4.0 frameset//",
    "-//w3c//dtd html 4.0 transitional//",
    "-//w3c//dtd html experimental 19960712//",
    "-//w3c//dtd html experimental 970421//",
    "-//w3c//dtd w3 html//",
    "-//w3o//dtd w3 html 3.0//",
    "-//webtechs//dtd mozilla html 2.0//",
    "-//webtechs//dtd mozilla html//",
];

/// Public identifiers that force quirks mode only on exact match.
const QUIRKY_PUBLIC_IDS: &[&str] = &[
    "-//w3o//dtd w3 html strict 3.0//en//",
    "-/w3c/dtd html 4.0 transitional/en",
    "html",
];

/// System identifiers that force quirks mode on exact match.
const QUIRKY_SYSTEM_IDS: &[&str] =
    &["http://www.ibm.com/data/dtd/v11/ibmxhtml1-transitional.dtd"];

/// Public identifier prefixes that force quirks mode only when the system
/// identifier is missing.
const QUIRKY_PUBLIC_ID_PREFIXES_MISSING_SYSTEM: &[&str] = &[
    "-//w3c//dtd html 4.01 frameset//",
    "-//w3c//dtd html 4.01 transitional//",
];

/// Public identifier prefixes that select limited-quirks mode.
const LIMITED_QUIRKY_PUBLIC_ID_PREFIXES: &[&str] = &[
    "-//w3c//dtd xhtml 1.0 frameset//",
    "-//w3c//dtd xhtml 1.0 transitional//",
];

/// Classify a doctype into a [`QuirksMode`].
///
/// `iframe_srcdoc` documents are always no-quirks, regardless of doctype.
#[must_use]
pub fn classify_doctype(
    name: Option<&str>,
    public_id: Option<&str>,
    system_id: Option<&str>,
    force_quirks: bool,
    iframe_srcdoc: bool,
) -> QuirksMode {
    if iframe_srcdoc {
        return QuirksMode::NoQuirks;
    }

    let public = public_id.map(str::to_ascii_lowercase);
    let system = system_id.map(str::to_ascii_lowercase);
    let public = public.as_deref();
    let system = system.as_deref();

    if force_quirks
        || name != Some("html")
        || public.is_some_and(|p| QUIRKY_PUBLIC_IDS.contains(&p))
        || public.is_some_and(|p| {
            QUIRKY_PUBLIC_ID_PREFIXES
                .iter()
                .any(|prefix| p.starts_with(prefix))
        })
        || system.is_some_and(|s| QUIRKY_SYSTEM_IDS.contains(&s))
        || (system.is_none()
            && public.is_some_and(|p| {
                QUIRKY_PUBLIC_ID_PREFIXES_MISSING_SYSTEM
                    .iter()
                    .any(|prefix| p.starts_with(prefix))
            }))
    {
        return QuirksMode::Quirks;
    }

    if public.is_some_and(|p| {
        LIMITED_QUIRKY_PUBLIC_ID_PREFIXES
            .iter()
            .any(|prefix| p.starts_with(prefix))
    }) || (system.is_some()
        && public.is_some_and(|p| {
            QUIRKY_PUBLIC_ID_PREFIXES_MISSING_SYSTEM
                .iter()
                .any(|prefix| p.starts_with(prefix))
        }))
    {
        return QuirksMode::LimitedQuirks;
    }

    QuirksMode::NoQuirks
}
