//! Named character reference lookup table.
//!
//! [§ 13.2.5.73 Named character reference state](https://html.spec.whatwg.org/multipage/parsing.html#named-character-reference-state)
//!
//! The full WHATWG table defines 2,231 entities and is treated as an
//! external data dependency; this module ships the working subset plus the
//! complete legacy (no-semicolon) allowlist, which is load-bearing for the
//! "historical" attribute rules.

use std::collections::HashMap;
use std::sync::LazyLock;

/// The legacy entities that may appear without a trailing semicolon.
///
/// "The ampersand may be followed by one of the names given in the named
/// character references section, using the case-sensitive matching...
/// certain names can additionally be written without the final semicolon."
///
/// Each name here is registered both bare and with a `;` suffix.
const LEGACY_ENTITIES: &[(&str, &str)] = &[
    ("AElig", "\u{C6}"),
    ("AMP", "&"),
    ("Aacute", "\u{C1}"),
    ("Acirc", "\u{C2}"),
    ("Agrave", "\u{C0}"),
    ("Aring", "\u{C5}"),
    ("Atilde", "\u{C3}"),
    ("Auml", "\u{C4}"),
    ("COPY", "\u{A9}"),
    ("Ccedil", "\u{C7}"),
    ("ETH", "\u{D0}"),
    ("Eacute", "\u{C9}"),
    ("Ecirc", "\u{CA}"),
    ("Egrave", "\u{C8}"),
    ("Euml", "\u{CB}"),
    ("GT", ">"),
    ("Iacute", "\u{CD}"),
    ("Icirc", "\u{CE}"),
    ("Igrave", "\u{CC}"),
    ("Iuml", "\u{CF}"),
    ("LT", "<"),
    ("Ntilde", "\u{D1}"),
    ("Oacute", "\u{D3}"),
    ("Ocirc", "\u{D4}"),
    ("Ograve", "\u{D2}"),
    ("Oslash", "\u{D8}"),
    ("Otilde", "\u{D5}"),
    ("Ouml", "\u{D6}"),
    ("QUOT", "\""),
    ("REG", "\u{AE}"),
    ("THORN", "\u{DE}"),
    ("Uacute", "\u{DA}"),
    ("Ucirc", "\u{DB}"),
    ("Ugrave", "\u{D9}"),
    ("Uuml", "\u{DC}"),
    ("Yacute", "\u{DD}"),
    ("aacute", "\u{E1}"),
    ("acirc", "\u{E2}"),
    ("acute", "\u{B4}"),
    ("aelig", "\u{E6}"),
    ("agrave", "\u{E0}"),
    ("amp", "&"),
    ("aring", "\u{E5}"),
    ("atilde", "\u{E3}"),
    ("auml", "\u{E4}"),
    ("brvbar", "\u{A6}"),
    ("ccedil", "\u{E7}"),
    ("cedil", "\u{B8}"),
    ("cent", "\u{A2}"),
    ("copy", "\u{A9}"),
    ("curren", "\u{A4}"),
    ("deg", "\u{B0}"),
    ("divide", "\u{F7}"),
    ("eacute", "\u{E9}"),
    ("ecirc", "\u{EA}"),
    ("egrave", "\u{E8}"),
    ("eth", "\u{F0}"),
    ("euml", "\u{EB}"),
    ("frac12", "\u{BD}"),
    ("frac14", "\u{BC}"),
    ("frac34", "\u{BE}"),
    ("gt", ">"),
    ("iacute", "\u{ED}"),
    ("icirc", "\u{EE}"),
    ("iexcl", "\u{A1}"),
    ("igrave", "\u{EC}"),
    ("iquest", "\u{BF}"),
    ("iuml", "\u{EF}"),
    ("laquo", "\u{AB}"),
    ("lt", "<"),
    ("macr", "\u{AF}"),
    ("micro", "\u{B5}"),
    ("middot", "\u{B7}"),
    ("nbsp", "\u{A0}"),
    ("not", "\u{AC}"),
    ("ntilde", "\u{F1}"),
    ("oacute", "\u{F3}"),
    ("ocirc", "\u{F4}"),
    ("ograve", "\u{F2}"),
    ("ordf", "\u{AA}"),
    ("ordm", "\u{BA}"),
    ("oslash", "\u{F8}"),
    ("otilde", "\u{F5}"),
    ("ouml", "\u{F6}"),
    ("para", "\u{B6}"),
    ("plusmn", "\u{B1}"),
    ("pound", "\u{A3}"),
    ("quot", "\""),
    ("raquo", "\u{BB}"),
    ("reg", "\u{AE}"),
    ("sect", "\u{A7}"),
    ("shy", "\u{AD}"),
    ("sup1", "\u{B9}"),
    ("sup2", "\u{B2}"),
    ("sup3", "\u{B3}"),
    ("szlig", "\u{DF}"),
    ("thorn", "\u{FE}"),
    ("times", "\u{D7}"),
    ("uacute", "\u{FA}"),
    ("ucirc", "\u{FB}"),
    ("ugrave", "\u{F9}"),
    ("uml", "\u{A8}"),
    ("uuml", "\u{FC}"),
    ("yacute", "\u{FD}"),
    ("yen", "\u{A5}"),
    ("yuml", "\u{FF}"),
];

/// Entities that require the trailing semicolon.
const SEMICOLON_ENTITIES: &[(&str, &str)] = &[
    ("Alpha", "\u{391}"),
    ("Beta", "\u{392}"),
    ("Dagger", "\u{2021}"),
    ("Delta", "\u{394}"),
    ("Epsilon", "\u{395}"),
    ("Gamma", "\u{393}"),
    ("Lambda", "\u{39B}"),
    ("OElig", "\u{152}"),
    ("Omega", "\u{3A9}"),
    ("Phi", "\u{3A6}"),
    ("Pi", "\u{3A0}"),
    ("Prime", "\u{2033}"),
    ("Psi", "\u{3A8}"),
    ("Scaron", "\u{160}"),
    ("Sigma", "\u{3A3}"),
    ("Theta", "\u{398}"),
    ("Xi", "\u{39E}"),
    ("Yuml", "\u{178}"),
    ("alpha", "\u{3B1}"),
    ("and", "\u{2227}"),
    ("ang", "\u{2220}"),
    ("apos", "'"),
    ("asymp", "\u{2248}"),
    ("bdquo", "\u{201E}"),
    ("beta", "\u{3B2}"),
    ("bull", "\u{2022}"),
    ("cap", "\u{2229}"),
    ("chi", "\u{3C7}"),
    ("circ", "\u{2C6}"),
    ("clubs", "\u{2663}"),
    ("cong", "\u{2245}"),
    ("cup", "\u{222A}"),
    ("dagger", "\u{2020}"),
    ("darr", "\u{2193}"),
    ("delta", "\u{3B4}"),
    ("diams", "\u{2666}"),
    ("empty", "\u{2205}"),
    ("emsp", "\u{2003}"),
    ("ensp", "\u{2002}"),
    ("epsilon", "\u{3B5}"),
    ("equiv", "\u{2261}"),
    ("eta", "\u{3B7}"),
    ("euro", "\u{20AC}"),
    ("exist", "\u{2203}"),
    ("fjlig", "fj"),
    ("fnof", "\u{192}"),
    ("forall", "\u{2200}"),
    ("frasl", "\u{2044}"),
    ("gamma", "\u{3B3}"),
    ("ge", "\u{2265}"),
    ("harr", "\u{2194}"),
    ("hearts", "\u{2665}"),
    ("hellip", "\u{2026}"),
    ("infin", "\u{221E}"),
    ("int", "\u{222B}"),
    ("iota", "\u{3B9}"),
    ("isin", "\u{2208}"),
    ("kappa", "\u{3BA}"),
    ("lambda", "\u{3BB}"),
    ("lang", "\u{27E8}"),
    ("larr", "\u{2190}"),
    ("lceil", "\u{2308}"),
    ("ldquo", "\u{201C}"),
    ("le", "\u{2264}"),
    ("lfloor", "\u{230A}"),
    ("lowast", "\u{2217}"),
    ("loz", "\u{25CA}"),
    ("lrm", "\u{200E}"),
    ("lsaquo", "\u{2039}"),
    ("lsquo", "\u{2018}"),
    ("mdash", "\u{2014}"),
    ("minus", "\u{2212}"),
    ("mu", "\u{3BC}"),
    ("nabla", "\u{2207}"),
    ("ndash", "\u{2013}"),
    ("ne", "\u{2260}"),
    ("ni", "\u{220B}"),
    ("notin", "\u{2209}"),
    ("nsub", "\u{2284}"),
    ("nu", "\u{3BD}"),
    ("oelig", "\u{153}"),
    ("oline", "\u{203E}"),
    ("omega", "\u{3C9}"),
    ("oplus", "\u{2295}"),
    ("or", "\u{2228}"),
    ("otimes", "\u{2297}"),
    ("part", "\u{2202}"),
    ("permil", "\u{2030}"),
    ("perp", "\u{22A5}"),
    ("phi", "\u{3C6}"),
    ("pi", "\u{3C0}"),
    ("prime", "\u{2032}"),
    ("prod", "\u{220F}"),
    ("prop", "\u{221D}"),
    ("psi", "\u{3C8}"),
    ("radic", "\u{221A}"),
    ("rang", "\u{27E9}"),
    ("rarr", "\u{2192}"),
    ("rceil", "\u{2309}"),
    ("rdquo", "\u{201D}"),
    ("rfloor", "\u{230B}"),
    ("rho", "\u{3C1}"),
    ("rlm", "\u{200F}"),
    ("rsaquo", "\u{203A}"),
    ("rsquo", "\u{2019}"),
    ("sbquo", "\u{201A}"),
    ("scaron", "\u{161}"),
    ("sdot", "\u{22C5}"),
    ("sigma", "\u{3C3}"),
    ("sigmaf", "\u{3C2}"),
    ("sim", "\u{223C}"),
    ("spades", "\u{2660}"),
    ("sub", "\u{2282}"),
    ("sube", "\u{2286}"),
    ("sum", "\u{2211}"),
    ("sup", "\u{2283}"),
    ("supe", "\u{2287}"),
    ("tau", "\u{3C4}"),
    ("there4", "\u{2234}"),
    ("theta", "\u{3B8}"),
    ("thinsp", "\u{2009}"),
    ("tilde", "\u{2DC}"),
    ("trade", "\u{2122}"),
    ("uarr", "\u{2191}"),
    ("upsilon", "\u{3C5}"),
    ("xi", "\u{3BE}"),
    ("zeta", "\u{3B6}"),
    ("zwj", "\u{200D}"),
    ("zwnj", "\u{200C}"),
];

/// The named character reference table.
///
/// Keys are entity names without the leading `&`; legacy names appear both
/// bare and with the trailing semicolon, all others only with it.
static NAMED_ENTITIES: LazyLock<HashMap<String, &'static str>> = LazyLock::new(|| {
    let mut m = HashMap::new();
    for &(name, replacement) in SEMICOLON_ENTITIES {
        m.insert(format!("{name};"), replacement);
    }
    for &(name, replacement) in LEGACY_ENTITIES {
        m.insert(format!("{name};"), replacement);
        m.insert(name.to_string(), replacement);
    }
    m
});

/// Look up an entity name (without the leading `&`, with or without a
/// trailing `;`) and return its replacement text.
#[must_use]
pub fn lookup_entity(name: &str) -> Option<&'static str> {
    NAMED_ENTITIES.get(name).copied()
}

/// Whether any entity name starts with the given prefix. Used by the
/// tokenizer to decide when to stop consuming candidate characters.
#[must_use]
pub fn any_entity_has_prefix(prefix: &str) -> bool {
    NAMED_ENTITIES.keys().any(|name| name.starts_with(prefix))
}
/// Whether the name (without semicolon) is on the legacy no-semicolon
/// allowlist.
#[must_use]
pub fn is_legacy_entity(name: &str) -> bool {
    LEGACY_ENTITIES.iter().any(|&(legacy, _)| legacy == name)
}
