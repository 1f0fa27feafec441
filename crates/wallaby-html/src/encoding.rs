//! Character encoding sniffing and byte decoding.
//!
//! [§ 13.2.3 The input byte stream](https://html.spec.whatwg.org/multipage/parsing.html#the-input-byte-stream)
//!
//! The encoding for a byte stream is resolved in priority order:
//!
//! 1. Transport-layer hint (e.g. a `Content-Type` charset parameter)
//! 2. Byte order mark
//! 3. `<meta>` prescan over the first part of the stream
//! 4. windows-1252 fallback
//!
//! Decoding itself is delegated to [`encoding_rs`].

use encoding_rs::{EUC_JP, Encoding, ISO_8859_2, UTF_8, UTF_16BE, UTF_16LE, WINDOWS_1252};

/// Prescan budget: at most this many non-comment bytes are examined.
const PRESCAN_CONTENT_LIMIT: usize = 1024;
/// Hard ceiling on total bytes walked during the prescan, comments included.
const PRESCAN_TOTAL_LIMIT: usize = 65536;

/// A resolved encoding, before byte decoding starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolvedEncoding {
    /// A concrete encoding.
    Exact(&'static Encoding),
    /// `utf-16` without a byte-order suffix: the decoder re-checks the
    /// stream for an embedded BOM and defaults to little-endian.
    Utf16BomSensitive,
}

/// The outcome of decoding a byte stream.
#[derive(Debug)]
pub struct DecodedInput {
    /// The decoded text, with any leading BOM removed.
    pub text: String,
    /// The encoding that was actually used.
    pub encoding: &'static Encoding,
}

/// Normalize an encoding label and resolve it to a supported encoding.
///
/// Accepts the common aliases (`utf8`, `latin1`, `cp1252`, `iso8859-2`,
/// ...) and folds UTF-7 to windows-1252. Returns `None` for labels this
/// parser does not recognize at all.
#[must_use]
pub fn resolve_label(label: &str) -> Option<ResolvedEncoding> {
    let normalized = label.trim_matches(|c: char| c.is_ascii_whitespace()).to_ascii_lowercase();
    let resolved = match normalized.as_str() {
        "utf-8" | "utf8" | "unicode-1-1-utf-8" | "unicode11utf8" | "unicode20utf8"
        | "x-unicode20utf8" => ResolvedEncoding::Exact(UTF_8),
        "utf-16" | "utf16" | "unicode" | "ucs-2" => ResolvedEncoding::Utf16BomSensitive,
        "utf-16le" | "utf16le" => ResolvedEncoding::Exact(UTF_16LE),
        "utf-16be" | "utf16be" => ResolvedEncoding::Exact(UTF_16BE),
        // UTF-7 is folded to windows-1252: it must never be honored.
        "utf-7" | "utf7" | "unicode-1-1-utf-7" | "csunicode11utf7" | "x-unicode-2-0-utf-7" => {
            ResolvedEncoding::Exact(WINDOWS_1252)
        }
        "windows-1252" | "cp1252" | "x-cp1252" | "latin1" | "latin-1" | "iso-8859-1"
        | "iso8859-1" | "iso_8859-1" | "iso88591" | "l1" | "ascii" | "us-ascii"
        | "ansi_x3.4-1968" | "cp819" | "ibm819" | "csisolatin1" => {
            ResolvedEncoding::Exact(WINDOWS_1252)
        }
        "iso-8859-2" | "iso8859-2" | "iso_8859-2" | "iso88592" | "latin2" | "l2"
        | "csisolatin2" => ResolvedEncoding::Exact(ISO_8859_2),
        "euc-jp" | "eucjp" | "x-euc-jp" | "cseucpkdfmtjapanese" => ResolvedEncoding::Exact(EUC_JP),
        _ => return None,
    };
    Some(resolved)
}

/// Resolve the encoding for `bytes`, returning the encoding choice and the
/// number of leading bytes (a BOM) to skip before decoding.
#[must_use]
pub fn sniff(bytes: &[u8], transport: Option<&str>) -> (ResolvedEncoding, usize) {
    // 1. Transport hint wins when its label is recognized.
    if let Some(label) = transport
        && let Some(resolved) = resolve_label(label)
    {
        log::debug!("encoding from transport hint: {label}");
        return (resolved, 0);
    }

    // 2. Byte order mark.
    if bytes.starts_with(&[0xEF, 0xBB, 0xBF]) {
        return (ResolvedEncoding::Exact(UTF_8), 3);
    }
    if bytes.starts_with(&[0xFF, 0xFE]) {
        return (ResolvedEncoding::Exact(UTF_16LE), 2);
    }
    if bytes.starts_with(&[0xFE, 0xFF]) {
        return (ResolvedEncoding::Exact(UTF_16BE), 2);
    }

    // 3. <meta> prescan.
    if let Some(resolved) = prescan(bytes) {
        return (resolved, 0);
    }

    // 4. Default.
    (ResolvedEncoding::Exact(WINDOWS_1252), 0)
}

/// Decode a byte stream to text, resolving the encoding first.
#[must_use]
pub fn decode_bytes(bytes: &[u8], transport: Option<&str>) -> DecodedInput {
    let (resolved, skip) = sniff(bytes, transport);
    let mut payload = &bytes[skip..];

    let encoding = match resolved {
        ResolvedEncoding::Exact(encoding) => encoding,
        ResolvedEncoding::Utf16BomSensitive => {
            // An embedded BOM picks the byte order; little-endian otherwise.
            if payload.starts_with(&[0xFE, 0xFF]) {
                payload = &payload[2..];
                UTF_16BE
            } else {
                if payload.starts_with(&[0xFF, 0xFE]) {
                    payload = &payload[2..];
                }
                UTF_16LE
            }
        }
    };

    let (text, had_errors) = encoding.decode_without_bom_handling(payload);
    if had_errors {
        log::warn!("malformed {} input replaced with U+FFFD", encoding.name());
    }

    DecodedInput {
        text: text.into_owned(),
        encoding,
    }
}

/// [§ 13.2.3.2 Determining the character encoding](https://html.spec.whatwg.org/multipage/parsing.html#prescan-a-byte-stream-to-determine-its-encoding)
///
/// Walk the first part of the stream looking for a `<meta>` charset
/// declaration, honoring comments, end tags, and quoted attribute values.
fn prescan(bytes: &[u8]) -> Option<ResolvedEncoding> {
    let mut scanner = Prescanner {
        bytes,
        pos: 0,
        content_budget: PRESCAN_CONTENT_LIMIT,
    };
    scanner.run()
}

struct Prescanner<'a> {
    bytes: &'a [u8],
    pos: usize,
    /// Remaining non-comment byte budget.
    content_budget: usize,
}

impl Prescanner<'_> {
    fn run(&mut self) -> Option<ResolvedEncoding> {
        while self.pos < self.bytes.len() && self.pos < PRESCAN_TOTAL_LIMIT {
            if self.content_budget == 0 {
                return None;
            }
            if self.starts_with(b"<!--") {
                self.skip_comment();
            } else if self.starts_with_meta() {
                if let Some(found) = self.scan_meta() {
                    return Some(found);
                }
            } else if self.starts_with_tag_like() {
                self.skip_tag();
            } else if self.starts_with(b"<!") || self.starts_with(b"</") || self.starts_with(b"<?")
            {
                self.skip_until(b'>');
            } else {
                self.advance_content(1);
            }
        }
        None
    }

    fn starts_with(&self, needle: &[u8]) -> bool {
        self.bytes[self.pos..].starts_with(needle)
    }

    fn starts_with_ignore_case(&self, needle: &[u8]) -> bool {
        let rest = &self.bytes[self.pos..];
        rest.len() >= needle.len()
            && rest[..needle.len()].eq_ignore_ascii_case(needle)
    }

    fn starts_with_meta(&self) -> bool {
        self.starts_with_ignore_case(b"<meta")
            && matches!(
                self.bytes.get(self.pos + 5),
                Some(b'\t' | b'\n' | b'\x0C' | b'\r' | b' ' | b'/')
            )
    }

    /// `<a`..`<z`, `<A`..`<Z`, or an end tag of the same shape.
    fn starts_with_tag_like(&self) -> bool {
        let rest = &self.bytes[self.pos..];
        match rest {
            [b'<', b'/', c, ..] | [b'<', c, ..] => c.is_ascii_alphabetic(),
            _ => false,
        }
    }

    fn advance_content(&mut self, n: usize) {
        self.pos += n;
        self.content_budget = self.content_budget.saturating_sub(n);
    }

    /// Skip `<!-- ... -->`. Comment bytes do not count against the
    /// content budget. An unterminated comment consumes the rest.
    fn skip_comment(&mut self) {
        self.advance_content(4);
        // "-->" may share dashes with the opener, so search from two bytes back.
        let search_from = self.pos.saturating_sub(2);
        if let Some(end) = find_subsequence(&self.bytes[search_from..], b"-->") {
            self.pos = search_from + end + 3;
        } else {
            self.pos = self.bytes.len();
        }
    }

    /// Skip a start or end tag, consuming attributes so that a `>` inside
    /// a quoted attribute value does not terminate the tag early.
    fn skip_tag(&mut self) {
        self.advance_content(1);
        if self.starts_with(b"/") {
            self.advance_content(1);
        }
        // Tag name.
        while self.pos < self.bytes.len() {
            let b = self.bytes[self.pos];
            if b.is_ascii_alphanumeric() {
                self.advance_content(1);
            } else {
                break;
            }
        }
        while self.get_attribute().is_some() {}
        if self.starts_with(b">") {
            self.advance_content(1);
        }
    }

    fn skip_until(&mut self, stop: u8) {
        while self.pos < self.bytes.len() {
            let b = self.bytes[self.pos];
            self.advance_content(1);
            if b == stop {
                break;
            }
        }
    }

    /// `<meta ...>`: collect attributes (first occurrence of each name
    /// wins) and apply the charset rules.
    fn scan_meta(&mut self) -> Option<ResolvedEncoding> {
        self.advance_content(5);
        let mut charset: Option<String> = None;
        let mut http_equiv: Option<String> = None;
        let mut content: Option<String> = None;

        while let Some((name, value)) = self.get_attribute() {
            match name.as_str() {
                "charset" if charset.is_none() => charset = Some(value),
                "http-equiv" if http_equiv.is_none() => http_equiv = Some(value),
                "content" if content.is_none() => content = Some(value),
                _ => {}
            }
        }
        if self.starts_with(b">") {
            self.advance_content(1);
        }

        let label = charset.or_else(|| {
            if http_equiv.as_deref() == Some("content-type") {
                content
                    .as_deref()
                    .and_then(extract_charset_from_content)
            } else {
                None
            }
        })?;

        let resolved = resolve_label(&label)?;
        log::debug!("encoding from <meta> prescan: {label}");

        // A UTF-16 declaration inside markup that the prescan could read
        // is necessarily wrong; treat it as UTF-8.
        match resolved {
            ResolvedEncoding::Utf16BomSensitive => Some(ResolvedEncoding::Exact(UTF_8)),
            ResolvedEncoding::Exact(e) if e == UTF_16LE || e == UTF_16BE => {
                Some(ResolvedEncoding::Exact(UTF_8))
            }
            other => Some(other),
        }
    }

    /// [§ 13.2.3.2](https://html.spec.whatwg.org/multipage/parsing.html#concept-get-attributes-when-sniffing)
    ///
    /// "Get an attribute": name and value lowercased, quote-aware, with
    /// unterminated constructs consuming to end of input.
    fn get_attribute(&mut self) -> Option<(String, String)> {
        // Skip whitespace and slashes.
        while self.pos < self.bytes.len()
            && matches!(
                self.bytes[self.pos],
                b'\t' | b'\n' | b'\x0C' | b'\r' | b' ' | b'/'
            )
        {
            self.advance_content(1);
        }
        if self.pos >= self.bytes.len() || self.bytes[self.pos] == b'>' {
            return None;
        }

        let mut name = String::new();
        let mut value = String::new();

        // Attribute name.
        loop {
            if self.pos >= self.bytes.len() {
                return Some((name, value));
            }
            let b = self.bytes[self.pos];
            match b {
                b'=' if !name.is_empty() => {
                    self.advance_content(1);
                    break;
                }
                b'\t' | b'\n' | b'\x0C' | b'\r' | b' ' => {
                    // Spaces before a possible '='.
                    while self.pos < self.bytes.len()
                        && matches!(
                            self.bytes[self.pos],
                            b'\t' | b'\n' | b'\x0C' | b'\r' | b' '
                        )
                    {
                        self.advance_content(1);
                    }
                    if self.pos < self.bytes.len() && self.bytes[self.pos] == b'=' {
                        self.advance_content(1);
                        break;
                    }
                    return Some((name, value));
                }
                b'/' | b'>' => return Some((name, value)),
                _ => {
                    name.push(b.to_ascii_lowercase() as char);
                    self.advance_content(1);
                }
            }
        }

        // Skip whitespace after '='.
        while self.pos < self.bytes.len()
            && matches!(
                self.bytes[self.pos],
                b'\t' | b'\n' | b'\x0C' | b'\r' | b' '
            )
        {
            self.advance_content(1);
        }
        if self.pos >= self.bytes.len() {
            return Some((name, value));
        }

        // Attribute value.
        match self.bytes[self.pos] {
            quote @ (b'"' | b'\'') => {
                self.advance_content(1);
                while self.pos < self.bytes.len() && self.bytes[self.pos] != quote {
                    value.push(self.bytes[self.pos].to_ascii_lowercase() as char);
                    self.advance_content(1);
                }
                if self.pos < self.bytes.len() {
                    self.advance_content(1);
                }
            }
            b'>' => {}
            _ => {
                while self.pos < self.bytes.len()
                    && !matches!(
                        self.bytes[self.pos],
                        b'\t' | b'\n' | b'\x0C' | b'\r' | b' ' | b'>'
                    )
                {
                    value.push(self.bytes[self.pos].to_ascii_lowercase() as char);
                    self.advance_content(1);
                }
            }
        }
        Some((name, value))
    }
}

/// [§ 13.2.3.3](https://html.spec.whatwg.org/multipage/parsing.html#algorithm-for-extracting-a-character-encoding-from-a-meta-element)
///
/// Extract a charset label from a `content="text/html; charset=..."`
/// attribute value. The value arrives already lowercased.
fn extract_charset_from_content(content: &str) -> Option<String> {
    let idx = content.find("charset")?;
    let mut rest = content[idx + "charset".len()..].trim_start();
    rest = rest.strip_prefix('=')?.trim_start();

    let label = match rest.chars().next()? {
        quote @ ('"' | '\'') => {
            let inner = &rest[1..];
            let end = inner.find(quote)?;
            &inner[..end]
        }
        _ => rest
            .split(|c: char| c.is_ascii_whitespace() || c == ';')
            .next()?,
    };
    if label.is_empty() {
        None
    } else {
        Some(label.to_string())
    }
}

fn find_subsequence(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}
