//! XML helpers shared by the SOAP-speaking crates.
//!
//! The Salesforce SOAP responses this library consumes are flat and
//! predictable, so values are pulled out with plain string scanning rather
//! than a full XML parser. Helpers tolerate namespace prefixes (`sf:`,
//! `met:`, `tns:`, ...) on element names.
//!
//! All user-provided values placed into request envelopes MUST go through
//! [`escape`] to prevent XML injection.

/// Escape a string for safe inclusion in XML content.
///
/// Escapes the five predefined XML entities.
///
/// # Example
///
/// ```rust
/// use forcepack_client::xml;
///
/// let safe = xml::escape("Hello <World> & 'Friends'");
/// assert_eq!(safe, "Hello &lt;World&gt; &amp; &apos;Friends&apos;");
/// ```
#[must_use]
pub fn escape(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len() + 16);
    for ch in value.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

/// Reverse of [`escape`] for values extracted from response bodies.
#[must_use]
pub fn unescape(value: &str) -> String {
    value
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

/// Locate the next opening `<tag>` or `<prefix:tag>`, returning the byte
/// offset just past the `>` and the qualified name as it appeared.
fn find_open(xml: &str, tag: &str) -> Option<(usize, String)> {
    let plain = format!("<{tag}>");
    let plain_hit = xml.find(&plain).map(|i| (i + plain.len(), tag.to_string()));

    let needle = format!(":{tag}>");
    let mut prefixed_hit = None;
    let mut from = 0;
    while let Some(rel) = xml[from..].find(&needle) {
        let idx = from + rel;
        if let Some(lt) = xml[..idx].rfind('<') {
            let prefix = &xml[lt + 1..idx];
            if !prefix.is_empty()
                && prefix.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
            {
                prefixed_hit = Some((idx + needle.len(), format!("{prefix}:{tag}")));
                break;
            }
        }
        from = idx + needle.len();
    }

    match (plain_hit, prefixed_hit) {
        (Some(a), Some(b)) => Some(if a.0 <= b.0 { a } else { b }),
        (Some(a), None) => Some(a),
        (None, Some(b)) => Some(b),
        (None, None) => None,
    }
}

/// Extract the text content of the first occurrence of `tag`.
///
/// Entity references in the content are unescaped. Returns `None` when the
/// element is absent or unterminated.
#[must_use]
pub fn extract_tag(xml: &str, tag: &str) -> Option<String> {
    let (start, qualified) = find_open(xml, tag)?;
    let close = format!("</{qualified}>");
    let rest = &xml[start..];
    rest.find(&close).map(|end| unescape(&rest[..end]))
}

/// Extract the text content of every occurrence of `tag`, in document order.
#[must_use]
pub fn extract_all_tags(xml: &str, tag: &str) -> Vec<String> {
    let mut values = Vec::new();
    let mut rest = xml;
    while let Some((start, qualified)) = find_open(rest, tag) {
        let close = format!("</{qualified}>");
        let after = &rest[start..];
        match after.find(&close) {
            Some(end) => {
                values.push(unescape(&after[..end]));
                rest = &after[end + close.len()..];
            }
            None => break,
        }
    }
    values
}

/// Extract the inner XML of every `<tag>...</tag>` block, in document order.
///
/// Unlike [`extract_all_tags`] the content is returned raw (not unescaped),
/// so nested elements can be picked apart with further `extract_*` calls.
#[must_use]
pub fn extract_blocks<'a>(xml: &'a str, tag: &str) -> Vec<&'a str> {
    let mut blocks = Vec::new();
    let mut rest = xml;
    while let Some((start, qualified)) = find_open(rest, tag) {
        let close = format!("</{qualified}>");
        let after = &rest[start..];
        match after.find(&close) {
            Some(end) => {
                blocks.push(&after[..end]);
                rest = &after[end + close.len()..];
            }
            None => break,
        }
    }
    blocks
}

/// Extract a boolean element, defaulting to `false` when absent.
#[must_use]
pub fn extract_bool(xml: &str, tag: &str) -> bool {
    extract_tag(xml, tag).map(|s| s == "true").unwrap_or(false)
}

/// Extract a numeric element, defaulting to zero when absent or unparsable.
#[must_use]
pub fn extract_u32(xml: &str, tag: &str) -> u32 {
    extract_tag(xml, tag)
        .and_then(|s| s.parse().ok())
        .unwrap_or(0)
}
