use std::borrow::Cow;

/// Ellipsis string used for truncation
const ELLIPSIS: &str = "...";

/// Strips HTML tags from a string and decodes the handful of entities that
/// commonly appear in feed content, collapsing runs of whitespace.
///
/// This is not an HTML parser — feed descriptions are small and the output
/// only feeds the short-summary field, so simple tag scanning is enough.
/// Unterminated tags are dropped to the end of input rather than echoed.
pub fn strip_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.char_indices();

    while let Some((i, c)) = chars.next() {
        if c == '<' {
            // Skip to the closing '>' (or end of input for unterminated tags)
            match s[i..].find('>') {
                Some(end) => {
                    // Re-sync the iterator past the tag
                    for _ in s[i + 1..i + end + 1].chars() {
                        chars.next();
                    }
                    // Tags usually separate words; keep them separated
                    out.push(' ');
                }
                None => break,
            }
        } else {
            out.push(c);
        }
    }

    let decoded = out
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&nbsp;", " ");

    // Collapse whitespace runs introduced by markup removal
    let mut collapsed = String::with_capacity(decoded.len());
    let mut last_was_space = true; // also trims leading whitespace
    for c in decoded.chars() {
        if c.is_whitespace() {
            if !last_was_space {
                collapsed.push(' ');
            }
            last_was_space = true;
        } else {
            collapsed.push(c);
            last_was_space = false;
        }
    }
    while collapsed.ends_with(' ') {
        collapsed.pop();
    }
    collapsed
}

/// Truncates a string to at most `max_chars` characters, appending "..."
/// when anything was cut. Cuts on a char boundary, never mid-codepoint.
///
/// Returns `Cow::Borrowed` when the string already fits (no allocation).
pub fn truncate_chars(s: &str, max_chars: usize) -> Cow<'_, str> {
    if max_chars == 0 {
        return Cow::Borrowed("");
    }

    match s.char_indices().nth(max_chars) {
        None => Cow::Borrowed(s),
        Some((byte_end, _)) => {
            let mut out = s[..byte_end].trim_end().to_string();
            out.push_str(ELLIPSIS);
            Cow::Owned(out)
        }
    }
}
