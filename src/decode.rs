//! Body normalization applied before link matching
//!
//! Mail transport may fold long lines and escape bytes, which splits tokens
//! and mangles query strings. Normalizing first lets a single pattern match.

/// Remove soft line breaks, decode `=XX` escapes and unescape HTML entities
#[must_use]
pub fn normalize_body(body: &str) -> String {
    let unfolded = remove_soft_line_breaks(body);
    let decoded = decode_hex_escapes(&unfolded);
    unescape_html_entities(&decoded)
}

fn remove_soft_line_breaks(body: &str) -> String {
    body.replace("=\r\n", "").replace("=\n", "")
}

/// Decode quoted-printable `=XX` escapes; the hex digits must be uppercase
fn decode_hex_escapes(body: &str) -> String {
    let bytes = body.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());

    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'='
            && let (Some(hi), Some(lo)) = (
                bytes.get(i + 1).copied().and_then(upper_hex_value),
                bytes.get(i + 2).copied().and_then(upper_hex_value),
            )
        {
            out.push((hi << 4) | lo);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }

    String::from_utf8_lossy(&out).into_owned()
}

const fn upper_hex_value(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

fn unescape_html_entities(body: &str) -> String {
    body.replace("&quot;", "\"")
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
}
