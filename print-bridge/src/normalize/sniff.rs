//! Content sniffing for string receipts

use std::sync::LazyLock;

use regex::Regex;
use shared::PayloadKind;

static DATA_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^data:([a-zA-Z0-9.+-]+/[a-zA-Z0-9.+-]+);base64,(.*)$")
        .expect("data url pattern is valid")
});

static MARKUP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)<\s*(html|body|div|span|table|section|p|br|img|svg|style|head|meta|title)\b")
        .expect("markup pattern is valid")
});

/// Base64 text prefixes of known binary formats
const BASE64_MAGIC: &[(&str, PayloadKind, &str)] = &[
    ("JVBERi0", PayloadKind::Pdf, "application/pdf"),
    ("iVBOR", PayloadKind::Image, "image/png"),
    ("/9j", PayloadKind::Image, "image/jpeg"),
    ("R0lG", PayloadKind::Image, "image/gif"),
    ("UklGR", PayloadKind::Image, "image/webp"),
    // "BM" then the size byte's high bits
    ("Qk0", PayloadKind::Image, "image/bmp"),
    ("Qk1", PayloadKind::Image, "image/bmp"),
    ("Qk2", PayloadKind::Image, "image/bmp"),
    ("Qk3", PayloadKind::Image, "image/bmp"),
];

/// Classification of a receipt string
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sniffed<'a> {
    /// Base64 binary, data-URL prefix already stripped
    Binary {
        kind: PayloadKind,
        mime: &'a str,
        data: &'a str,
    },
    /// Markup to send through the renderer
    Markup,
    /// Nothing recognizable
    Unknown,
}

/// Split `data:<mime>;base64,<data>` into mime and data
pub fn split_data_url(input: &str) -> Option<(&str, &str)> {
    let caps = DATA_URL.captures(input)?;
    let mime = caps.get(1)?.as_str();
    let data = caps.get(2)?.as_str();
    Some((mime, data))
}

/// Remove a data-URL prefix, if any
pub fn strip_data_url(input: &str) -> &str {
    split_data_url(input).map(|(_, data)| data).unwrap_or(input)
}

fn magic(data: &str) -> Option<(PayloadKind, &'static str)> {
    BASE64_MAGIC
        .iter()
        .find(|(prefix, _, _)| data.starts_with(prefix))
        .map(|(_, kind, mime)| (*kind, *mime))
}

pub fn sniff(input: &str) -> Sniffed<'_> {
    if let Some((declared, data)) = split_data_url(input) {
        let declared_lower = declared.to_ascii_lowercase();
        // Magic wins over the declared mime so prefixed and bare input agree
        if let Some((kind, mime)) = magic(data) {
            return Sniffed::Binary { kind, mime, data };
        }
        if declared_lower.starts_with("image/") {
            return Sniffed::Binary {
                kind: PayloadKind::Image,
                mime: declared,
                data,
            };
        }
        if declared_lower == "application/pdf" {
            return Sniffed::Binary {
                kind: PayloadKind::Pdf,
                mime: declared,
                data,
            };
        }
        return Sniffed::Unknown;
    }

    if let Some((kind, mime)) = magic(input) {
        return Sniffed::Binary {
            kind,
            mime,
            data: input,
        };
    }
    if MARKUP.is_match(input) {
        return Sniffed::Markup;
    }
    Sniffed::Unknown
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_data_url() {
        assert_eq!(
            split_data_url("data:image/png;base64,iVBORw0KGgo="),
            Some(("image/png", "iVBORw0KGgo="))
        );
        assert_eq!(split_data_url("iVBORw0KGgo="), None);
        assert_eq!(strip_data_url("data:image/jpeg;base64,/9j/4A"), "/9j/4A");
    }

    #[test]
    fn test_magic_prefixes() {
        let cases = [
            ("JVBERi0xLjQK", PayloadKind::Pdf, "application/pdf"),
            ("iVBORw0KGgo=", PayloadKind::Image, "image/png"),
            ("/9j/4AAQ", PayloadKind::Image, "image/jpeg"),
            ("R0lGODlh", PayloadKind::Image, "image/gif"),
            ("UklGRiQA", PayloadKind::Image, "image/webp"),
            ("Qk02AAAA", PayloadKind::Image, "image/bmp"),
        ];
        for (input, kind, mime) in cases {
            assert_eq!(
                sniff(input),
                Sniffed::Binary {
                    kind,
                    mime,
                    data: input
                },
                "{input}"
            );
        }
    }

    #[test]
    fn test_data_url_mime_follows_magic() {
        assert_eq!(
            sniff("data:image/jpg;base64,/9j/4AAQ"),
            Sniffed::Binary {
                kind: PayloadKind::Image,
                mime: "image/jpeg",
                data: "/9j/4AAQ"
            }
        );
        assert_eq!(
            sniff("data:image/x-icon;base64,AAABAA=="),
            Sniffed::Binary {
                kind: PayloadKind::Image,
                mime: "image/x-icon",
                data: "AAABAA=="
            }
        );
        assert_eq!(sniff("data:text/plain;base64,aGk="), Sniffed::Unknown);
    }

    #[test]
    fn test_markup() {
        assert_eq!(sniff("<div class=\"receipt\">Total</div>"), Sniffed::Markup);
        assert_eq!(sniff("  < TABLE><tr></tr></TABLE>"), Sniffed::Markup);
        assert_eq!(sniff("Total: 12.50 <3"), Sniffed::Unknown);
        assert_eq!(sniff("<pre>not listed</pre>"), Sniffed::Unknown);
    }
}
