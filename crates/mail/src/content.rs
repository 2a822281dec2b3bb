//! HTML body extraction.
//!
//! Newsletters arrive as dense HTML. We reduce the body to readable plain
//! text for chunking and analysis, and harvest the hyperlinks separately so
//! they survive the text conversion.

use tracing::trace;

/// Render width for the HTML-to-text conversion.
const TEXT_WIDTH: usize = 120;

/// An email body reduced to analyzable form.
#[derive(Debug, Clone)]
pub struct EmailContent {
    /// Plain text, whitespace normalized
    pub text: String,
    /// All hyperlink targets found in the raw HTML, document order
    pub links: Vec<String>,
}

/// Convert an HTML email body to plain text plus its links.
///
/// Falls back to a naive tag strip if the HTML is too broken to parse.
pub fn extract_content(html: &str) -> EmailContent {
    let text = html2text::from_read(html.as_bytes(), TEXT_WIDTH)
        .unwrap_or_else(|_| strip_tags(html));
    let text = normalize_whitespace(&text);
    let links = harvest_links(html);

    trace!(chars = text.len(), links = links.len(), "Extracted email content");

    EmailContent { text, links }
}

/// Collapse runs of whitespace and drop blank lines.
fn normalize_whitespace(text: &str) -> String {
    text.lines()
        .map(|l| l.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Pull href targets out of raw HTML without a full DOM parse.
fn harvest_links(html: &str) -> Vec<String> {
    let mut links = Vec::new();
    let mut rest = html;

    while let Some(pos) = rest.find("href=") {
        rest = &rest[pos + 5..];
        let Some(quote) = rest.chars().next() else {
            break;
        };
        if quote != '"' && quote != '\'' {
            continue;
        }
        rest = &rest[1..];
        if let Some(end) = rest.find(quote) {
            let target = &rest[..end];
            if target.starts_with("http://") || target.starts_with("https://") {
                links.push(target.to_string());
            }
            rest = &rest[end..];
        } else {
            break;
        }
    }

    links
}

/// Last-resort tag removal for unparseable HTML.
fn strip_tags(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut in_tag = false;
    for ch in html.chars() {
        match ch {
            '<' => in_tag = true,
            '>' => in_tag = false,
            c if !in_tag => out.push(c),
            _ => {}
        }
    }
    out
}
