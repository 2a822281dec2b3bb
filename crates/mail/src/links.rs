//! Link hygiene for newsletter URLs.
//!
//! Newsletter links are wrapped in tracking parameters that make otherwise
//! identical URLs look distinct. Cleaning strips the tracking noise so the
//! digest can deduplicate and present stable links.

use url::Url;

/// Query parameters that carry tracking state, not content.
const TRACKING_PARAMS: &[&str] = &["fbclid", "gclid", "_ga", "ref", "source", "mc_cid", "mc_eid"];

fn is_tracking_param(name: &str) -> bool {
    name.starts_with("utm_") || TRACKING_PARAMS.contains(&name)
}

/// Normalize one URL: drop tracking params and the fragment, lowercase,
/// strip any trailing slash.
///
/// Returns `None` for strings that do not parse as absolute http(s) URLs.
fn clean_one(raw: &str) -> Option<String> {
    let mut url = Url::parse(raw).ok()?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return None;
    }

    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(name, _)| !is_tracking_param(name))
        .map(|(n, v)| (n.into_owned(), v.into_owned()))
        .collect();

    if kept.is_empty() {
        url.set_query(None);
    } else {
        url.query_pairs_mut().clear().extend_pairs(kept);
    }

    url.set_fragment(None);

    let cleaned = url.to_string().to_lowercase();
    Some(cleaned.trim_end_matches('/').to_string())
}

/// Clean a batch of URLs: normalize each, drop unparseable ones, dedupe,
/// and return them sorted.
pub fn clean_links(raw: &[String]) -> Vec<String> {
    let mut cleaned: Vec<String> = raw.iter().filter_map(|l| clean_one(l)).collect();
    cleaned.sort();
    cleaned.dedup();
    cleaned
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_utm_parameters() {
        let cleaned = clean_one("https://example.com/story?utm_source=news&utm_medium=email").unwrap();
        assert_eq!(cleaned, "https://example.com/story");
    }

    #[test]
    fn strips_known_tracking_params_keeps_content_params() {
        let cleaned = clean_one("https://example.com/a?id=42&fbclid=XYZ&gclid=ABC").unwrap();
        assert_eq!(cleaned, "https://example.com/a?id=42");
    }

    #[test]
    fn strips_fragment() {
        let cleaned = clean_one("https://example.com/page#section-3").unwrap();
        assert_eq!(cleaned, "https://example.com/page");
    }

    #[test]
    fn lowercases_result() {
        let cleaned = clean_one("https://Example.COM/Path").unwrap();
        assert_eq!(cleaned, "https://example.com/path");
    }

    #[test]
    fn trailing_slash_does_not_defeat_dedupe() {
        let raw = vec![
            "https://example.com/story/".to_string(),
            "https://example.com/story".to_string(),
        ];
        let cleaned = clean_links(&raw);
        assert_eq!(cleaned, vec!["https://example.com/story"]);
    }

    #[test]
    fn rejects_non_http_schemes() {
        assert!(clean_one("mailto:hi@example.com").is_none());
        assert!(clean_one("javascript:alert(1)").is_none());
        assert!(clean_one("not a url").is_none());
    }

    #[test]
    fn batch_dedupes_and_sorts() {
        let raw = vec![
            "https://b.com/x?utm_source=a".to_string(),
            "https://a.com/y".to_string(),
            "https://b.com/x?utm_campaign=z".to_string(),
        ];
        let cleaned = clean_links(&raw);
        assert_eq!(cleaned, vec!["https://a.com/y", "https://b.com/x"]);
    }

    #[test]
    fn batch_drops_unparseable_entries() {
        let raw = vec!["https://ok.com/".to_string(), "%%bad%%".to_string()];
        let cleaned = clean_links(&raw);
        assert_eq!(cleaned, vec!["https://ok.com"]);
    }
}
