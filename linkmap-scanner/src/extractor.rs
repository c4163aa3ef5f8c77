//! Anchor link extraction from fetched HTML.

use crate::error::{Result, ScanError};
use crate::location::normalize;
use scraper::{Html, Selector};
use std::collections::BTreeSet;
use tracing::trace;
use url::Url;

/// Turns fetched content into the set of locations it links to.
pub trait LinkExtractor: Send + Sync {
    /// Parse `content` and return the other unique locations it links to.
    ///
    /// Relative links are made absolute against `source`. The returned
    /// locations are normalized, deduplicated and sorted.
    fn extract(&self, content: &[u8], source: &str) -> Result<Vec<String>>;
}

/// Extracts `<a href>` targets from an HTML document.
///
/// Client-rendered pages are not supported: only markup present in the
/// fetched bytes is seen. Links back to the page itself are dropped, though
/// the check is exact post-normalization equality so some forms slip by.
#[derive(Debug, Clone, Default)]
pub struct HtmlLinkExtractor;

impl HtmlLinkExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Hrefs that only point back at the current page.
    fn is_self_reference(href: &str) -> bool {
        href.is_empty() || href == "/" || href.starts_with('#')
    }
}

impl LinkExtractor for HtmlLinkExtractor {
    fn extract(&self, content: &[u8], source: &str) -> Result<Vec<String>> {
        let page_url = normalize(source);
        let base_url = Url::parse(&page_url).map_err(|e| {
            ScanError::InvalidLocation(format!("failed to parse base url {}: {}", page_url, e))
        })?;

        // html5ever recovers from any malformed markup, so a broken document
        // simply yields whatever anchors were recognised.
        let html = String::from_utf8_lossy(content);
        let document = Html::parse_document(&html);
        let link_selector = Selector::parse("a[href]")
            .map_err(|e| ScanError::ExtractionError(format!("invalid selector: {:?}", e)))?;

        let mut unique_links = BTreeSet::new();
        for element in document.select(&link_selector) {
            let Some(href) = element.value().attr("href") else {
                continue;
            };
            let href = href.trim();
            if Self::is_self_reference(href) {
                continue;
            }

            let absolute = base_url.join(href).map_err(|e| {
                ScanError::InvalidLocation(format!(
                    "failed to resolve {} against {}: {}",
                    href, page_url, e
                ))
            })?;

            let link = normalize(absolute.as_str());
            if link == page_url {
                continue;
            }

            trace!("Found link: {} -> {}", page_url, link);
            unique_links.insert(link);
        }

        Ok(unique_links.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract(html: &str, source: &str) -> Result<Vec<String>> {
        HtmlLinkExtractor::new().extract(html.as_bytes(), source)
    }

    #[test]
    fn test_resolves_relative_links() {
        let html = r#"<html><body>
            <a href="/b">B</a>
            <a href="c">C</a>
            <a href="https://other.org/x">Other</a>
        </body></html>"#;

        let links = extract(html, "http://a.com/dir/page").unwrap();

        assert_eq!(
            links,
            vec![
                "http://a.com/b".to_string(),
                "http://a.com/dir/c".to_string(),
                "https://other.org/x".to_string(),
            ]
        );
    }

    #[test]
    fn test_skips_fragment_empty_and_root_hrefs() {
        let html = r##"<a href="">empty</a>
            <a href="   ">blank</a>
            <a href="/">root</a>
            <a href="#top">fragment</a>
            <a href=" #section ">padded fragment</a>"##;

        let links = extract(html, "http://a.com/page").unwrap();
        assert!(links.is_empty(), "unexpected links: {:?}", links);
    }

    #[test]
    fn test_suppresses_absolute_self_links() {
        let html = r#"<a href="http://a.com/page">self</a>
            <a href="http://a.com/page/">self with slash</a>
            <a href="/page">relative self</a>
            <a href="/other">other</a>"#;

        let links = extract(html, "http://a.com/page/").unwrap();
        assert_eq!(links, vec!["http://a.com/other".to_string()]);
    }

    #[test]
    fn test_self_link_check_is_exact_only() {
        // Query variants of the page are different locations.
        let html = r#"<a href="/page?ref=nav">same page, query</a>"#;
        let links = extract(html, "http://a.com/page").unwrap();
        assert_eq!(links, vec!["http://a.com/page?ref=nav".to_string()]);
    }

    #[test]
    fn test_root_link_to_host_is_self_link() {
        let html = r#"<a href="http://a.com/">home</a>"#;
        let links = extract(html, "http://a.com").unwrap();
        assert!(links.is_empty());
    }

    #[test]
    fn test_only_first_href_of_start_tag_counts() {
        // Attributes on end tags are discarded by the parser, and a repeated
        // attribute keeps its first value.
        let html = r#"<a href="/first" href="/second">dup</a>
            <a href="/open">open</a href="/closing">"#;

        let links = extract(html, "http://a.com").unwrap();
        assert_eq!(
            links,
            vec!["http://a.com/first".to_string(), "http://a.com/open".to_string()]
        );
    }

    #[test]
    fn test_deduplicates_and_sorts() {
        let html = r#"<a href="/z">z</a>
            <a href="/a">a</a>
            <a href="/m">m</a>
            <a href="/a/">a again</a>
            <a href="http://a.com/z">z again</a>"#;

        let links = extract(html, "http://a.com").unwrap();
        assert_eq!(
            links,
            vec![
                "http://a.com/a".to_string(),
                "http://a.com/m".to_string(),
                "http://a.com/z".to_string(),
            ]
        );
    }

    #[test]
    fn test_output_is_deterministic() {
        let mut html = String::from("<html><body>");
        for i in (0..50).rev() {
            html.push_str(&format!(r#"<a href="/page{}">{}</a>"#, i, i));
        }
        html.push_str("</body></html>");

        let first = extract(&html, "http://a.com").unwrap();
        for _ in 0..5 {
            assert_eq!(extract(&html, "http://a.com").unwrap(), first);
        }
        let mut sorted = first.clone();
        sorted.sort();
        assert_eq!(first, sorted);
        assert_eq!(first.len(), 50);
    }

    #[test]
    fn test_ignores_non_anchor_tags() {
        let html = r#"<link href="/style.css" rel="stylesheet">
            <area href="/area">
            <img src="/img.png">
            <a name="anchor-without-href">no href</a>
            <a href="/real">real</a>"#;

        let links = extract(html, "http://a.com").unwrap();
        assert_eq!(links, vec!["http://a.com/real".to_string()]);
    }

    #[test]
    fn test_uppercase_markup() {
        let html = r#"<A HREF="/upper">upper</A>"#;
        let links = extract(html, "http://a.com").unwrap();
        assert_eq!(links, vec!["http://a.com/upper".to_string()]);
    }

    #[test]
    fn test_trims_whitespace_around_href() {
        let html = "<a href=\"\n   /spaced  \t\">spaced</a>";
        let links = extract(html, "http://a.com").unwrap();
        assert_eq!(links, vec!["http://a.com/spaced".to_string()]);
    }

    #[test]
    fn test_malformed_html_keeps_collected_links() {
        let html = r#"<html><body><a href="/one">one</a><div><a href="/two">two<p></span><a href="/thr"#;
        let links = extract(html, "http://a.com").unwrap();
        assert!(links.contains(&"http://a.com/one".to_string()));
        assert!(links.contains(&"http://a.com/two".to_string()));
    }

    #[test]
    fn test_invalid_utf8_is_tolerated() {
        let mut bytes = b"<a href=\"/ok\">".to_vec();
        bytes.extend_from_slice(&[0xff, 0xfe, 0xfd]);
        bytes.extend_from_slice(b"</a>");

        let links = HtmlLinkExtractor::new()
            .extract(&bytes, "http://a.com")
            .unwrap();
        assert_eq!(links, vec!["http://a.com/ok".to_string()]);
    }

    #[test]
    fn test_invalid_base_location() {
        let result = extract(r#"<a href="/b">b</a>"#, "not a url");
        assert!(matches!(result, Err(ScanError::InvalidLocation(_))));
    }

    #[test]
    fn test_unresolvable_href_fails_extraction() {
        let result = extract(r#"<a href="http://[invalid">bad</a>"#, "http://a.com");
        assert!(matches!(result, Err(ScanError::InvalidLocation(_))));
    }

    #[test]
    fn test_empty_content() {
        let links = extract("", "http://a.com").unwrap();
        assert!(links.is_empty());
    }
}
