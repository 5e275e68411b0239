use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;
use url::Url;

static ANCHOR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)<a[^>]+href=["'](https?://[^"']+)["']"#).unwrap());
static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").unwrap());
// A bare URL never ends on sentence punctuation and never contains
// whitespace, brackets, quotes or parentheses.
static BARE_URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)https?://[^\s<>"{}|\\^`\[\]()]+[^\s<>"{}|\\^`\[\]().,;:!?]"#).unwrap()
});

const TRAILING_PUNCT: &[char] = &['.', ',', ';', ':', '!', '?'];

/// Pulls external URLs out of post markup and text.
#[derive(Debug, Clone)]
pub struct LinkExtractor {
    internal_domains: Vec<String>,
}

impl LinkExtractor {
    pub fn new<I, S>(internal_domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            internal_domains: internal_domains
                .into_iter()
                .map(|d| d.as_ref().to_lowercase())
                .collect(),
        }
    }

    /// Sorted, deduplicated external URLs found in `html` and `text`.
    pub fn extract(&self, html: Option<&str>, text: Option<&str>) -> Vec<String> {
        let mut links = BTreeSet::new();

        if let Some(html) = html.filter(|h| !h.is_empty()) {
            for caps in ANCHOR_RE.captures_iter(html) {
                insert_clean(&mut links, &caps[1]);
            }
            let stripped = TAG_RE.replace_all(html, "");
            scan_bare(&mut links, &stripped);
        }

        if let Some(text) = text.filter(|t| !t.is_empty()) {
            scan_bare(&mut links, text);
        }

        links.into_iter().filter(|url| !self.is_internal(url)).collect()
    }

    /// True when the URL's host hits the denylist. URLs the parser rejects
    /// are checked on their raw authority; an empty one never counts.
    pub fn is_internal(&self, url: &str) -> bool {
        let host = Url::parse(url)
            .ok()
            .and_then(|parsed| parsed.host_str().map(str::to_lowercase))
            .unwrap_or_else(|| raw_authority(url));
        if host.is_empty() {
            return false;
        }
        self.internal_domains.iter().any(|d| host.contains(d.as_str()))
    }
}

fn raw_authority(url: &str) -> String {
    url.split("://")
        .nth(1)
        .unwrap_or("")
        .split(['/', '?', '#'])
        .next()
        .unwrap_or("")
        .to_lowercase()
}

fn scan_bare(links: &mut BTreeSet<String>, text: &str) {
    for m in BARE_URL_RE.find_iter(text) {
        insert_clean(links, m.as_str());
    }
}

fn insert_clean(links: &mut BTreeSet<String>, raw: &str) {
    let url = raw.trim().trim_end_matches(TRAILING_PUNCT);
    if !url.is_empty() {
        links.insert(url.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extractor() -> LinkExtractor {
        LinkExtractor::new(["edstem.org", "static.us.edusercontent.com"])
    }

    #[test]
    fn anchor_and_bare_urls() {
        let html = r#"<a href="https://github.com/foo/bar">link</a> see https://edstem.org/x also https://example.com/page."#;
        assert_eq!(
            extractor().extract(Some(html), None),
            vec!["https://example.com/page", "https://github.com/foo/bar"]
        );
    }

    #[test]
    fn sorted_and_deduplicated() {
        let html = r#"<a href='https://b.com/x'>b</a> https://b.com/x https://a.com/y"#;
        let text = "again https://a.com/y and https://c.com/z";
        let links = extractor().extract(Some(html), Some(text));
        assert_eq!(links, vec!["https://a.com/y", "https://b.com/x", "https://c.com/z"]);
    }

    #[test]
    fn internal_hosts_dropped_any_case() {
        let text = "https://EdStem.org/us/courses/1 https://Static.US.EduserContent.com/files/a.png \
                    https://us.edstem.org/api https://keep.me/ok";
        assert_eq!(extractor().extract(None, Some(text)), vec!["https://keep.me/ok"]);
    }

    #[test]
    fn trailing_punctuation_stripped_from_end_only() {
        let text = "Read https://example.com/a.b.c?, then https://example.com/q?x=1!";
        assert_eq!(
            extractor().extract(None, Some(text)),
            vec!["https://example.com/a.b.c", "https://example.com/q?x=1"]
        );
    }

    #[test]
    fn anchor_trailing_punctuation_stripped() {
        let html = r#"<A HREF="https://example.com/end!?">x</A>"#;
        assert_eq!(extractor().extract(Some(html), None), vec!["https://example.com/end"]);
    }

    #[test]
    fn brackets_and_parens_terminate_bare_tokens() {
        let text = "(see https://example.com/x) [https://example.org/y] \"https://example.net/z\"";
        assert_eq!(
            extractor().extract(None, Some(text)),
            vec!["https://example.com/x", "https://example.net/z", "https://example.org/y"]
        );
    }

    #[test]
    fn unparseable_url_is_kept() {
        let html = r#"<a href="https://[::bad]/x">x</a>"#;
        let links = extractor().extract(Some(html), None);
        assert_eq!(links, vec!["https://[::bad]/x"]);
    }

    #[test]
    fn internal_hosts_dropped_even_when_url_rejected() {
        let html = r#"<a href="https://us.edstem.org|x/a">x</a>"#;
        let text = "see https://edstem.org:99999/courses/1 and https://EDSTEM.ORG:8o/x \
                    or https://keep.example:99999/a ok";
        assert_eq!(
            extractor().extract(Some(html), Some(text)),
            vec!["https://keep.example:99999/a"]
        );
    }

    #[test]
    fn raw_authority_stops_at_path_query_fragment() {
        assert_eq!(raw_authority("https://A.B:1/x"), "a.b:1");
        assert_eq!(raw_authority("https://a.b?q=1"), "a.b");
        assert_eq!(raw_authority("https://a.b#frag"), "a.b");
        assert_eq!(raw_authority("https:///path"), "");
    }

    #[test]
    fn tags_removed_before_bare_scan() {
        let html = "<p>docs at https://docs.rs/regex</p>\n<p>end</p>";
        assert_eq!(extractor().extract(Some(html), None), vec!["https://docs.rs/regex"]);
    }

    #[test]
    fn empty_inputs() {
        assert!(extractor().extract(None, None).is_empty());
        assert!(extractor().extract(Some(""), Some("no links here")).is_empty());
    }

    #[test]
    fn custom_denylist() {
        let ex = LinkExtractor::new(["github.com"]);
        let links = ex.extract(None, Some("https://github.com/a https://edstem.org/b"));
        assert_eq!(links, vec!["https://edstem.org/b"]);
    }
}
