use std::sync::LazyLock;

use anyhow::{Context, Result};
use regex::Regex;

use crate::article::Article;
use crate::config::KeywordRule;

static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").unwrap());
static SPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

struct Topic {
    name: String,
    patterns: Vec<Regex>,
}

/// Assigns course-topic tags by whole-word keyword matches.
pub struct Tagger {
    topics: Vec<Topic>,
}

impl Tagger {
    pub fn new(rules: &[KeywordRule]) -> Result<Self> {
        let topics = rules
            .iter()
            .map(|rule| -> Result<Topic> {
                let patterns = rule
                    .keywords
                    .iter()
                    .map(|kw| {
                        Regex::new(&format!(r"(?i)\b{}\b", regex::escape(kw)))
                            .with_context(|| format!("Bad keyword {:?} for topic {}", kw, rule.name))
                    })
                    .collect::<Result<Vec<_>>>()?;
                Ok(Topic {
                    name: rule.name.clone(),
                    patterns,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { topics })
    }

    /// Sorted topic names matched by the post's title, dek and body text.
    pub fn assign(&self, article: &Article) -> Vec<String> {
        let body = strip_html(article.body_html());
        let text = [article.title(), article.dek(), body.as_str()]
            .join(" ")
            .to_lowercase();

        let mut tags: Vec<String> = self
            .topics
            .iter()
            .filter(|t| t.patterns.iter().any(|re| re.is_match(&text)))
            .map(|t| t.name.clone())
            .collect();
        tags.sort();
        tags
    }

    /// Overwrite `tags` on every article. Returns how many got at least one.
    pub fn tag_all(&self, articles: &mut [Article]) -> usize {
        let mut tagged = 0;
        for article in articles.iter_mut() {
            let tags = self.assign(article);
            if !tags.is_empty() {
                tagged += 1;
                tracing::debug!("{}: {}", article.id(), tags.join(", "));
            }
            article.set_string_list("tags", tags);
        }
        tagged
    }
}

/// Markup replaced by spaces, whitespace collapsed.
pub fn strip_html(html: &str) -> String {
    if html.is_empty() {
        return String::new();
    }
    let spaced = TAG_RE.replace_all(html, " ");
    SPACE_RE.replace_all(&spaced, " ").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Rules;
    use serde_json::json;

    fn tagger() -> Tagger {
        Tagger::new(&Rules::default().topics).unwrap()
    }

    #[test]
    fn whole_words_only() {
        let a = Article::from(json!({ "title": "Dropout and LoRA", "body_html": "" }));
        assert_eq!(tagger().assign(&a), vec!["LoRA", "dropout"]);

        // "gru" must not hit inside "grumpy".
        let b = Article::from(json!({ "title": "a grumpy post" }));
        assert!(tagger().assign(&b).is_empty());
    }

    #[test]
    fn body_markup_is_ignored() {
        let a = Article::from(json!({
            "title": "notes",
            "body_html": "<p>self-attention</p><b>in</b> <i>transformers</i>"
        }));
        assert_eq!(tagger().assign(&a), vec!["Transformers", "attention"]);
    }

    #[test]
    fn dek_counts() {
        let a = Article::from(json!({ "title": "x", "dek": "a U-Net for segmentation" }));
        assert_eq!(tagger().assign(&a), vec!["U-Nets"]);
    }

    #[test]
    fn tag_all_overwrites_and_clears() {
        let mut articles = vec![
            Article::from(json!({ "id": "ed-1", "title": "CNN pooling", "tags": ["stale"] })),
            Article::from(json!({ "id": "ed-2", "title": "nothing here", "tags": ["stale"] })),
        ];
        assert_eq!(tagger().tag_all(&mut articles), 1);
        assert_eq!(articles[0].tags(), vec!["CNNs", "pooling/downsampling"]);
        assert!(articles[1].tags().is_empty());
        assert!(articles[1].get("tags").is_some());
    }

    #[test]
    fn strip_html_collapses_space() {
        assert_eq!(strip_html("<p>a</p>\n\n<p>b  c</p>"), "a b c");
        assert_eq!(strip_html(""), "");
    }
}
