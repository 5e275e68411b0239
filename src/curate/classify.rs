use crate::config::KeywordRule;

/// Keyword-vote subcategory classifier.
#[derive(Debug, Clone)]
pub struct Classifier {
    categories: Vec<KeywordRule>,
    default_label: String,
    unclassified: String,
}

impl Classifier {
    pub fn new(categories: Vec<KeywordRule>, default_label: &str, unclassified: &str) -> Self {
        let categories = categories
            .into_iter()
            .map(|rule| KeywordRule {
                keywords: rule.keywords.iter().map(|k| k.to_lowercase()).collect(),
                name: rule.name,
            })
            .collect();
        Self {
            categories,
            default_label: default_label.to_string(),
            unclassified: unclassified.to_string(),
        }
    }

    /// Best-scoring category for the post, or the default label.
    ///
    /// A keyword counts once however often it appears. On equal scores the
    /// category declared first wins.
    pub fn classify(&self, title: &str, body: &str) -> &str {
        let content = format!("{} {}", title, body).to_lowercase();

        let mut best: Option<(&str, usize)> = None;
        for rule in &self.categories {
            let score = rule
                .keywords
                .iter()
                .filter(|kw| content.contains(kw.as_str()))
                .count();
            if score == 0 {
                continue;
            }
            if best.map_or(true, |(_, top)| score > top) {
                best = Some((rule.name.as_str(), score));
            }
        }

        best.map_or(self.default_label.as_str(), |(name, _)| name)
    }

    /// Missing, empty, or the "not classified yet" sentinel.
    pub fn needs_classification(&self, subcategory: Option<&str>) -> bool {
        match subcategory {
            None => true,
            Some(s) => s.is_empty() || s == self.unclassified,
        }
    }
}
