pub mod classify;
pub mod links;
pub mod similar;
pub mod tags;

use tracing::{debug, info};

use crate::article::Article;
use classify::Classifier;
use links::LinkExtractor;

/// Counters from an external-link pass.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LinkReport {
    pub total: usize,
    pub annotated: usize,
    pub links: usize,
}

impl LinkReport {
    pub fn print(&self) {
        println!("  - Total articles: {}", self.total);
        println!("  - Articles with external links: {}", self.annotated);
        println!("  - Total external links found: {}", self.links);
    }
}

/// Counters from a filter + classify pass.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FilterReport {
    pub total: usize,
    pub selected: usize,
    pub reclassified: usize,
    /// (subcategory, count), most frequent first.
    pub distribution: Vec<(String, usize)>,
}

impl FilterReport {
    pub fn print(&self) {
        println!("Total articles: {}", self.total);
        println!("Matching articles: {}", self.selected);
        println!("Reclassified: {}", self.reclassified);
        println!("\nSubcategory distribution:");
        for (label, count) in &self.distribution {
            println!("  {}: {}", label, count);
        }
    }
}

/// Case-insensitive title containment against any of a set of phrases.
#[derive(Debug, Clone)]
pub struct TitleFilter {
    phrases: Vec<String>,
}

impl TitleFilter {
    pub fn new<I, S>(phrases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            phrases: phrases.into_iter().map(|p| p.as_ref().to_lowercase()).collect(),
        }
    }

    pub fn matches(&self, title: &str) -> bool {
        let title = title.to_lowercase();
        self.phrases.iter().any(|p| title.contains(p.as_str()))
    }
}

/// Attach `external_links` to every article that has any.
///
/// Scans `body_html` as markup and `summary` as plain text. Articles
/// without external links are left as they are.
pub fn annotate_links(articles: &mut [Article], extractor: &LinkExtractor) -> LinkReport {
    let mut report = LinkReport {
        total: articles.len(),
        ..Default::default()
    };

    for article in articles.iter_mut() {
        let found = extractor.extract(Some(article.body_html()), Some(article.summary()));
        if found.is_empty() {
            continue;
        }
        debug!("{}: Found {} external link(s)", id_or_unknown(article), found.len());
        report.annotated += 1;
        report.links += found.len();
        article.set_string_list("external_links", found);
    }

    info!(
        "Annotated {} of {} articles ({} links)",
        report.annotated, report.total, report.links
    );
    report
}

/// Keep only articles whose title passes `filter`, filling in missing
/// subcategories with `classifier`. Existing labels are never replaced.
pub fn filter_and_classify(
    articles: Vec<Article>,
    filter: &TitleFilter,
    classifier: &Classifier,
) -> (Vec<Article>, FilterReport) {
    let total = articles.len();
    let mut selected: Vec<Article> = articles
        .into_iter()
        .filter(|a| filter.matches(a.title()))
        .collect();

    let mut reclassified = 0;
    for article in selected.iter_mut() {
        if !classifier.needs_classification(article.subcategory()) {
            continue;
        }
        let label = classifier
            .classify(article.title(), article.body_html())
            .to_string();
        debug!("{}: classified as {}", id_or_unknown(article), label);
        article.set_subcategory(&label);
        reclassified += 1;
    }

    let report = FilterReport {
        total,
        selected: selected.len(),
        reclassified,
        distribution: distribution(&selected),
    };
    info!("Kept {} of {} articles", report.selected, report.total);
    (selected, report)
}

/// Per-subcategory counts, most frequent first; ties keep first-seen order.
pub fn distribution(articles: &[Article]) -> Vec<(String, usize)> {
    let mut counts: Vec<(String, usize)> = Vec::new();
    for article in articles {
        let label = article.subcategory().unwrap_or("");
        match counts.iter_mut().find(|(l, _)| l == label) {
            Some((_, n)) => *n += 1,
            None => counts.push((label.to_string(), 1)),
        }
    }
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts
}

fn id_or_unknown(article: &Article) -> &str {
    match article.id() {
        "" => "unknown",
        id => id,
    }
}

// ── Tests ──
