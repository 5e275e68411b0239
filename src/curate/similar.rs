use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use super::tags::strip_html;
use crate::article::Article;

static NON_WORD_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^\w\s]").unwrap());

const STOPWORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "by", "for", "from", "has", "he", "in", "is", "it",
    "its", "of", "on", "that", "the", "to", "was", "will", "with", "this", "but", "they", "have",
    "had", "what", "said", "each", "which", "their", "time", "if", "up", "out", "many", "then",
    "them", "these", "so", "some", "her", "would", "make", "like", "into", "him", "two", "more",
    "very", "after", "words", "long", "than", "first", "been", "call", "who", "oil", "now",
    "find", "down", "day", "did", "get", "come", "made", "may", "part",
];

const BODY_PREFIX_CHARS: usize = 500;
const COSINE_WEIGHT: f64 = 0.75;
const TAG_WEIGHT: f64 = 0.20;
const SUBCATEGORY_WEIGHT: f64 = 0.05;

pub const DEFAULT_LIMIT: usize = 3;

// Ordered so norms and dot products sum in the same order for equal vectors.
type TermVector = BTreeMap<String, f64>;

/// For each article, the ids of the `limit` most related other articles.
///
/// Score = 0.75 · TF-IDF cosine + 0.20 · tag Jaccard + 0.05 · same
/// subcategory. Equal scores keep collection order.
pub fn related(articles: &[Article], limit: usize) -> Vec<Vec<String>> {
    let vectors = tfidf_vectors(articles);
    let tag_sets: Vec<HashSet<&str>> = articles
        .iter()
        .map(|a| a.tags().into_iter().collect())
        .collect();

    (0..articles.len())
        .map(|i| {
            let mut scores: Vec<(usize, f64)> = (0..articles.len())
                .filter(|&j| j != i)
                .map(|j| {
                    let cosine = cosine_similarity(&vectors[i], &vectors[j]);
                    let jaccard = jaccard_similarity(&tag_sets[i], &tag_sets[j]);
                    let same_sub = articles[i].subcategory() == articles[j].subcategory();
                    let score = COSINE_WEIGHT * cosine
                        + TAG_WEIGHT * jaccard
                        + if same_sub { SUBCATEGORY_WEIGHT } else { 0.0 };
                    (j, score)
                })
                .collect();
            scores.sort_by(|a, b| b.1.total_cmp(&a.1));
            scores
                .into_iter()
                .take(limit)
                .map(|(j, _)| articles[j].id().to_string())
                .collect()
        })
        .collect()
}

/// Write `similar_posts` on every article.
pub fn annotate_similar(articles: &mut [Article], limit: usize) -> usize {
    let related = related(articles, limit);
    let mut linked = 0;
    for (article, ids) in articles.iter_mut().zip(related) {
        if !ids.is_empty() {
            linked += 1;
        }
        article.set(
            "similar_posts",
            Value::Array(ids.into_iter().map(Value::String).collect()),
        );
    }
    linked
}

fn search_text(article: &Article) -> String {
    let title = article.title();
    let summary = match article.summary() {
        "" => article.dek(),
        s => s,
    };
    let body: String = strip_html(article.body_html())
        .chars()
        .take(BODY_PREFIX_CHARS)
        .collect();
    format!("{t} {t} {t} {} {}", summary, body, t = title).to_lowercase()
}

fn tokenize(text: &str) -> Vec<String> {
    let lower = text.to_lowercase();
    let cleaned = NON_WORD_RE.replace_all(&lower, " ");
    cleaned
        .split_whitespace()
        .filter(|w| w.chars().count() > 2 && !STOPWORDS.contains(w))
        .map(str::to_string)
        .collect()
}

fn terms(tokens: &[String]) -> Vec<String> {
    let mut out: Vec<String> = tokens.to_vec();
    out.extend(tokens.windows(2).map(|pair| pair.join(" ")));
    out
}

fn tfidf_vectors(articles: &[Article]) -> Vec<TermVector> {
    let mut doc_freq: HashMap<String, usize> = HashMap::new();
    let term_freqs: Vec<HashMap<String, usize>> = articles
        .iter()
        .map(|a| {
            let mut tf: HashMap<String, usize> = HashMap::new();
            for term in terms(&tokenize(&search_text(a))) {
                *tf.entry(term).or_default() += 1;
            }
            for term in tf.keys() {
                *doc_freq.entry(term.clone()).or_default() += 1;
            }
            tf
        })
        .collect();

    let n = articles.len() as f64;
    term_freqs
        .into_iter()
        .map(|tf| {
            let max = tf.values().copied().max().unwrap_or(1) as f64;
            tf.into_iter()
                .map(|(term, freq)| {
                    let df = doc_freq.get(&term).copied().unwrap_or(1) as f64;
                    let weight = (freq as f64 / max) * (n / df).ln();
                    (term, weight)
                })
                .collect()
        })
        .collect()
}

fn cosine_similarity(a: &TermVector, b: &TermVector) -> f64 {
    let dot: f64 = a
        .iter()
        .filter_map(|(term, wa)| b.get(term).map(|wb| wa * wb))
        .sum();
    let norm_a: f64 = a.values().map(|w| w * w).sum();
    let norm_b: f64 = b.values().map(|w| w * w).sum();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

fn jaccard_similarity(a: &HashSet<&str>, b: &HashSet<&str>) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 0.0;
    }
    let shared = a.intersection(b).count() as f64;
    let union = a.union(b).count() as f64;
    shared / union
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn article(id: &str, title: &str, tags: &[&str], sub: &str) -> Article {
        Article::from(json!({ "id": id, "title": title, "tags": tags, "subcategory": sub }))
    }

    #[test]
    fn tokenize_drops_short_and_stopwords() {
        assert_eq!(
            tokenize("the attention, of an LSTM-based model!"),
            vec!["attention", "lstm", "based", "model"]
        );
    }

    #[test]
    fn bigrams_follow_unigrams() {
        let toks: Vec<String> = ["aaa", "bbb", "ccc"].iter().map(|s| s.to_string()).collect();
        assert_eq!(terms(&toks), vec!["aaa", "bbb", "ccc", "aaa bbb", "bbb ccc"]);
    }

    #[test]
    fn closest_text_ranks_first_and_self_excluded() {
        let articles = vec![
            article("ed-1", "diffusion models sampling", &[], "Other"),
            article("ed-2", "diffusion models guidance", &[], "Visualizations"),
            article("ed-3", "tutoring chatbot prompts", &[], "Visualizations"),
        ];
        let rel = related(&articles, DEFAULT_LIMIT);
        assert_eq!(rel[0], vec!["ed-2", "ed-3"]);
        assert!(rel.iter().enumerate().all(|(i, ids)| !ids.contains(&articles[i].id().to_string())));
    }

    #[test]
    fn tags_and_subcategory_break_text_ties() {
        let articles = vec![
            article("ed-1", "alpha", &["CNNs"], "A"),
            article("ed-2", "bravo", &[], "B"),
            article("ed-3", "charlie", &["CNNs"], "B"),
            article("ed-4", "delta", &[], "A"),
        ];
        let rel = related(&articles, 2);
        assert_eq!(rel[0], vec!["ed-3", "ed-4"]);
    }

    #[test]
    fn identical_candidates_score_equal_and_keep_order() {
        let articles = vec![
            article("ed-1", "diffusion models guidance scale", &[], "A"),
            article("ed-2", "diffusion models sampling steps noise", &[], "B"),
            article("ed-3", "diffusion models sampling steps noise", &[], "B"),
            article("ed-4", "tutoring chatbot prompts", &[], "C"),
        ];
        let vectors = tfidf_vectors(&articles);
        assert_eq!(
            cosine_similarity(&vectors[0], &vectors[1]).to_bits(),
            cosine_similarity(&vectors[0], &vectors[2]).to_bits()
        );
        for _ in 0..20 {
            assert_eq!(related(&articles, 2)[0], vec!["ed-2", "ed-3"]);
        }
    }

    #[test]
    fn annotate_writes_field() {
        let mut articles = vec![
            article("ed-1", "one", &[], "A"),
            article("ed-2", "two", &[], "A"),
        ];
        assert_eq!(annotate_similar(&mut articles, DEFAULT_LIMIT), 2);
        assert_eq!(articles[0].string_list("similar_posts"), vec!["ed-2"]);
        assert_eq!(articles[1].string_list("similar_posts"), vec!["ed-1"]);
    }

    #[test]
    fn jaccard_edges() {
        let empty = HashSet::new();
        assert_eq!(jaccard_similarity(&empty, &empty), 0.0);
        let a: HashSet<&str> = ["x", "y"].into_iter().collect();
        let b: HashSet<&str> = ["y", "z"].into_iter().collect();
        assert!((jaccard_similarity(&a, &b) - 1.0 / 3.0).abs() < 1e-9);
    }
}
