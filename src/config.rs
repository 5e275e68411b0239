use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::article::UNCLASSIFIED;

/// A named label with the keyword substrings that vote for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordRule {
    pub name: String,
    pub keywords: Vec<String>,
}

impl KeywordRule {
    pub fn new(name: &str, keywords: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
        }
    }
}

/// Static curation data: denylist, category table, title filter and topics.
///
/// Every field falls back to the built-in table, so an override file only
/// needs the keys it changes. Category and topic tables are lists, not
/// maps: declaration order is the classifier's tie-break.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Rules {
    pub internal_domains: Vec<String>,
    pub categories: Vec<KeywordRule>,
    pub default_category: String,
    pub unclassified_label: String,
    pub title_phrases: Vec<String>,
    pub topics: Vec<KeywordRule>,
}

impl Rules {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read rules file {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse rules file {}", path.display()))
    }

    /// Built-in rules, or the override file when one is given.
    pub fn resolve(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::load(p),
            None => Ok(Self::default()),
        }
    }
}

impl Default for Rules {
    fn default() -> Self {
        Self {
            internal_domains: INTERNAL_DOMAINS.iter().map(|d| d.to_string()).collect(),
            categories: default_categories(),
            default_category: "Other".to_string(),
            unclassified_label: UNCLASSIFIED.to_string(),
            title_phrases: vec![
                "special participation e".to_string(),
                "participation e".to_string(),
            ],
            topics: default_topics(),
        }
    }
}

const INTERNAL_DOMAINS: &[&str] = &["edstem.org", "static.us.edusercontent.com"];

fn default_categories() -> Vec<KeywordRule> {
    vec![
        KeywordRule::new(
            "Generating Questions",
            &["quiz", "question", "practice problem", "exam prep", "test", "worksheet", "drill"],
        ),
        KeywordRule::new(
            "Learning Tools & Tutors",
            &[
                "tutor", "chatgpt", "study mode", "learning", "teach", "explain", "socratic",
                "dialogue", "notebooklm", "gemini",
            ],
        ),
        KeywordRule::new(
            "Visualizations",
            &["visualiz", "interactive", "animation", "graph", "plot", "diagram", "explorer"],
        ),
        KeywordRule::new(
            "Cheatsheets & Notes",
            &["cheatsheet", "notes", "summary", "latex", "pdf", "transcript", "lecture"],
        ),
        KeywordRule::new(
            "Understanding Concepts",
            &["understand", "intuition", "concept", "explain", "clarify", "compare", "connection"],
        ),
        KeywordRule::new(
            "New Content Creation",
            &["generated", "create", "build", "tool", "website", "app", "artifact"],
        ),
    ]
}

fn default_topics() -> Vec<KeywordRule> {
    vec![
        KeywordRule::new(
            "optimization",
            &["optimization", "optimizer", "optimize", "optimizing", "gradient descent"],
        ),
        KeywordRule::new(
            "SGD",
            &["SGD", "stochastic gradient descent", "vanilla sgd", "gradient descent"],
        ),
        KeywordRule::new(
            "momentum",
            &["momentum", "momentum-based", "momentum sgd", "momentum optimizer"],
        ),
        KeywordRule::new(
            "implicit regularization",
            &["implicit regularization", "implicit regulariz", "implicit bias"],
        ),
        KeywordRule::new("Adam", &["Adam", "adam optimizer", "adamw", "adaptive moment"]),
        KeywordRule::new(
            "features/representation",
            &["features", "representation", "feature learning", "representations", "feature space"],
        ),
        KeywordRule::new(
            "optimizer comparisons",
            &["optimizer comparison", "compare optimizers", "optimizer vs", "sgd vs", "adam vs", "momentum vs"],
        ),
        KeywordRule::new(
            "induced matrix norms",
            &["induced matrix norm", "matrix norm", "induced norm", "frobenius", "spectral norm"],
        ),
        KeywordRule::new(
            "μP (maximal update parameterization)",
            &["μP", "muP", "maximal update", "parameterization", "mup"],
        ),
        KeywordRule::new("MuON", &["MuON", "muon", "second-order", "second order"]),
        KeywordRule::new(
            "CNNs",
            &["CNN", "CNNs", "convolutional", "conv net", "convolutional neural network"],
        ),
        KeywordRule::new(
            "pooling/downsampling",
            &["pooling", "downsampling", "max pool", "average pool", "downsample"],
        ),
        KeywordRule::new(
            "data augmentation",
            &["data augmentation", "augment", "augmentation", "augmented data"],
        ),
        KeywordRule::new(
            "normalization layers",
            &["normalization", "batch norm", "layer norm", "instance norm", "group norm", "normalization layer"],
        ),
        KeywordRule::new("dropout", &["dropout", "drop out"]),
        KeywordRule::new(
            "ResNets",
            &["ResNet", "ResNets", "residual network", "residual connection", "skip connection"],
        ),
        KeywordRule::new(
            "fully convolutional networks (FCNs)",
            &["FCN", "FCNs", "fully convolutional", "fully convolutional network"],
        ),
        KeywordRule::new("U-Nets", &["U-Net", "U-Nets", "unet", "unets", "u-net"]),
        KeywordRule::new(
            "GNNs",
            &["GNN", "GNNs", "graph neural network", "graph neural", "graph network"],
        ),
        KeywordRule::new("DiffPool", &["DiffPool", "diffpool", "differentiable pooling"]),
        KeywordRule::new(
            "RNNs",
            &["RNN", "RNNs", "recurrent neural network", "recurrent", "lstm", "gru"],
        ),
        KeywordRule::new(
            "self-supervision",
            &["self-supervision", "self-supervised", "self supervision", "self supervised"],
        ),
        KeywordRule::new(
            "state-space models (SSMs)",
            &["SSM", "SSMs", "state space", "state-space", "state space model"],
        ),
        KeywordRule::new(
            "attention",
            &["attention", "attention mechanism", "attention layer", "self-attention", "self attention"],
        ),
        KeywordRule::new(
            "Transformers",
            &["Transformer", "Transformers", "transformer", "transformer model", "transformer architecture"],
        ),
        KeywordRule::new(
            "in-context learning (ICL)",
            &["in-context learning", "ICL", "in context learning", "few-shot", "few shot"],
        ),
        KeywordRule::new("prompting", &["prompt", "prompting", "prompts", "prompt engineering"]),
        KeywordRule::new("PEFT", &["PEFT", "parameter efficient", "parameter-efficient"]),
        KeywordRule::new("soft prompting", &["soft prompt", "soft prompting", "learnable prompt"]),
        KeywordRule::new("LoRA", &["LoRA", "lora", "low-rank adaptation", "low rank"]),
        KeywordRule::new(
            "transfer learning",
            &["transfer learning", "transfer", "fine-tuning", "fine tuning", "finetuning"],
        ),
        KeywordRule::new(
            "meta-learning",
            &["meta-learning", "meta learning", "learn to learn", "maml"],
        ),
        KeywordRule::new(
            "generative models",
            &["generative", "generation", "generative model", "VAE", "GAN", "diffusion", "autoregressive"],
        ),
        KeywordRule::new(
            "post-training",
            &["post-training", "post training", "posttrain", "alignment", "RLHF"],
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_keep_declared_category_order() {
        let rules = Rules::default();
        let names: Vec<&str> = rules.categories.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names[0], "Generating Questions");
        assert_eq!(names[5], "New Content Creation");
        assert_eq!(rules.topics.len(), 34);
    }

    #[test]
    fn partial_override_falls_back_to_builtins() {
        let rules: Rules =
            serde_json::from_str(r#"{ "internal_domains": ["example.org"] }"#).unwrap();
        assert_eq!(rules.internal_domains, vec!["example.org"]);
        assert_eq!(rules.default_category, "Other");
        assert_eq!(rules.categories, Rules::default().categories);
    }

    #[test]
    fn missing_rules_file_is_an_error() {
        let err = Rules::load(Path::new("tests/fixtures/does-not-exist.json")).unwrap_err();
        assert!(err.to_string().contains("does-not-exist.json"));
    }
}
