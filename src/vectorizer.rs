//! Word n-gram count vectorizer.
//!
//! The artifact is a JSON document written by the training pipeline:
//! a term → column vocabulary plus the tokenization settings it was fitted with.

use anyhow::{Context, Result, bail};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::io::{Read, Write};

use crate::engine::{FeatureMatrix, FeatureTransformer};

pub const DEFAULT_TOKEN_PATTERN: &str = r"(?u)\b\w\w+\b";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorizerArtifact {
    pub vocabulary: HashMap<String, u32>,
    #[serde(default = "default_ngram_range")]
    pub ngram_range: (usize, usize),
    #[serde(default = "default_lowercase")]
    pub lowercase: bool,
    #[serde(default = "default_token_pattern")]
    pub token_pattern: String,
    #[serde(default)]
    pub stop_words: Option<Vec<String>>,
    #[serde(default)]
    pub binary: bool,
}

fn default_ngram_range() -> (usize, usize) {
    (1, 1)
}

fn default_lowercase() -> bool {
    true
}

fn default_token_pattern() -> String {
    DEFAULT_TOKEN_PATTERN.to_string()
}

impl VectorizerArtifact {
    pub fn new(vocabulary: HashMap<String, u32>, ngram_range: (usize, usize)) -> Self {
        Self {
            vocabulary,
            ngram_range,
            lowercase: default_lowercase(),
            token_pattern: default_token_pattern(),
            stop_words: None,
            binary: false,
        }
    }

    pub fn from_reader(reader: impl Read) -> Result<Self> {
        serde_json::from_reader(reader).context("vectorizer artifact is not valid JSON")
    }

    pub fn write_to(&self, writer: impl Write) -> Result<()> {
        serde_json::to_writer(writer, self).context("failed to serialize vectorizer artifact")
    }
}

#[derive(Debug)]
pub struct CountVectorizer {
    vocabulary: HashMap<String, u32>,
    min_n: usize,
    max_n: usize,
    lowercase: bool,
    binary: bool,
    token_pattern: Regex,
    stop_words: HashSet<String>,
}

impl TryFrom<VectorizerArtifact> for CountVectorizer {
    type Error = anyhow::Error;

    fn try_from(artifact: VectorizerArtifact) -> Result<Self> {
        let (min_n, max_n) = artifact.ngram_range;
        if min_n == 0 || min_n > max_n {
            bail!("invalid ngram_range ({min_n}, {max_n})");
        }

        if artifact.vocabulary.is_empty() {
            bail!("vectorizer vocabulary is empty");
        }
        let n_features = artifact.vocabulary.len();
        let mut seen = vec![false; n_features];
        for (term, &index) in &artifact.vocabulary {
            let slot = seen
                .get_mut(index as usize)
                .with_context(|| format!("term {term:?} maps to column {index} beyond {n_features}"))?;
            if std::mem::replace(slot, true) {
                bail!("column {index} is assigned to more than one term");
            }
        }

        let token_pattern = Regex::new(&artifact.token_pattern)
            .with_context(|| format!("invalid token_pattern {:?}", artifact.token_pattern))?;
        if token_pattern.captures_len() > 2 {
            bail!("token_pattern may contain at most one capture group");
        }

        Ok(Self {
            vocabulary: artifact.vocabulary,
            min_n,
            max_n,
            lowercase: artifact.lowercase,
            binary: artifact.binary,
            token_pattern,
            stop_words: artifact.stop_words.unwrap_or_default().into_iter().collect(),
        })
    }
}

impl CountVectorizer {
    fn tokenize<'a>(&self, text: &'a str) -> Vec<&'a str> {
        let group = if self.token_pattern.captures_len() == 2 { 1 } else { 0 };
        self.token_pattern
            .captures_iter(text)
            .filter_map(|caps| caps.get(group))
            .map(|m| m.as_str())
            .filter(|token| !self.stop_words.contains(*token))
            .collect()
    }

    /// Every word n-gram of size `min_n..=max_n`, tokens joined by a space.
    fn ngrams(&self, tokens: &[&str]) -> Vec<String> {
        let mut grams = Vec::new();
        for n in self.min_n..=self.max_n.min(tokens.len()) {
            grams.extend(tokens.windows(n).map(|window| window.join(" ")));
        }
        grams
    }

    fn count_row(&self, text: &str) -> BTreeMap<u32, f32> {
        let text = if self.lowercase {
            text.to_lowercase()
        } else {
            text.to_string()
        };
        let tokens = self.tokenize(&text);

        let mut counts = BTreeMap::new();
        for gram in self.ngrams(&tokens) {
            if let Some(&column) = self.vocabulary.get(&gram) {
                *counts.entry(column).or_insert(0.0) += 1.0;
            }
        }
        if self.binary {
            counts.values_mut().for_each(|count| *count = 1.0);
        }
        counts
    }
}

impl FeatureTransformer for CountVectorizer {
    fn transform(&self, texts: &[String]) -> Result<FeatureMatrix> {
        let mut matrix = FeatureMatrix::new(self.n_features());
        for text in texts {
            matrix.push_row(self.count_row(text))?;
        }
        Ok(matrix)
    }

    fn n_features(&self) -> usize {
        self.vocabulary.len()
    }
}
