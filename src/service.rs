use anyhow::{Context, Result, bail};
use metrics::{counter, histogram};
use std::sync::Arc;

use crate::engine::{Classifier, FeatureTransformer, Identity, TextNormalizer};
use crate::error::PredictionError;
use crate::loader::Artifacts;
use crate::types::SentimentResult;

pub const DEFAULT_MAX_BATCH_SIZE: usize = 1024;

/// Normalizes, vectorizes and classifies one batch, zipping labels back onto
/// the original texts by position.
pub fn predict(
    vectorizer: &dyn FeatureTransformer,
    classifier: &dyn Classifier,
    normalizer: &dyn TextNormalizer,
    texts: &[String],
) -> Result<Vec<SentimentResult>> {
    let normalized: Vec<String> = texts
        .iter()
        .map(|text| normalizer.normalize(text).into_owned())
        .collect();

    let features = vectorizer
        .transform(&normalized)
        .context("failed to vectorize texts")?;
    if features.n_rows() != texts.len() {
        bail!(
            "vectorizer returned {} rows for {} texts",
            features.n_rows(),
            texts.len()
        );
    }

    let labels = classifier
        .predict_batch(&features)
        .context("failed to classify texts")?;
    if labels.len() != texts.len() {
        bail!(
            "classifier returned {} labels for {} texts",
            labels.len(),
            texts.len()
        );
    }

    Ok(texts
        .iter()
        .zip(labels)
        .map(|(text, sentiment)| SentimentResult {
            text: text.clone(),
            sentiment,
        })
        .collect())
}

/// Shared, read-only prediction entry point for every transport.
pub struct PredictionService {
    artifacts: Option<Artifacts>,
    normalizer: Arc<dyn TextNormalizer>,
    max_batch_size: usize,
}

impl PredictionService {
    pub fn new(artifacts: Option<Artifacts>) -> Self {
        Self {
            artifacts,
            normalizer: Arc::new(Identity),
            max_batch_size: DEFAULT_MAX_BATCH_SIZE,
        }
    }

    pub fn with_normalizer(mut self, normalizer: Arc<dyn TextNormalizer>) -> Self {
        self.normalizer = normalizer;
        self
    }

    pub fn with_max_batch_size(mut self, max_batch_size: usize) -> Self {
        self.max_batch_size = max_batch_size;
        self
    }

    pub fn is_ready(&self) -> bool {
        self.artifacts.is_some()
    }

    /// Rejects empty batches, batches over `max_batch_size`, and any text
    /// that is empty or whitespace-only. Non-blank texts are not trimmed.
    fn validate(&self, texts: &[String]) -> Result<(), PredictionError> {
        if texts.is_empty() {
            return Err(PredictionError::invalid_request("texts must not be empty"));
        }
        if texts.len() > self.max_batch_size {
            return Err(PredictionError::invalid_request(format!(
                "batch of {} texts exceeds the limit of {}",
                texts.len(),
                self.max_batch_size
            )));
        }
        if let Some(index) = texts.iter().position(|text| text.trim().is_empty()) {
            return Err(PredictionError::invalid_request(format!(
                "text at index {index} is empty"
            )));
        }
        Ok(())
    }

    #[tracing::instrument(skip_all, fields(batch_size = texts.len()))]
    pub fn predict(&self, texts: &[String]) -> Result<Vec<SentimentResult>, PredictionError> {
        let result = self.run(texts);
        match &result {
            Ok(results) => {
                counter!("sentiment_predictions_total").increment(results.len() as u64);
                histogram!("sentiment_batch_size").record(results.len() as f64);
                tracing::debug!("Batch classified");
            }
            Err(e) => {
                counter!("sentiment_prediction_failures_total", "kind" => e.kind().as_str())
                    .increment(1);
                tracing::warn!(kind = e.kind().as_str(), error = %e, "Prediction failed");
            }
        }
        result
    }

    fn run(&self, texts: &[String]) -> Result<Vec<SentimentResult>, PredictionError> {
        let artifacts = self
            .artifacts
            .as_ref()
            .ok_or(PredictionError::ArtifactUnavailable)?;
        self.validate(texts)?;

        predict(
            artifacts.vectorizer.as_ref(),
            artifacts.classifier.as_ref(),
            self.normalizer.as_ref(),
            texts,
        )
        .map_err(PredictionError::inference)
    }
}
