use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use hf_hub::{Repo, RepoType, api::tokio::Api};
use std::fmt;
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use std::sync::Arc;

use crate::classifier::LogisticRegression;
use crate::engine::{Classifier, FeatureTransformer};
use crate::vectorizer::{CountVectorizer, VectorizerArtifact};

/// Where the two artifact files live.
#[async_trait]
pub trait ArtifactSource: fmt::Display + Send + Sync {
    /// Resolves `file_name` to a readable local path.
    async fn fetch(&self, file_name: &str) -> Result<PathBuf>;
}

#[derive(Debug, Clone)]
pub struct LocalDir {
    pub path: PathBuf,
}

#[async_trait]
impl ArtifactSource for LocalDir {
    async fn fetch(&self, file_name: &str) -> Result<PathBuf> {
        if !self.path.is_dir() {
            bail!("Model path {} is not a directory.", self.path.display());
        }
        let file = self.path.join(file_name);
        if !file.is_file() {
            bail!("Artifact {} not found", file.display());
        }
        Ok(file)
    }
}

impl fmt::Display for LocalDir {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path.display())
    }
}

#[derive(Debug, Clone)]
pub struct HubRepo {
    pub model_id: String,
    pub revision: String,
}

#[async_trait]
impl ArtifactSource for HubRepo {
    async fn fetch(&self, file_name: &str) -> Result<PathBuf> {
        let repo = Repo::with_revision(
            self.model_id.clone(),
            RepoType::Model,
            self.revision.clone(),
        );
        let api = Api::new()?;
        let path = api
            .repo(repo)
            .get(file_name)
            .await
            .with_context(|| format!("failed to download {file_name} from {self}"))?;
        Ok(path)
    }
}

impl fmt::Display for HubRepo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "hf://{}@{}", self.model_id, self.revision)
    }
}

#[derive(Debug, Clone)]
pub struct ArtifactFiles {
    pub vectorizer: String,
    pub classifier: String,
}

impl Default for ArtifactFiles {
    fn default() -> Self {
        Self {
            vectorizer: "vectorizer.json".to_string(),
            classifier: "classifier.safetensors".to_string(),
        }
    }
}

/// Both fitted artifacts. Only ever constructed as a complete pair.
#[derive(Clone)]
pub struct Artifacts {
    pub vectorizer: Arc<dyn FeatureTransformer>,
    pub classifier: Arc<dyn Classifier>,
}

impl Artifacts {
    pub fn new(vectorizer: Arc<dyn FeatureTransformer>, classifier: Arc<dyn Classifier>) -> Self {
        Self {
            vectorizer,
            classifier,
        }
    }
}

impl fmt::Debug for Artifacts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Artifacts")
            .field("n_features", &self.vectorizer.n_features())
            .finish_non_exhaustive()
    }
}

/// Loads both artifacts, logging and swallowing any failure.
///
/// `None` means neither handle is usable; the caller must refuse predictions.
#[tracing::instrument(skip_all, fields(source = %source))]
pub async fn load(source: &dyn ArtifactSource, files: &ArtifactFiles) -> Option<Artifacts> {
    match try_load(source, files).await {
        Ok(artifacts) => {
            tracing::info!(
                n_features = artifacts.vectorizer.n_features(),
                "Model artifacts loaded"
            );
            Some(artifacts)
        }
        Err(e) => {
            tracing::error!(error = %format!("{e:#}"), "Failed to load model artifacts");
            None
        }
    }
}

pub async fn try_load(source: &dyn ArtifactSource, files: &ArtifactFiles) -> Result<Artifacts> {
    let vectorizer_path = source.fetch(&files.vectorizer).await?;
    let classifier_path = source.fetch(&files.classifier).await?;

    let file = File::open(&vectorizer_path)
        .with_context(|| format!("failed to open {}", vectorizer_path.display()))?;
    let artifact = VectorizerArtifact::from_reader(BufReader::new(file))
        .with_context(|| format!("failed to read {}", vectorizer_path.display()))?;
    let vectorizer = CountVectorizer::try_from(artifact)
        .with_context(|| format!("invalid vectorizer {}", vectorizer_path.display()))?;

    let classifier = LogisticRegression::load(&classifier_path)
        .with_context(|| format!("failed to read {}", classifier_path.display()))?;

    if vectorizer.n_features() != classifier.n_features() {
        bail!(
            "vectorizer produces {} features but classifier expects {}",
            vectorizer.n_features(),
            classifier.n_features()
        );
    }

    Ok(Artifacts::new(Arc::new(vectorizer), Arc::new(classifier)))
}
