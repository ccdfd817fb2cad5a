use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::loader::{ArtifactFiles, ArtifactSource, HubRepo, LocalDir};
use crate::service::DEFAULT_MAX_BATCH_SIZE;

#[derive(Debug, Clone, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// Server host to bind to
    #[arg(long, env = "HOST", default_value = "127.0.0.1", global = true)]
    pub host: String,

    /// Server port to bind to
    #[arg(long, env = "PORT", default_value = "8000", global = true)]
    pub port: u16,

    /// Model ID on the Hugging Face Hub holding both artifacts
    #[arg(long, env = "MODEL_ID", global = true)]
    pub model_id: Option<String>,

    /// Local directory holding both artifacts
    #[arg(long, env = "MODEL_PATH", default_value = "models", global = true)]
    pub model_path: PathBuf,

    /// Model revision/branch on Hugging Face
    #[arg(long, env = "MODEL_REVISION", default_value = "main", global = true)]
    pub model_revision: String,

    /// File name of the vectorizer artifact
    #[arg(long, env = "VECTORIZER_FILE", default_value = "vectorizer.json", global = true)]
    pub vectorizer_file: String,

    /// File name of the classifier artifact
    #[arg(
        long,
        env = "CLASSIFIER_FILE",
        default_value = "classifier.safetensors",
        global = true
    )]
    pub classifier_file: String,

    /// Maximum number of texts accepted in one request
    #[arg(long, env = "MAX_BATCH_SIZE", default_value_t = DEFAULT_MAX_BATCH_SIZE, global = true)]
    pub max_batch_size: usize,

    /// Emit logs as JSON
    #[arg(long, env = "LOG_JSON", global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Serve the HTTP API (default)
    Serve,
    /// Classify texts given as arguments, or one per line on stdin
    Predict {
        texts: Vec<String>,

        /// Print results as a JSON array
        #[arg(long)]
        json: bool,
    },
}

impl Config {
    /// A hub model ID takes precedence over the local directory.
    pub fn artifact_source(&self) -> Box<dyn ArtifactSource> {
        match &self.model_id {
            Some(model_id) => Box::new(HubRepo {
                model_id: model_id.clone(),
                revision: self.model_revision.clone(),
            }),
            None => Box::new(LocalDir {
                path: self.model_path.clone(),
            }),
        }
    }

    pub fn artifact_files(&self) -> ArtifactFiles {
        ArtifactFiles {
            vectorizer: self.vectorizer_file.clone(),
            classifier: self.classifier_file.clone(),
        }
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
