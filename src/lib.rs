pub mod classifier;
pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod loader;
pub mod server;
pub mod service;
pub mod types;
pub mod vectorizer;

pub use error::{ErrorKind, PredictionError};
pub use loader::Artifacts;
pub use service::PredictionService;
pub use types::{PredictRequest, Sentiment, SentimentResult};
