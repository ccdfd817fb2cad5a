use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize)]
pub struct PredictRequest {
    pub texts: Vec<String>,
}

/// Binary sentiment label, serialized as the bare integer the model emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum Sentiment {
    Negative,
    Positive,
}

impl Sentiment {
    pub const NEGATIVE_LABEL: u8 = 0;
    pub const POSITIVE_LABEL: u8 = 1;

    pub fn label(self) -> u8 {
        match self {
            Sentiment::Negative => Self::NEGATIVE_LABEL,
            Sentiment::Positive => Self::POSITIVE_LABEL,
        }
    }

    /// Maps a logistic decision score to a label. Zero is negative.
    pub fn from_decision(score: f32) -> Self {
        if score > 0.0 {
            Sentiment::Positive
        } else {
            Sentiment::Negative
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Sentiment::Negative => "Negative",
            Sentiment::Positive => "Positive",
        }
    }
}

impl From<Sentiment> for u8 {
    fn from(sentiment: Sentiment) -> Self {
        sentiment.label()
    }
}

impl TryFrom<u8> for Sentiment {
    type Error = String;

    fn try_from(label: u8) -> Result<Self, Self::Error> {
        match label {
            Self::NEGATIVE_LABEL => Ok(Sentiment::Negative),
            Self::POSITIVE_LABEL => Ok(Sentiment::Positive),
            other => Err(format!("unknown sentiment label {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentimentResult {
    pub text: String,
    pub sentiment: Sentiment,
}
