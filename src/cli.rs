//! Local script runner: classify texts from the command line or stdin.

use anyhow::{Context, Result, bail};
use std::io::{Read, Write};

use crate::error::PredictionError;
use crate::service::PredictionService;
use crate::types::SentimentResult;

/// Splits raw multi-line input into trimmed, non-blank texts.
pub fn split_lines(input: &str) -> Vec<String> {
    input
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn read_texts(args: Vec<String>, stdin: impl Read) -> Result<Vec<String>> {
    if !args.is_empty() {
        return Ok(split_lines(&args.join("\n")));
    }
    let mut input = String::new();
    let mut stdin = stdin;
    stdin
        .read_to_string(&mut input)
        .context("failed to read texts from stdin")?;
    Ok(split_lines(&input))
}

pub fn write_results(results: &[SentimentResult], json: bool, mut out: impl Write) -> Result<()> {
    if json {
        serde_json::to_writer_pretty(&mut out, results)?;
        writeln!(out)?;
    } else {
        for result in results {
            writeln!(out, "{}\t{}", result.sentiment.display_name(), result.text)?;
        }
    }
    Ok(())
}

/// Returns without calling the service when there is nothing to classify.
pub fn run(
    service: &PredictionService,
    location: &str,
    texts: Vec<String>,
    json: bool,
    out: impl Write,
) -> Result<()> {
    if texts.is_empty() {
        tracing::warn!("Please enter some text to analyze.");
        return Ok(());
    }

    match service.predict(&texts) {
        Ok(results) => write_results(&results, json, out),
        Err(PredictionError::ArtifactUnavailable) => {
            bail!("Model files not found. Please ensure both artifacts are present in {location}.")
        }
        Err(e) => Err(e.into()),
    }
}
