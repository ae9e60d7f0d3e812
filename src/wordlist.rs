use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

/// One row of the input file: a word and its reference translation.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WordPair {
    pub word: String,
    pub translation: String,
    pub source_language: String,
    pub target_language: String,
}

/// Reads every `word,translation,source_language,target_language` row.
/// A row missing a column is an error, reported before any generation starts.
pub fn read_word_pairs(path: &Path) -> Result<Vec<WordPair>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .with_context(|| format!("Failed to open word list at {}", path.display()))?;

    let mut pairs = Vec::new();
    for (idx, record) in reader.deserialize().enumerate() {
        // +2: one for the header row, one for zero-based indexing
        let pair: WordPair = record
            .with_context(|| format!("Malformed row {} in {}", idx + 2, path.display()))?;
        pairs.push(pair);
    }

    Ok(pairs)
}
