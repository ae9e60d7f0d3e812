use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::llm::DistractorSet;

/// One finalized output entry, keyed by the source word in the output file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistractorEntry {
    pub theme: String,
    pub distractors: Vec<String>,
}

impl From<DistractorSet> for DistractorEntry {
    fn from(set: DistractorSet) -> Self {
        Self {
            theme: set.theme,
            distractors: set.distractors,
        }
    }
}

pub fn write_distractors(
    path: &Path,
    entries: &BTreeMap<String, DistractorEntry>,
) -> Result<()> {
    let contents = serde_json::to_string_pretty(entries)?;
    fs::write(path, format!("{}\n", contents))
        .with_context(|| format!("Failed to write distractors to {}", path.display()))?;
    Ok(())
}
