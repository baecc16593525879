use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CuratedEntry {
    /// Lower-case substring looked up in the answer.
    pub key: String,
    pub distractors: Vec<String>,
}

/// Read-only domain knowledge for the fallback stages: a curated table of
/// hand-picked distractors and a lexicon of related terms.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeBase {
    #[serde(default)]
    pub curated: Vec<CuratedEntry>,
    #[serde(default)]
    pub lexicon: HashMap<String, Vec<String>>,
}

impl KnowledgeBase {
    pub fn builtin() -> Self {
        let entry = |key: &str, distractors: &[&str]| CuratedEntry {
            key: key.to_string(),
            distractors: distractors.iter().map(|d| d.to_string()).collect(),
        };

        Self {
            curated: vec![
                entry(
                    "photosynthesis",
                    &["respiration", "chemosynthesis", "fermentation", "Calvin cycle"],
                ),
                entry(
                    "universal shift register",
                    &["RAM module", "ALU unit", "decoder", "multiplexer"],
                ),
                entry("adder", &["subtractor", "multiplier", "counter", "flip-flop"]),
            ],
            lexicon: HashMap::new(),
        }
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let mut kb: KnowledgeBase = serde_json::from_str(raw)?;
        kb.normalize();
        Ok(kb)
    }

    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = tokio::fs::read_to_string(path).await.map_err(|e| {
            Error::Config(format!("Cannot read knowledge base {}: {}", path.display(), e))
        })?;
        Self::from_json(&raw)
    }

    fn normalize(&mut self) {
        for entry in &mut self.curated {
            entry.key = entry.key.trim().to_lowercase();
        }
        self.curated.retain(|e| !e.key.is_empty());
        self.lexicon = std::mem::take(&mut self.lexicon)
            .into_iter()
            .map(|(word, related)| (word.trim().to_lowercase(), related))
            .collect();
    }

    pub fn related_terms(&self, word: &str) -> &[String] {
        self.lexicon
            .get(&word.trim().to_lowercase())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn curated_for<'a>(&'a self, answer: &str) -> impl Iterator<Item = &'a CuratedEntry> + 'a {
        let lowered = answer.to_lowercase();
        self.curated
            .iter()
            .filter(move |entry| lowered.contains(entry.key.as_str()))
    }
}
