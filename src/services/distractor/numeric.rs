use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;

use super::DistractorSource;
use crate::error::Result;

static INTEGER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+").unwrap());

const OFFSETS: [i64; 5] = [1, -1, 2, -2, 3];

/// Nearby integers for answers that contain a number: N+1, N-1, N+2, N-2, N+3.
///
/// Only the first integer in `answer` is used. Negative neighbours are
/// dropped since the extracted number is never signed.
pub fn numeric_distractors(answer: &str, k: usize) -> Vec<String> {
    let Some(n) = INTEGER
        .find(answer)
        .and_then(|m| m.as_str().parse::<i64>().ok())
    else {
        return Vec::new();
    };

    OFFSETS
        .iter()
        .filter_map(|off| n.checked_add(*off))
        .filter(|v| *v >= 0 && *v != n)
        .take(k)
        .map(|v| v.to_string())
        .collect()
}

pub struct NumericSource;

#[async_trait]
impl DistractorSource for NumericSource {
    fn name(&self) -> &'static str {
        "numeric"
    }

    fn gated(&self) -> bool {
        false
    }

    async fn propose(&self, _question: &str, answer: &str, remaining: usize) -> Result<Vec<String>> {
        Ok(numeric_distractors(answer, remaining))
    }
}
