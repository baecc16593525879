/// Ratio at or above which two strings count as near-duplicates.
pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.7;

/// Normalized similarity in `[0, 1]` between the lower-cased inputs.
///
/// Computed as `2 * LCS / (len(a) + len(b))` over chars, the same shape as a
/// classic sequence-matcher ratio. Two empty strings are identical (1.0).
pub fn similarity_ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.to_lowercase().chars().collect();
    let b: Vec<char> = b.to_lowercase().chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }

    let mut prev = vec![0usize; b.len() + 1];
    let mut curr = vec![0usize; b.len() + 1];
    for ca in &a {
        for (j, cb) in b.iter().enumerate() {
            curr[j + 1] = if ca == cb {
                prev[j] + 1
            } else {
                curr[j].max(prev[j + 1])
            };
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    (2 * prev[b.len()]) as f64 / total as f64
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimilarityGate {
    threshold: f64,
}

impl Default for SimilarityGate {
    fn default() -> Self {
        Self::new(DEFAULT_SIMILARITY_THRESHOLD)
    }
}

impl SimilarityGate {
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold: threshold.clamp(0.0, 1.0),
        }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn similar(&self, a: &str, b: &str) -> bool {
        similarity_ratio(a, b) >= self.threshold
    }
}

pub fn similar(a: &str, b: &str) -> bool {
    SimilarityGate::default().similar(a, b)
}
