/// Result of a match scan after the threshold cut
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Match { id: String, confidence: f32 },
    NoMatch,
}

/// Running best-candidate tracker for the linear scan.
///
/// Starts from a -1.0 sentinel, below any dot product of unit vectors, so
/// the first scored candidate always becomes the initial best. Strict `>`
/// keeps the earliest-seen candidate on ties.
#[derive(Debug)]
pub struct BestMatch {
    best_id: Option<String>,
    best_score: f32,
}

impl BestMatch {
    pub fn new() -> Self {
        Self {
            best_id: None,
            best_score: -1.0,
        }
    }

    /// Record a scored candidate
    pub fn observe(&mut self, id: &str, score: f32) {
        if score > self.best_score {
            self.best_score = score;
            self.best_id = Some(id.to_string());
        }
    }

    /// Apply the confidence threshold after the scan.
    ///
    /// A best score strictly below the threshold reports no match; a score
    /// exactly at the threshold clears it.
    pub fn into_outcome(self, threshold: f32) -> Outcome {
        match self.best_id {
            Some(id) if self.best_score >= threshold => Outcome::Match {
                id,
                confidence: self.best_score,
            },
            _ => Outcome::NoMatch,
        }
    }
}

impl Default for BestMatch {
    fn default() -> Self {
        Self::new()
    }
}
