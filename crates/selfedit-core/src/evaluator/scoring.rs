//! Token-overlap scoring and the three-way decision.

use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use selfedit_state::CandidateStatus;

fn non_word() -> &'static Regex {
    static NON_WORD: OnceLock<Regex> = OnceLock::new();
    NON_WORD.get_or_init(|| Regex::new(r"[^A-Za-z0-9_]+").expect("static pattern"))
}

/// Lower-cased word tokens of `text`, deduplicated. Word characters are
/// ASCII letters, digits and `_`; any other character separates tokens.
pub fn tokens(text: &str) -> HashSet<String> {
    non_word()
        .split(&text.to_lowercase())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Jaccard similarity of the token sets of `a` and `b`; 0 when both are empty.
pub fn jaccard(a: &str, b: &str) -> f64 {
    let ta = tokens(a);
    let tb = tokens(b);
    let union = ta.union(&tb).count();
    if union == 0 {
        return 0.0;
    }
    let inter = ta.intersection(&tb).count();
    inter as f64 / union as f64
}

/// Arithmetic mean; 0 for an empty slice.
pub fn mean(scores: &[f64]) -> f64 {
    if scores.is_empty() {
        return 0.0;
    }
    scores.iter().sum::<f64>() / scores.len() as f64
}

/// Outcome of comparing an average score with the thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Pass,
    HumanReview,
    Reject,
}

impl Decision {
    /// Terminal candidate status for this decision.
    pub fn status(&self) -> CandidateStatus {
        match self {
            Decision::Pass => CandidateStatus::Accepted,
            Decision::HumanReview => CandidateStatus::HumanReview,
            Decision::Reject => CandidateStatus::Rejected,
        }
    }

    /// `(passThreshold, requireHuman)` flags of an evaluation result.
    pub fn flags(&self) -> (bool, bool) {
        match self {
            Decision::Pass => (true, false),
            Decision::HumanReview => (false, true),
            Decision::Reject => (false, false),
        }
    }

    /// Recover the decision from stored flags; pass wins over review.
    pub fn from_flags(pass_threshold: bool, require_human: bool) -> Self {
        if pass_threshold {
            Decision::Pass
        } else if require_human {
            Decision::HumanReview
        } else {
            Decision::Reject
        }
    }
}

/// Lower-inclusive cut points. Pass is checked first.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DecisionThresholds {
    pub pass: f64,
    pub review: f64,
}

impl Default for DecisionThresholds {
    fn default() -> Self {
        Self {
            pass: 0.60,
            review: 0.50,
        }
    }
}

impl DecisionThresholds {
    pub fn decide(&self, avg: f64) -> Decision {
        if avg >= self.pass {
            Decision::Pass
        } else if avg >= self.review {
            Decision::HumanReview
        } else {
            Decision::Reject
        }
    }
}
