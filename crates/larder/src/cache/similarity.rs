//! Weighted similarity between two fingerprints, behind a hard safety gate.
//!
//! Two fingerprints are only *eligible* for comparison if their allergy sets
//! are exactly equal. Eligible pairs get a score in `[0, 1]`:
//!
//! | Factor | Default weight | Value |
//! |--------|----------------|-------|
//! | prompt | 0.4 | prompt word overlap × preferences-segment overlap |
//! | skill | 0.1 | 1 if equal, else 0 |
//! | dietary | 0.2 | set overlap, both empty = 1 |
//! | allergy | 0.2 | always 1 once the gate has passed |
//! | tools | 0.1 | set overlap, both empty = 1 |
//!
//! Overlap is `|A ∩ B| / max(|A|, |B|)`.

use super::config::SimilarityWeights;
use crate::context::FingerprintInput;
use crate::context::normalize::BLOB_SEPARATOR;
use std::collections::BTreeSet;

/// Result of comparing two fingerprints.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Similarity {
    /// The allergy sets differ; the pair must never be treated as similar.
    Ineligible,
    /// Weighted score in `[0, 1]`.
    Score(f64),
}

impl Similarity {
    pub fn score(self) -> Option<f64> {
        match self {
            Similarity::Ineligible => None,
            Similarity::Score(s) => Some(s),
        }
    }

    /// Eligible and at or above `threshold`.
    pub fn passes(self, threshold: f64) -> bool {
        self.score().is_some_and(|s| s >= threshold)
    }
}

/// Scores fingerprint pairs with a fixed set of weights.
#[derive(Debug, Clone, Default)]
pub struct SimilarityScorer {
    weights: SimilarityWeights,
}

impl SimilarityScorer {
    pub fn new(weights: SimilarityWeights) -> Self {
        Self { weights }
    }

    pub fn weights(&self) -> &SimilarityWeights {
        &self.weights
    }

    /// Compare `a` and `b`. Symmetric.
    pub fn score(&self, a: &FingerprintInput, b: &FingerprintInput) -> Similarity {
        if a.allergies != b.allergies {
            return Similarity::Ineligible;
        }

        let w = &self.weights;
        let prompt = overlap(&prompt_tokens(&a.prompt_text), &prompt_tokens(&b.prompt_text))
            * overlap(
                &blob_segments(&a.preferences_blob),
                &blob_segments(&b.preferences_blob),
            );
        let skill = if a.skill_level == b.skill_level {
            1.0
        } else {
            0.0
        };
        let dietary = overlap(&a.dietary_restrictions, &b.dietary_restrictions);
        let tools = overlap(&a.kitchen_tools, &b.kitchen_tools);

        let total =
            w.prompt * prompt + w.skill * skill + w.dietary * dietary + w.allergy + w.tools * tools;
        Similarity::Score(total.clamp(0.0, 1.0))
    }
}

/// `|A ∩ B| / max(|A|, |B|)`, with two empty sets counting as a full match.
pub fn overlap<T: Ord>(a: &BTreeSet<T>, b: &BTreeSet<T>) -> f64 {
    let max = a.len().max(b.len());
    if max == 0 {
        return 1.0;
    }
    a.intersection(b).count() as f64 / max as f64
}

/// Word-level token set: lower-cased alphanumeric runs.
pub fn prompt_tokens(text: &str) -> BTreeSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

fn blob_segments(blob: &str) -> BTreeSet<&str> {
    blob.split(BLOB_SEPARATOR)
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn base() -> FingerprintInput {
        FingerprintInput {
            prompt_text: "quick breakfast with eggs".into(),
            skill_level: "basic_skills".into(),
            dietary_restrictions: set(&["vegetarian"]),
            allergies: set(&[]),
            kitchen_tools: set(&["stove", "pan", "oven", "whisk", "bowl"]),
            preferences_blob: String::new(),
        }
    }

    #[test]
    fn identical_fingerprints_score_one() {
        let s = SimilarityScorer::default().score(&base(), &base());
        assert_eq!(s, Similarity::Score(1.0));
    }

    #[test]
    fn allergy_mismatch_is_ineligible_both_ways() {
        let scorer = SimilarityScorer::default();
        let mut peanut = base();
        peanut.allergies = set(&["peanuts"]);
        assert_eq!(scorer.score(&base(), &peanut), Similarity::Ineligible);
        assert_eq!(scorer.score(&peanut, &base()), Similarity::Ineligible);
        assert!(!scorer.score(&peanut, &base()).passes(0.0));
    }

    #[test]
    fn allergy_subset_is_still_ineligible() {
        let scorer = SimilarityScorer::default();
        let mut a = base();
        a.allergies = set(&["peanuts"]);
        let mut b = base();
        b.allergies = set(&["peanuts", "shellfish"]);
        assert_eq!(scorer.score(&a, &b), Similarity::Ineligible);
    }

    #[test]
    fn one_extra_tool_stays_above_default_threshold() {
        let mut other = base();
        other.kitchen_tools.insert("blender".into());
        let s = SimilarityScorer::default().score(&base(), &other);
        // 0.4 + 0.1 + 0.2 + 0.2 + 0.1 * 5/6
        let expected = 0.9 + 0.1 * (5.0 / 6.0);
        assert!((s.score().unwrap() - expected).abs() < 1e-9);
        assert!(s.passes(0.8));
    }

    #[test]
    fn unrelated_requests_score_low() {
        let a = base();
        let b = FingerprintInput {
            prompt_text: "slow cooked beef stew".into(),
            skill_level: "advanced".into(),
            dietary_restrictions: set(&["keto"]),
            allergies: set(&[]),
            kitchen_tools: set(&["slow cooker"]),
            preferences_blob: String::new(),
        };
        let s = SimilarityScorer::default().score(&a, &b).score().unwrap();
        // Only the allergy factor contributes.
        assert!((s - 0.2).abs() < 1e-9);
        assert!(!Similarity::Score(s).passes(0.8));
    }

    #[test]
    fn prompt_overlap_is_order_independent() {
        let mut a = base();
        a.prompt_text = "eggs with quick breakfast".into();
        let s = SimilarityScorer::default().score(&a, &base());
        assert_eq!(s, Similarity::Score(1.0));
    }

    #[test]
    fn differing_preferences_reduce_prompt_factor() {
        let mut a = base();
        a.preferences_blob = "style=rustic;spice=mild".into();
        let mut b = base();
        b.preferences_blob = "style=rustic;spice=hot".into();
        let s = SimilarityScorer::default().score(&a, &b).score().unwrap();
        // prompt factor halves: 0.4 * 0.5
        assert!((s - 0.8).abs() < 1e-9);
    }

    #[test]
    fn overlap_uses_larger_set() {
        assert_eq!(overlap(&set(&["a", "b"]), &set(&["a", "b", "c", "d"])), 0.5);
        assert_eq!(overlap::<String>(&set(&[]), &set(&[])), 1.0);
        assert_eq!(overlap(&set(&["a"]), &set(&[])), 0.0);
    }

    #[test]
    fn tokens_ignore_punctuation_and_case() {
        assert_eq!(
            prompt_tokens("Eggs, toast & EGGS!"),
            set(&["eggs", "toast"])
        );
    }

    #[test]
    fn custom_weights_are_applied() {
        let scorer = SimilarityScorer::new(SimilarityWeights {
            prompt: 0.0,
            skill: 0.0,
            dietary: 0.0,
            allergy: 0.0,
            tools: 1.0,
        });
        let mut other = base();
        other.kitchen_tools = set(&["stove"]);
        let s = scorer.score(&base(), &other).score().unwrap();
        assert!((s - 0.2).abs() < 1e-9);
    }
}
