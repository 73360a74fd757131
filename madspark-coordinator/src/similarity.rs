//! Text similarity feeding `Candidate.similarity_score` (§3, §4.9 step
//! 11): Jaccard overlap of an idea's normalized title+description tokens
//! before and after improvement.
//!
//! This is distinct from, and simpler than, duplicate/novelty detection
//! across *different* ideas — that comparison is out of scope (§1
//! Non-goals; §9 "novelty filter" open question) and left to an external
//! collaborator. This module only ever compares one idea against its own
//! later revision.

use std::collections::HashSet;

use madspark_contracts::Idea;

fn normalized_tokens(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Jaccard similarity of two strings' token sets, in `[0, 1]`. Two empty
/// strings are defined as identical (similarity `1.0`).
pub fn jaccard_similarity(a: &str, b: &str) -> f64 {
    let tokens_a = normalized_tokens(a);
    let tokens_b = normalized_tokens(b);
    if tokens_a.is_empty() && tokens_b.is_empty() {
        return 1.0;
    }
    let intersection = tokens_a.intersection(&tokens_b).count();
    let union = tokens_a.union(&tokens_b).count();
    if union == 0 {
        0.0
    } else {
        intersection as f64 / union as f64
    }
}

/// Similarity between an idea's original and improved text (§4.9 step 11).
pub fn idea_similarity(original: &Idea, improved: &Idea) -> f64 {
    let original_text = format!("{} {}", original.title, original.description);
    let improved_text = format!("{} {}", improved.title, improved.description);
    jaccard_similarity(&original_text, &improved_text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_text_has_similarity_one() {
        assert_eq!(jaccard_similarity("solar powered drones", "solar powered drones"), 1.0);
    }

    #[test]
    fn disjoint_text_has_similarity_zero() {
        assert_eq!(jaccard_similarity("apples and oranges", "trucks and roads"), 0.0);
    }

    #[test]
    fn partial_overlap_is_between_zero_and_one() {
        let score = jaccard_similarity("community garden on the rooftop", "community garden in the basement");
        assert!(score > 0.0 && score < 1.0);
    }

    #[test]
    fn idea_similarity_compares_title_and_description() {
        let original = Idea {
            index: 0,
            title: "Rooftop garden".into(),
            description: "Grow vegetables on apartment rooftops".into(),
            key_features: vec![],
            category: "urban farming".into(),
        };
        let mut improved = original.clone();
        improved.description = "Grow vegetables and herbs on apartment rooftops with drip irrigation".into();
        let score = idea_similarity(&original, &improved);
        assert!(score > 0.3 && score < 1.0);
    }
}
