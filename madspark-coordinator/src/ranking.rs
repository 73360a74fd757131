//! Candidate construction and final-ranking helpers shared by the Sync
//! (C9) and Async (C10) coordinators (§3, §4.9 steps 1 and 11).

use madspark_contracts::{Candidate, Idea};

use crate::similarity::idea_similarity;

/// A fresh candidate seeded from a generated idea, before any other
/// stage has run (§4.9 step 2): zero scores, no prior-stage signals, and
/// the improved idea defaulting to the original until the Improver runs.
pub fn new_candidate(idea: &Idea, tags: &[String]) -> Candidate {
    Candidate {
        original_idea: idea.clone(),
        initial_score: 0.0,
        initial_critique: String::new(),
        advocacy: None,
        skepticism: None,
        multi_dim_evaluation: None,
        logical_inference: None,
        improved_idea: idea.clone(),
        improved_score: 0.0,
        improved_critique: String::new(),
        score_delta: 0.0,
        is_meaningful_improvement: false,
        similarity_score: 0.0,
        tags: tags.to_vec(),
    }
}

/// Selects the top `k` candidates by initial score (§4.9 step 3), ties
/// broken by ascending idea index for determinism. `k` is floored at 1
/// regardless of the caller's request (an empty shortlist would starve
/// every downstream stage).
pub fn top_k(mut candidates: Vec<Candidate>, k: usize) -> Vec<Candidate> {
    candidates.sort_by(|a, b| {
        b.initial_score
            .partial_cmp(&a.initial_score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.original_idea.index.cmp(&b.original_idea.index))
    });
    candidates.truncate(k.max(1));
    candidates
}

/// Computes `score_delta`/`similarity_score`/`is_meaningful_improvement`
/// and sorts into the final ranking order (§3, §8).
pub fn finalize(mut candidates: Vec<Candidate>) -> Vec<Candidate> {
    for candidate in &mut candidates {
        candidate.score_delta = candidate.improved_score - candidate.initial_score;
        candidate.similarity_score = idea_similarity(&candidate.original_idea, &candidate.improved_idea);
        candidate.is_meaningful_improvement = Candidate::is_meaningful(candidate.similarity_score, candidate.score_delta);
    }
    candidates.sort_by_key(|c| c.ranking_key());
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;

    fn idea(index: u32) -> Idea {
        Idea {
            index,
            title: format!("Idea {index}"),
            description: "desc".into(),
            key_features: vec![],
            category: "x".into(),
        }
    }

    #[test]
    fn top_k_breaks_ties_by_ascending_index() {
        let mut candidates = vec![new_candidate(&idea(2), &[]), new_candidate(&idea(0), &[]), new_candidate(&idea(1), &[])];
        for candidate in &mut candidates {
            candidate.initial_score = 5.0;
        }
        let selected = top_k(candidates, 2);
        assert_eq!(selected.len(), 2);
        assert_eq!(selected[0].original_idea.index, 0);
        assert_eq!(selected[1].original_idea.index, 1);
    }

    #[test]
    fn top_k_never_truncates_to_zero() {
        let candidates = vec![new_candidate(&idea(0), &[])];
        let selected = top_k(candidates, 0);
        assert_eq!(selected.len(), 1);
    }

    #[test]
    fn finalize_sorts_by_improved_then_initial_score_desc() {
        let mut a = new_candidate(&idea(0), &[]);
        a.initial_score = 5.0;
        a.improved_score = 9.0;
        let mut b = new_candidate(&idea(1), &[]);
        b.initial_score = 8.0;
        b.improved_score = 9.0;
        let ranked = finalize(vec![a, b]);
        // Equal improved_score (tie) resolved by initial_score desc: b first.
        assert_eq!(ranked[0].original_idea.index, 1);
        assert_eq!(ranked[1].original_idea.index, 0);
    }
}
