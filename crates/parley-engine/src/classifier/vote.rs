//! Weighted voting over strategy results.
//!
//! Pure and synchronous so the decision rule can be tested without any
//! strategy behind it.

use parley_common::strategy::clamp_unit;
use parley_common::{Entities, IntentLabel, StrategyResult};

/// One strategy's result paired with that strategy's static weight.
#[derive(Debug, Clone)]
pub struct Vote {
    pub result: StrategyResult,
    pub weight: f64,
}

/// Accumulated support for one label.
#[derive(Debug, Clone)]
struct Tally<'a> {
    label: IntentLabel,
    score: f64,
    best: &'a StrategyResult,
    best_confidence: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Verdict {
    pub label: IntentLabel,
    /// `min(accumulated score, 1.0)`
    pub confidence: f64,
    pub entities: Entities,
    pub raw_score: f64,
}

/// Pick the label with the highest weighted score.
///
/// Ties on score go to the label whose best single result is more confident,
/// then to whichever label was voted for first in declaration order.
/// Returns `None` when every vote is `Unknown` or weightless.
pub fn aggregate(votes: &[Vote]) -> Option<Verdict> {
    let mut tallies: Vec<Tally<'_>> = Vec::new();

    for vote in votes {
        let weight = if vote.weight.is_finite() { vote.weight.max(0.0) } else { 0.0 };
        if vote.result.label.is_unknown() || weight == 0.0 {
            continue;
        }

        let confidence = clamp_unit(vote.result.confidence);
        let score = confidence * weight;

        match tallies.iter_mut().find(|t| t.label == vote.result.label) {
            Some(tally) => {
                tally.score += score;
                if confidence > tally.best_confidence {
                    tally.best = &vote.result;
                    tally.best_confidence = confidence;
                }
            }
            None => tallies.push(Tally {
                label: vote.result.label,
                score,
                best: &vote.result,
                best_confidence: confidence,
            }),
        }
    }

    let mut winner: Option<&Tally<'_>> = None;
    for tally in &tallies {
        let better = match winner {
            None => true,
            Some(current) => {
                tally.score > current.score
                    || (tally.score == current.score
                        && tally.best_confidence > current.best_confidence)
            }
        };
        if better {
            winner = Some(tally);
        }
    }

    winner.map(|t| Verdict {
        label: t.label,
        confidence: t.score.min(1.0),
        entities: t.best.entities.clone(),
        raw_score: t.score,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vote(label: IntentLabel, confidence: f64, weight: f64, name: &str) -> Vote {
        Vote {
            result: StrategyResult::new(label, confidence, Entities::new(), name),
            weight,
        }
    }

    #[test]
    fn test_weighted_sum_and_cap() {
        let votes = vec![
            vote(IntentLabel::OpenApplication, 0.8, 0.6, "pattern"),
            vote(IntentLabel::OpenApplication, 0.95, 1.0, "ai"),
            vote(IntentLabel::PlayMusic, 0.4, 0.8, "semantic"),
        ];
        let verdict = aggregate(&votes).unwrap();
        assert_eq!(verdict.label, IntentLabel::OpenApplication);
        assert_eq!(verdict.confidence, 1.0);
        assert!((verdict.raw_score - 1.43).abs() < 1e-9);
    }

    #[test]
    fn test_single_vote_scaled_by_weight() {
        let votes = vec![
            vote(IntentLabel::Unknown, 0.9, 1.0, "a"),
            vote(IntentLabel::SendSms, 0.7, 0.5, "b"),
        ];
        let verdict = aggregate(&votes).unwrap();
        assert_eq!(verdict.label, IntentLabel::SendSms);
        assert!((verdict.confidence - 0.35).abs() < 1e-9);
    }

    #[test]
    fn test_all_unknown_yields_none() {
        let votes = vec![
            vote(IntentLabel::Unknown, 0.9, 1.0, "a"),
            vote(IntentLabel::PlayMusic, 0.9, 0.0, "b"),
        ];
        assert!(aggregate(&votes).is_none());
    }

    #[test]
    fn test_tie_prefers_best_single_confidence() {
        // 0.5 * 1.0 == 1.0 * 0.5
        let votes = vec![
            vote(IntentLabel::PlayMusic, 0.5, 1.0, "a"),
            vote(IntentLabel::PauseMusic, 1.0, 0.5, "b"),
        ];
        assert_eq!(aggregate(&votes).unwrap().label, IntentLabel::PauseMusic);
    }

    #[test]
    fn test_full_tie_prefers_declaration_order() {
        let votes = vec![
            vote(IntentLabel::SendEmail, 0.5, 1.0, "a"),
            vote(IntentLabel::SendSms, 0.5, 1.0, "b"),
        ];
        assert_eq!(aggregate(&votes).unwrap().label, IntentLabel::SendEmail);

        let reversed: Vec<Vote> = votes.into_iter().rev().collect();
        assert_eq!(aggregate(&reversed).unwrap().label, IntentLabel::SendSms);
    }

    #[test]
    fn test_entities_come_from_most_confident_contributor() {
        let mut weak = vote(IntentLabel::OpenApplication, 0.4, 1.0, "weak");
        weak.result = weak.result.with_entity("application", "Chrome");
        let mut strong = vote(IntentLabel::OpenApplication, 0.9, 0.2, "strong");
        strong.result = strong.result.with_entity("application", "Spotify");

        let verdict = aggregate(&[weak, strong]).unwrap();
        assert_eq!(
            verdict.entities.get("application").and_then(|v| v.as_text()),
            Some("Spotify")
        );
    }

    #[test]
    fn test_confidence_always_in_unit_range() {
        let weights = [0.1, 0.5, 1.0, 3.0, 10.0];
        let confidences = [0.0, 0.3, 0.99, 1.0];
        for w in weights {
            for c in confidences {
                let votes = vec![
                    vote(IntentLabel::PlayMusic, c, w, "a"),
                    vote(IntentLabel::PlayMusic, c, w, "b"),
                ];
                if let Some(v) = aggregate(&votes) {
                    assert!((0.0..=1.0).contains(&v.confidence));
                }
            }
        }
    }
}
