//! Property-based tests for the exact medal engine and strength transform.

use proptest::prelude::*;

use podium_core::constants::MIN_STRENGTH;
use podium_core::plackett_luce::podium_probabilities;
use podium_core::{CompetitionInput, EntrantInput, ScoringDirection, StrengthTransform};

/// Strategy: raw scores for a field of 3-40 entrants, at least one positive.
fn scores_strategy() -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(0.0..1000.0f64, 3..40)
        .prop_filter("needs a positive score", |s| s.iter().any(|&x| x > 0.0))
}

fn field_input(scores: &[f64]) -> CompetitionInput {
    CompetitionInput {
        id: "prop".to_string(),
        name: "Property field".to_string(),
        sport: None,
        scoring: ScoringDirection::HigherIsBetter,
        entrants: scores
            .iter()
            .enumerate()
            .map(|(i, &score)| EntrantInput {
                id: i as i64,
                name: format!("E{i}"),
                country: format!("C{}", i % 5),
                score,
            })
            .collect(),
    }
}

fn probabilities(scores: &[f64], power: f64) -> Vec<[f64; 3]> {
    let field = StrengthTransform::new(power).unwrap().build_field(&field_input(scores)).unwrap();
    podium_probabilities(&field.strengths()).unwrap()
}

proptest! {
    // 1. Each medal is awarded exactly once
    #[test]
    fn columns_sum_to_one(scores in scores_strategy(), power in 0.5..4.0f64) {
        let p = probabilities(&scores, power);
        for pos in 0..3 {
            let sum: f64 = p.iter().map(|row| row[pos]).sum();
            prop_assert!((sum - 1.0).abs() < 1e-3, "position {pos} sums to {sum}");
        }
    }

    // 2. No entrant medals with probability above 1
    #[test]
    fn per_entrant_at_most_one(scores in scores_strategy()) {
        for row in probabilities(&scores, 2.0) {
            prop_assert!(row.iter().all(|&x| x >= 0.0));
            prop_assert!(row.iter().sum::<f64>() <= 1.0 + 1e-3, "{row:?}");
        }
    }

    // 3. Higher score, higher gold probability
    #[test]
    fn gold_monotone_in_score(scores in scores_strategy()) {
        let p = probabilities(&scores, 2.0);
        for i in 0..scores.len() {
            for j in 0..scores.len() {
                if scores[i] > scores[j] {
                    prop_assert!(p[i][0] >= p[j][0], "score {} vs {}", scores[i], scores[j]);
                }
            }
        }
    }

    // 4. A larger power concentrates gold on the leader
    #[test]
    fn power_sharpens_favourite(scores in scores_strategy()) {
        let leader = scores
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i)
            .unwrap();
        let second = scores.iter().filter(|&&s| s < scores[leader]).fold(0.0f64, |a, &b| a.max(b));
        let runner_up = second / scores[leader];
        // Strictness needs a runner-up that stays above the strength floor at
        // power 3 and is not a near-tie with the leader.
        prop_assume!(runner_up.powi(3) > MIN_STRENGTH && runner_up < 1.0 - 1e-6);
        let soft = probabilities(&scores, 1.0);
        let sharp = probabilities(&scores, 3.0);
        prop_assert!(
            sharp[leader][0] > soft[leader][0],
            "power 3 gold {} vs power 1 gold {}",
            sharp[leader][0],
            soft[leader][0]
        );
    }

    // 5. Equal scores give equal probabilities
    #[test]
    fn ties_are_symmetric(score in 1.0..1000.0f64, n in 3usize..30) {
        let p = probabilities(&vec![score; n], 2.0);
        let expected = 1.0 / n as f64;
        for row in p {
            for x in row {
                prop_assert!((x - expected).abs() < 1e-9);
            }
        }
    }

    // 6. Scaling every score leaves the distribution unchanged
    #[test]
    fn scale_invariant(scores in scores_strategy(), factor in 0.01..100.0f64) {
        let scaled: Vec<f64> = scores.iter().map(|s| s * factor).collect();
        let a = probabilities(&scores, 2.0);
        let b = probabilities(&scaled, 2.0);
        for (x, y) in a.iter().zip(&b) {
            for pos in 0..3 {
                prop_assert!((x[pos] - y[pos]).abs() < 1e-9);
            }
        }
    }
}
