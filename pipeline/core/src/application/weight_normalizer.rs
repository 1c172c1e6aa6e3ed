// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Weight Validator / Normalizer
//!
//! Enforces the attribution invariant before anything reaches the store:
//! a conversion's weights sum to 1 within
//! [`WEIGHT_TOLERANCE`](crate::domain::attribution::WEIGHT_TOLERANCE). Sums off by
//! more than the tolerance are rescaled; sets that cannot be rescaled
//! (zero or overflowing sum, non-finite or negative weights) are reported
//! and withheld.
//! [`verify`] repeats the check on what was actually persisted.

use std::collections::HashMap;

use crate::domain::attribution::{
    within_tolerance, AttributionWeight, ConversionWeightSum, NormalizationFailure,
    NormalizationFailureReason, NormalizedWeights, RescaledConversion, VerificationReport,
};
use crate::domain::touchpoint::ConversionId;

/// Normalize per conversion, keeping first-seen conversion order and row order.
pub fn normalize(weights: Vec<AttributionWeight>) -> NormalizedWeights {
    let mut order: Vec<ConversionId> = Vec::new();
    let mut groups: HashMap<ConversionId, Vec<AttributionWeight>> = HashMap::new();
    for weight in weights {
        let group = groups.entry(weight.conversion_id.clone()).or_insert_with(|| {
            order.push(weight.conversion_id.clone());
            Vec::new()
        });
        group.push(weight);
    }

    let mut result = NormalizedWeights::default();
    for conversion_id in order {
        let Some(mut rows) = groups.remove(&conversion_id) else {
            continue;
        };

        if let Some(reason) = invalid_reason(&rows) {
            result.failures.push(NormalizationFailure { conversion_id, reason });
            continue;
        }

        let sum: f64 = rows.iter().map(|w| w.weight).sum();
        if sum <= 0.0 {
            result.failures.push(NormalizationFailure {
                conversion_id,
                reason: NormalizationFailureReason::ZeroSum,
            });
            continue;
        }
        if !sum.is_finite() {
            result.failures.push(NormalizationFailure {
                conversion_id,
                reason: NormalizationFailureReason::Unscalable,
            });
            continue;
        }

        if !within_tolerance(sum) {
            // 1/sum overflows for subnormal sums
            for row in &mut rows {
                row.weight /= sum;
            }
            let rescaled_sum: f64 = rows.iter().map(|w| w.weight).sum();
            if !within_tolerance(rescaled_sum) {
                result.failures.push(NormalizationFailure {
                    conversion_id,
                    reason: NormalizationFailureReason::Unscalable,
                });
                continue;
            }
            result.rescaled.push(RescaledConversion {
                conversion_id,
                original_sum: sum,
            });
        }

        result.weights.extend(rows);
    }

    result
}

fn invalid_reason(rows: &[AttributionWeight]) -> Option<NormalizationFailureReason> {
    if rows.iter().any(|w| !w.weight.is_finite()) {
        Some(NormalizationFailureReason::NonFinite)
    } else if rows.iter().any(|w| w.weight < 0.0) {
        Some(NormalizationFailureReason::NegativeWeight)
    } else {
        None
    }
}

/// Check persisted per-conversion sums against the tolerance.
pub fn verify(sums: Vec<ConversionWeightSum>) -> VerificationReport {
    let total_conversions = sums.len();
    let violations: Vec<ConversionWeightSum> = sums
        .into_iter()
        .filter(|s| !within_tolerance(s.weight_sum))
        .collect();

    VerificationReport {
        total_conversions,
        within_tolerance: total_conversions - violations.len(),
        violations,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::attribution::WEIGHT_TOLERANCE;

    fn w(conversion: &str, session: &str, weight: f64) -> AttributionWeight {
        AttributionWeight::new(conversion.into(), session.into(), weight)
    }

    fn sums_by_conversion(weights: &[AttributionWeight]) -> HashMap<String, f64> {
        let mut sums = HashMap::new();
        for weight in weights {
            *sums.entry(weight.conversion_id.as_str().to_string()).or_insert(0.0) += weight.weight;
        }
        sums
    }

    #[test]
    fn test_rescales_short_sum() {
        let result = normalize(vec![w("c2", "s1", 0.3), w("c2", "s2", 0.3)]);

        assert_eq!(result.weights.len(), 2);
        assert!((result.weights[0].weight - 0.5).abs() < 1e-12);
        assert!((result.weights[1].weight - 0.5).abs() < 1e-12);
        assert_eq!(result.rescaled.len(), 1);
        assert!((result.rescaled[0].original_sum - 0.6).abs() < 1e-12);
        assert!(result.failures.is_empty());
    }

    #[test]
    fn test_within_tolerance_passes_unchanged() {
        let input = vec![w("c1", "s1", 0.25), w("c1", "s2", 0.75000005)];
        let result = normalize(input.clone());

        assert_eq!(result.weights, input);
        assert!(result.rescaled.is_empty());
    }

    #[test]
    fn test_zero_sum_is_a_failure_not_a_division() {
        let result = normalize(vec![
            w("c1", "s1", 0.0),
            w("c1", "s2", 0.0),
            w("c2", "s3", 1.0),
        ]);

        assert_eq!(result.weights, vec![w("c2", "s3", 1.0)]);
        assert_eq!(result.failures.len(), 1);
        assert_eq!(result.failures[0].conversion_id.as_str(), "c1");
        assert_eq!(result.failures[0].reason, NormalizationFailureReason::ZeroSum);
    }

    #[test]
    fn test_invalid_weights_are_rejected() {
        let result = normalize(vec![
            w("nan", "s1", f64::NAN),
            w("neg", "s1", -0.2),
            w("neg", "s2", 1.2),
        ]);

        assert!(result.weights.is_empty());
        let reasons: Vec<_> = result.failures.iter().map(|f| f.reason).collect();
        assert_eq!(
            reasons,
            vec![NormalizationFailureReason::NonFinite, NormalizationFailureReason::NegativeWeight]
        );
    }

    #[test]
    fn test_interleaved_rows_keep_first_seen_order() {
        let result = normalize(vec![
            w("b", "s1", 0.5),
            w("a", "s2", 2.0),
            w("b", "s3", 0.5),
        ]);

        let ids: Vec<&str> = result.weights.iter().map(|w| w.conversion_id.as_str()).collect();
        assert_eq!(ids, vec!["b", "b", "a"]);
        assert_eq!(result.weights[2].weight, 1.0);
    }

    #[test]
    fn test_normalized_sums_hold_invariant() {
        let mut input = Vec::new();
        for c in 0..25 {
            for s in 0..(c % 7 + 1) {
                input.push(w(&format!("c{}", c), &format!("s{}", s), (s as f64 + 1.0) * (c as f64 + 0.3)));
            }
        }

        let result = normalize(input);

        assert!(result.failures.is_empty());
        for (conversion, sum) in sums_by_conversion(&result.weights) {
            assert!((sum - 1.0).abs() <= WEIGHT_TOLERANCE, "{} sums to {}", conversion, sum);
        }
    }

    #[test]
    fn test_subnormal_sum_rescales_to_one() {
        let result = normalize(vec![w("c", "s1", 1e-310), w("c", "s2", 0.0)]);

        assert!(result.failures.is_empty());
        assert_eq!(result.weights, vec![w("c", "s1", 1.0), w("c", "s2", 0.0)]);
        assert_eq!(result.rescaled.len(), 1);
    }

    #[test]
    fn test_overflowing_sum_is_withheld() {
        let result = normalize(vec![
            w("c", "s1", 1e308),
            w("c", "s2", 1e308),
            w("ok", "s3", 1.0),
        ]);

        assert_eq!(result.weights, vec![w("ok", "s3", 1.0)]);
        assert!(result.rescaled.is_empty());
        assert_eq!(
            result.failures,
            vec![NormalizationFailure {
                conversion_id: "c".into(),
                reason: NormalizationFailureReason::Unscalable,
            }]
        );
    }

    #[test]
    fn test_verify_reports_violations() {
        let report = verify(vec![
            ConversionWeightSum { conversion_id: "ok".into(), weight_sum: 1.00005 },
            ConversionWeightSum { conversion_id: "low".into(), weight_sum: 0.9 },
            ConversionWeightSum { conversion_id: "nan".into(), weight_sum: f64::NAN },
        ]);

        assert_eq!(report.total_conversions, 3);
        assert_eq!(report.within_tolerance, 1);
        let ids: Vec<&str> = report.violations.iter().map(|v| v.conversion_id.as_str()).collect();
        assert_eq!(ids, vec!["low", "nan"]);
        assert!(!report.is_clean());
    }
}
