//! Baseline/candidate comparison.
//!
//! All compared metrics are lower-is-better (seconds, bytes, files), so
//! the delta is oriented with positive meaning the candidate improved
//! on the baseline:
//!
//! ```text
//! delta_pct = (baseline - candidate) / baseline * 100
//! ```
//!
//! A zero baseline yields a zero delta rather than a division error.

use serde::Serialize;

/// Result of comparing one metric across the two subjects.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonResult {
    pub metric_name: String,
    pub baseline_value: f64,
    pub candidate_value: f64,
    /// Absolute reduction, `baseline - candidate`.
    pub delta_abs: f64,
    /// Percentage reduction relative to the baseline. Positive means
    /// the candidate used less.
    pub delta_pct: f64,
}

pub fn compare(metric_name: &str, baseline: f64, candidate: f64) -> ComparisonResult {
    let delta_abs = baseline - candidate;
    let delta_pct = if baseline == 0.0 {
        0.0
    } else {
        delta_abs / baseline * 100.0
    };
    ComparisonResult {
        metric_name: metric_name.to_string(),
        baseline_value: baseline,
        candidate_value: candidate,
        delta_abs,
        delta_pct,
    }
}

/// How much candidate overhead a metric tolerates before the comparison
/// counts as a regression.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct OverheadPolicy {
    pub max_overhead_pct: f64,
}

impl OverheadPolicy {
    /// No overhead tolerated: any negative delta is a regression.
    pub fn strict() -> Self {
        Self {
            max_overhead_pct: 0.0,
        }
    }

    /// Tolerates up to `pct` percent of candidate overhead. Used for
    /// metrics where the candidate is expected to spend more in some
    /// setups, e.g. catalog bytes dwarfing inlined small writes.
    pub fn allowing(pct: f64) -> Self {
        Self {
            max_overhead_pct: pct.max(0.0),
        }
    }

    pub fn judge(&self, result: &ComparisonResult) -> DeltaVerdict {
        if result.delta_pct > 0.0 {
            return DeltaVerdict::Improvement;
        }
        let overhead = -result.delta_pct;
        if overhead <= self.max_overhead_pct {
            DeltaVerdict::Acceptable
        } else {
            DeltaVerdict::Regression
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeltaVerdict {
    Improvement,
    Acceptable,
    Regression,
}

impl std::fmt::Display for DeltaVerdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeltaVerdict::Improvement => write!(f, "improvement"),
            DeltaVerdict::Acceptable => write!(f, "acceptable"),
            DeltaVerdict::Regression => write!(f, "regression"),
        }
    }
}

/// A comparison together with its policy verdict, ready for reporting.
#[derive(Debug, Clone, Serialize)]
pub struct JudgedComparison {
    pub comparison: ComparisonResult,
    pub verdict: DeltaVerdict,
}

pub fn judge(
    metric_name: &str,
    baseline: f64,
    candidate: f64,
    policy: OverheadPolicy,
) -> JudgedComparison {
    let comparison = compare(metric_name, baseline, candidate);
    let verdict = policy.judge(&comparison);
    JudgedComparison {
        comparison,
        verdict,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_baseline_never_divides() {
        let r = compare("elapsed_secs", 0.0, 12.5);
        assert_eq!(r.delta_pct, 0.0);
        assert_eq!(r.delta_abs, -12.5);

        let r = compare("elapsed_secs", 0.0, 0.0);
        assert_eq!(r.delta_pct, 0.0);
    }

    #[test]
    fn fewer_files_is_a_positive_delta() {
        let r = compare("total_files", 44.0, 11.0);
        assert!((r.delta_pct - 75.0).abs() < 1e-9);
        assert_eq!(OverheadPolicy::strict().judge(&r), DeltaVerdict::Improvement);
    }

    #[test]
    fn catalog_heavy_storage_reads_as_large_negative_delta() {
        let baseline = 30_720.0;
        let candidate = 3_984_588.0;
        let r = compare("storage_bytes", baseline, candidate);
        let expected = (baseline - candidate) / baseline * 100.0;
        assert!((r.delta_pct - expected).abs() < 1e-6);
        assert!(r.delta_pct < -12_000.0);
        assert_eq!(OverheadPolicy::strict().judge(&r), DeltaVerdict::Regression);
        assert_eq!(
            OverheadPolicy::allowing(13_000.0).judge(&r),
            DeltaVerdict::Acceptable
        );
    }

    #[test]
    fn equal_values_are_acceptable_not_improved() {
        let r = compare("row_count", 5.0, 5.0);
        assert_eq!(r.delta_pct, 0.0);
        assert_eq!(OverheadPolicy::strict().judge(&r), DeltaVerdict::Acceptable);
    }

    #[test]
    fn overhead_allowance_is_inclusive() {
        let at_limit = compare("storage_bytes", 100.0, 110.0);
        assert_eq!(
            OverheadPolicy::allowing(10.0).judge(&at_limit),
            DeltaVerdict::Acceptable
        );
        let past_limit = compare("storage_bytes", 100.0, 111.0);
        assert_eq!(
            OverheadPolicy::allowing(10.0).judge(&past_limit),
            DeltaVerdict::Regression
        );
    }

    #[test]
    fn judge_bundles_comparison_and_verdict() {
        let j = judge("elapsed_secs", 10.0, 4.0, OverheadPolicy::strict());
        assert_eq!(j.verdict, DeltaVerdict::Improvement);
        assert!((j.comparison.delta_pct - 60.0).abs() < 1e-9);
    }
}
