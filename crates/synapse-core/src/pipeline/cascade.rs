//! Evidence selection over graded fragments.
//!
//! Pure function of retrieval order and per-fragment grading results. Failed grades
//! count as [`Verdict::Partial`] unless every grade failed, in which case the raw
//! floor is used.

use super::GradingUnavailable;
use super::types::{EvidenceTier, Fragment, GradeSummary, Verdict};

pub const DEFAULT_PARTIAL_SUPPORT_LIMIT: usize = 2;
pub const DEFAULT_FLOOR_SIZE: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CascadePolicy {
    /// Partials appended after the relevant set when at least one fragment is relevant.
    pub partial_support_limit: usize,
    /// Raw fragments taken when nothing was graded relevant or partial.
    pub floor_size: usize,
}

impl Default for CascadePolicy {
    fn default() -> Self {
        Self {
            partial_support_limit: DEFAULT_PARTIAL_SUPPORT_LIMIT,
            floor_size: DEFAULT_FLOOR_SIZE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub evidence: Vec<Fragment>,
    pub summary: GradeSummary,
}

/// Downgrade a failed grade to `Partial`. Only applies while at least one grade succeeded.
#[must_use]
pub fn resolve_verdict(result: &Result<Verdict, GradingUnavailable>) -> Verdict {
    match result {
        Ok(verdict) => *verdict,
        Err(_) => Verdict::Partial,
    }
}

/// Select the evidence set from `fragments` given one grading result per fragment.
///
/// Tiers, first match wins:
/// 1. any relevant: all relevant, then the first `partial_support_limit` partials
/// 2. any partial and at least one successful grade: all partials
/// 3. otherwise: the first `floor_size` raw fragments
///
/// Retrieval order is kept within each bucket. `grades` shorter than `fragments`
/// leaves the trailing fragments ungraded, which is treated as a grading fault.
#[must_use]
pub fn select_evidence(
    fragments: &[Fragment],
    grades: &[Result<Verdict, GradingUnavailable>],
    policy: &CascadePolicy,
) -> Selection {
    let mut relevant = Vec::new();
    let mut partial = Vec::new();
    let mut irrelevant = 0usize;
    let mut faults = 0usize;

    for (i, fragment) in fragments.iter().enumerate() {
        let verdict = match grades.get(i) {
            Some(Ok(v)) => *v,
            Some(Err(_)) | None => {
                faults += 1;
                Verdict::Partial
            }
        };
        match verdict {
            Verdict::Relevant => relevant.push(fragment),
            Verdict::Partial => partial.push(fragment),
            Verdict::Irrelevant => irrelevant += 1,
        }
    }

    let relevant_count = relevant.len();
    let partial_count = partial.len();
    let all_faulted = faults == fragments.len();

    let (tier, evidence): (EvidenceTier, Vec<Fragment>) = if !relevant.is_empty() {
        let support = partial.into_iter().take(policy.partial_support_limit);
        (
            EvidenceTier::Relevant,
            relevant.into_iter().chain(support).cloned().collect(),
        )
    } else if !partial.is_empty() && !all_faulted {
        (EvidenceTier::Partial, partial.into_iter().cloned().collect())
    } else {
        (
            EvidenceTier::Floor,
            fragments.iter().take(policy.floor_size).cloned().collect(),
        )
    };

    Selection {
        summary: GradeSummary {
            relevant: relevant_count,
            partial: partial_count,
            irrelevant,
            faults,
            tier,
            evidence: evidence.len(),
        },
        evidence,
    }
}
