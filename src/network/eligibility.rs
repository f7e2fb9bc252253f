//! Salary-slab and referral-level eligibility.
//!
//! Pure lookups against ordered tables; no store access, no side effects.
//! The default tables are the current compensation plan; deployments can
//! override them from the database through the gateway reference cache.

use once_cell::sync::Lazy;
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

use crate::core_types::{Bv, LevelNo};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScaleError {
    #[error("scale table must not be empty")]
    Empty,
    #[error("thresholds must be strictly increasing, violated at row {0}")]
    NonIncreasing(usize),
}

/// One row of the monthly salary table. The BV requirement is balanced:
/// both legs must carry at least `threshold`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct SalarySlab {
    pub level: LevelNo,
    pub threshold: Bv,
    pub monthly_pay: i64,
}

impl SalarySlab {
    /// Human label in plan notation, e.g. 50_000 -> "50K-50K".
    pub fn requirement_label(&self) -> String {
        let side = if self.threshold % 1_000_000 == 0 && self.threshold >= 1_000_000 {
            format!("{}M", self.threshold / 1_000_000)
        } else {
            format!("{}K", self.threshold / 1_000)
        };
        format!("{side}-{side}")
    }
}

/// Where a member currently stands on the salary table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, ToSchema)]
pub struct SalaryStanding {
    /// Index into the scale of the highest slab whose threshold is met
    pub current_index: Option<usize>,
    pub current: Option<SalarySlab>,
    pub next: Option<SalarySlab>,
    /// Progress toward `next`, capped at 100
    pub progress_percent: f64,
}

#[derive(Debug, Clone)]
pub struct SalaryScale {
    slabs: Vec<SalarySlab>,
}

impl SalaryScale {
    pub fn new(slabs: Vec<SalarySlab>) -> Result<Self, ScaleError> {
        if slabs.is_empty() {
            return Err(ScaleError::Empty);
        }
        for i in 1..slabs.len() {
            if slabs[i].threshold <= slabs[i - 1].threshold {
                return Err(ScaleError::NonIncreasing(i));
            }
        }
        Ok(Self { slabs })
    }

    pub fn slabs(&self) -> &[SalarySlab] {
        &self.slabs
    }

    /// Highest slab whose threshold the balanced BV meets, the following
    /// slab, and progress toward it. Pure and idempotent.
    pub fn evaluate(&self, balanced_bv: Bv) -> SalaryStanding {
        let current_index = self
            .slabs
            .iter()
            .rposition(|slab| slab.threshold <= balanced_bv);

        let next = match current_index {
            Some(i) => self.slabs.get(i + 1).copied(),
            None => self.slabs.first().copied(),
        };

        let progress_percent = match next {
            Some(slab) if slab.threshold > 0 => {
                (balanced_bv as f64 / slab.threshold as f64 * 100.0).min(100.0)
            }
            Some(_) => 100.0,
            // Top of the table
            None => 100.0,
        };

        SalaryStanding {
            current_index,
            current: current_index.map(|i| self.slabs[i]),
            next,
            progress_percent,
        }
    }
}

/// One row of the referral commission table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct ReferralLevel {
    pub level: LevelNo,
    /// Direct referrals needed to unlock this level
    pub direct_required: u32,
    /// Commission on downstream purchases at this depth, percent
    pub reward_percent: u8,
}

#[derive(Debug, Clone)]
pub struct ReferralScale {
    levels: Vec<ReferralLevel>,
}

impl ReferralScale {
    pub fn new(levels: Vec<ReferralLevel>) -> Result<Self, ScaleError> {
        if levels.is_empty() {
            return Err(ScaleError::Empty);
        }
        for i in 1..levels.len() {
            if levels[i].direct_required <= levels[i - 1].direct_required {
                return Err(ScaleError::NonIncreasing(i));
            }
        }
        Ok(Self { levels })
    }

    pub fn levels(&self) -> &[ReferralLevel] {
        &self.levels
    }

    /// Level numbers unlocked at `direct_count`. Monotonic staircase:
    /// more directs never unlock fewer levels.
    pub fn unlocked(&self, direct_count: u32) -> Vec<LevelNo> {
        self.levels
            .iter()
            .filter(|l| direct_count >= l.direct_required)
            .map(|l| l.level)
            .collect()
    }

    pub fn is_unlocked(&self, level: LevelNo, direct_count: u32) -> bool {
        self.levels
            .iter()
            .any(|l| l.level == level && direct_count >= l.direct_required)
    }

    /// Commission percentage for purchases `depth` referral steps below,
    /// if that level exists and is unlocked.
    pub fn commission_percent(&self, depth: u32, direct_count: u32) -> Option<u8> {
        self.levels
            .iter()
            .find(|l| u32::from(l.level) == depth && direct_count >= l.direct_required)
            .map(|l| l.reward_percent)
    }
}

/// Current salary plan: ten slabs from 10K-10K up to 10M-10M.
pub static DEFAULT_SALARY_SCALE: Lazy<SalaryScale> = Lazy::new(|| {
    let rows = [
        (1, 10_000, 250),
        (2, 25_000, 500),
        (3, 50_000, 1_000),
        (4, 100_000, 2_000),
        (5, 250_000, 4_000),
        (6, 500_000, 8_000),
        (7, 1_000_000, 20_000),
        (8, 2_000_000, 40_000),
        (9, 5_000_000, 100_000),
        (10, 10_000_000, 200_000),
    ];
    SalaryScale::new(
        rows.iter()
            .map(|&(level, threshold, monthly_pay)| SalarySlab {
                level,
                threshold,
                monthly_pay,
            })
            .collect(),
    )
    .expect("default salary scale is well-formed")
});

/// Current referral plan: level 1 is free, levels 2..10 need that many directs.
pub static DEFAULT_REFERRAL_SCALE: Lazy<ReferralScale> = Lazy::new(|| {
    let rows = [
        (1, 0, 15),
        (2, 2, 5),
        (3, 3, 4),
        (4, 4, 3),
        (5, 5, 2),
        (6, 6, 1),
        (7, 7, 1),
        (8, 8, 1),
        (9, 9, 1),
        (10, 10, 2),
    ];
    ReferralScale::new(
        rows.iter()
            .map(|&(level, direct_required, reward_percent)| ReferralLevel {
                level,
                direct_required,
                reward_percent,
            })
            .collect(),
    )
    .expect("default referral scale is well-formed")
});

#[cfg(test)]
mod tests {
    use super::*;

    fn scale(rows: &[(Bv, i64)]) -> SalaryScale {
        SalaryScale::new(
            rows.iter()
                .enumerate()
                .map(|(i, &(threshold, monthly_pay))| SalarySlab {
                    level: (i + 1) as LevelNo,
                    threshold,
                    monthly_pay,
                })
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn evaluate_picks_highest_met_slab() {
        let s = scale(&[(0, 250), (25_000, 500), (60_000, 1_000)]);
        let standing = s.evaluate(58_000);

        assert_eq!(standing.current_index, Some(1));
        assert_eq!(standing.current.unwrap().monthly_pay, 500);
        assert_eq!(standing.next.unwrap().threshold, 60_000);
        assert!((standing.progress_percent - 96.666).abs() < 0.01);
    }

    #[test]
    fn zero_bv_on_zero_threshold_table_sits_on_bottom_slab() {
        let s = scale(&[(0, 250), (25_000, 500)]);
        let standing = s.evaluate(0);
        assert_eq!(standing.current_index, Some(0));
        assert_eq!(standing.current.unwrap().monthly_pay, 250);
    }

    #[test]
    fn zero_bv_on_default_plan_has_no_slab() {
        let standing = DEFAULT_SALARY_SCALE.evaluate(0);
        assert_eq!(standing.current_index, None);
        assert!(standing.current.is_none());
        assert_eq!(standing.next.unwrap().threshold, 10_000);
        assert_eq!(standing.progress_percent, 0.0);
    }

    #[test]
    fn top_slab_reports_full_progress() {
        let standing = DEFAULT_SALARY_SCALE.evaluate(12_000_000);
        assert_eq!(standing.current.unwrap().monthly_pay, 200_000);
        assert!(standing.next.is_none());
        assert_eq!(standing.progress_percent, 100.0);
    }

    #[test]
    fn evaluate_is_monotonic_in_balanced_bv() {
        let mut last = -1isize;
        for bv in [0, 5_000, 10_000, 24_999, 25_000, 999_999, 10_000_000] {
            let standing = DEFAULT_SALARY_SCALE.evaluate(bv);
            let idx = standing.current_index.map(|i| i as isize).unwrap_or(-1);
            assert!(idx >= last, "slab index regressed at bv={bv}");
            last = idx;
        }
    }

    #[test]
    fn evaluate_is_idempotent() {
        let a = DEFAULT_SALARY_SCALE.evaluate(58_000);
        let b = DEFAULT_SALARY_SCALE.evaluate(58_000);
        assert_eq!(a, b);
    }

    #[test]
    fn thresholds_must_increase() {
        let err = SalaryScale::new(vec![
            SalarySlab {
                level: 1,
                threshold: 10_000,
                monthly_pay: 250,
            },
            SalarySlab {
                level: 2,
                threshold: 10_000,
                monthly_pay: 500,
            },
        ])
        .unwrap_err();
        assert_eq!(err, ScaleError::NonIncreasing(1));
    }

    #[test]
    fn requirement_labels_use_plan_notation() {
        assert_eq!(DEFAULT_SALARY_SCALE.slabs()[0].requirement_label(), "10K-10K");
        assert_eq!(DEFAULT_SALARY_SCALE.slabs()[6].requirement_label(), "1M-1M");
        assert_eq!(
            DEFAULT_SALARY_SCALE.slabs()[9].requirement_label(),
            "10M-10M"
        );
    }

    #[test]
    fn levels_unlock_on_direct_count() {
        assert_eq!(DEFAULT_REFERRAL_SCALE.unlocked(0), vec![1]);
        assert_eq!(DEFAULT_REFERRAL_SCALE.unlocked(3), vec![1, 2, 3]);
        assert_eq!(DEFAULT_REFERRAL_SCALE.unlocked(10).len(), 10);
        assert!(DEFAULT_REFERRAL_SCALE.is_unlocked(2, 2));
        assert!(!DEFAULT_REFERRAL_SCALE.is_unlocked(4, 3));
    }

    #[test]
    fn unlock_is_monotonic_in_direct_count() {
        for d in 0..12u32 {
            let now = DEFAULT_REFERRAL_SCALE.unlocked(d).len();
            let next = DEFAULT_REFERRAL_SCALE.unlocked(d + 1).len();
            assert!(next >= now);
        }
    }

    #[test]
    fn commission_requires_unlocked_level() {
        assert_eq!(DEFAULT_REFERRAL_SCALE.commission_percent(1, 0), Some(15));
        assert_eq!(DEFAULT_REFERRAL_SCALE.commission_percent(2, 1), None);
        assert_eq!(DEFAULT_REFERRAL_SCALE.commission_percent(2, 2), Some(5));
        assert_eq!(DEFAULT_REFERRAL_SCALE.commission_percent(11, 20), None);
    }
}
