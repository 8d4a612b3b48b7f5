use std::collections::HashSet;
use std::time::Duration;

use thiserror::Error;

use crate::model::ids::DomainId;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SettingsError {
    #[error("transition delay must be at most {max} ms")]
    InvalidTransitionDelay { max: u32 },

    #[error("exit delay must be at most {max} ms")]
    InvalidExitDelay { max: u32 },

    #[error("quick session size must be > 0")]
    InvalidQuickSize,

    #[error("exam size must be > 0")]
    InvalidExamSize,

    #[error("exam blueprint needs at least one domain")]
    EmptyBlueprint,

    #[error("exam blueprint weights must sum to 100, got {sum}")]
    BlueprintWeightSum { sum: u32 },

    #[error("exam blueprint lists domain {0} more than once")]
    DuplicateDomain(DomainId),
}

/// Longest animation window accepted for transition/exit delays.
pub const MAX_DELAY_MS: u32 = 5_000;

//
// ─── BLUEPRINT ─────────────────────────────────────────────────────────────────
//

/// Share of an exam drawn from one domain, in whole percent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainWeight {
    pub domain: DomainId,
    pub percent: u8,
}

/// Proportional allocation of exam questions across domains.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExamBlueprint {
    weights: Vec<DomainWeight>,
}

impl ExamBlueprint {
    /// # Errors
    ///
    /// Returns `SettingsError::EmptyBlueprint` with no weights,
    /// `SettingsError::DuplicateDomain` if a domain repeats and
    /// `SettingsError::BlueprintWeightSum` unless weights sum to 100.
    pub fn new(weights: Vec<DomainWeight>) -> Result<Self, SettingsError> {
        if weights.is_empty() {
            return Err(SettingsError::EmptyBlueprint);
        }
        let mut seen = HashSet::new();
        for weight in &weights {
            if !seen.insert(&weight.domain) {
                return Err(SettingsError::DuplicateDomain(weight.domain.clone()));
            }
        }
        let sum: u32 = weights.iter().map(|w| u32::from(w.percent)).sum();
        if sum != 100 {
            return Err(SettingsError::BlueprintWeightSum { sum });
        }
        Ok(Self { weights })
    }

    /// Three domains weighted 40/40/20.
    #[must_use]
    pub fn three_domain_default() -> Self {
        let weight = |domain: &str, percent| DomainWeight {
            domain: DomainId::from_known(domain),
            percent,
        };
        Self {
            weights: vec![weight("1", 40), weight("2", 40), weight("3", 20)],
        }
    }

    #[must_use]
    pub fn weights(&self) -> &[DomainWeight] {
        &self.weights
    }

    /// Per-domain question counts for an exam of `total` questions.
    ///
    /// Counts are floored shares of `total`; any remainder left by flooring is
    /// handed out one question at a time in blueprint order, so the counts
    /// always sum to `total`.
    #[must_use]
    pub fn quotas(&self, total: usize) -> Vec<(DomainId, usize)> {
        let mut quotas: Vec<(DomainId, usize)> = self
            .weights
            .iter()
            .map(|w| (w.domain.clone(), total * usize::from(w.percent) / 100))
            .collect();

        let assigned: usize = quotas.iter().map(|(_, n)| n).sum();
        let len = quotas.len();
        for i in 0..total.saturating_sub(assigned) {
            quotas[i % len].1 += 1;
        }
        quotas
    }
}

//
// ─── SETTINGS ──────────────────────────────────────────────────────────────────
//

/// Exam length presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExamSize {
    Full,
    Quick,
    SuperQuick,
}

/// Tuning knobs for the test session engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineSettings {
    transition_delay_ms: u32,
    exit_delay_ms: u32,
    quick_size: u32,
    full_exam_size: u32,
    quick_exam_size: u32,
    super_quick_exam_size: u32,
    blueprint: ExamBlueprint,
}

impl Default for EngineSettings {
    /// 300 ms animation windows, 10-question quick sessions, 80/20/10
    /// question exams over the three-domain blueprint.
    fn default() -> Self {
        Self {
            transition_delay_ms: 300,
            exit_delay_ms: 300,
            quick_size: 10,
            full_exam_size: 80,
            quick_exam_size: 20,
            super_quick_exam_size: 10,
            blueprint: ExamBlueprint::three_domain_default(),
        }
    }
}

impl EngineSettings {
    /// Creates custom engine settings.
    ///
    /// # Errors
    ///
    /// Returns error if a delay exceeds `MAX_DELAY_MS` or any size is zero.
    pub fn new(
        transition_delay_ms: u32,
        exit_delay_ms: u32,
        quick_size: u32,
        exam_sizes: [u32; 3],
        blueprint: ExamBlueprint,
    ) -> Result<Self, SettingsError> {
        if transition_delay_ms > MAX_DELAY_MS {
            return Err(SettingsError::InvalidTransitionDelay { max: MAX_DELAY_MS });
        }
        if exit_delay_ms > MAX_DELAY_MS {
            return Err(SettingsError::InvalidExitDelay { max: MAX_DELAY_MS });
        }
        if quick_size == 0 {
            return Err(SettingsError::InvalidQuickSize);
        }
        if exam_sizes.contains(&0) {
            return Err(SettingsError::InvalidExamSize);
        }
        let [full_exam_size, quick_exam_size, super_quick_exam_size] = exam_sizes;

        Ok(Self {
            transition_delay_ms,
            exit_delay_ms,
            quick_size,
            full_exam_size,
            quick_exam_size,
            super_quick_exam_size,
            blueprint,
        })
    }

    /// Same settings with both animation windows set to zero.
    #[must_use]
    pub fn without_delays(mut self) -> Self {
        self.transition_delay_ms = 0;
        self.exit_delay_ms = 0;
        self
    }

    #[must_use]
    pub fn transition_delay(&self) -> Duration {
        Duration::from_millis(u64::from(self.transition_delay_ms))
    }

    #[must_use]
    pub fn exit_delay(&self) -> Duration {
        Duration::from_millis(u64::from(self.exit_delay_ms))
    }

    #[must_use]
    pub fn quick_size(&self) -> usize {
        usize::try_from(self.quick_size).unwrap_or(usize::MAX)
    }

    #[must_use]
    pub fn exam_size(&self, size: ExamSize) -> usize {
        let raw = match size {
            ExamSize::Full => self.full_exam_size,
            ExamSize::Quick => self.quick_exam_size,
            ExamSize::SuperQuick => self.super_quick_exam_size,
        };
        usize::try_from(raw).unwrap_or(usize::MAX)
    }

    #[must_use]
    pub fn blueprint(&self) -> &ExamBlueprint {
        &self.blueprint
    }
}
