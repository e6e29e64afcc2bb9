//! Binary-outcome effect sizes from 2x2 tables
//!
//! Cell layout:
//!
//! |           | event | no event |
//! |-----------|-------|----------|
//! | treatment | a     | b        |
//! | control   | c     | d        |

use evidence_core::{EffectEstimate, EffectMeasure, Error, Result};

/// A 2x2 table built from per-arm event counts
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TwoByTwo {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
}

impl TwoByTwo {
    /// Build a table from events and totals, validating every count
    pub fn from_counts(
        study_id: &str,
        events_treatment: f64,
        total_treatment: f64,
        events_control: f64,
        total_control: f64,
    ) -> Result<Self> {
        let fields = [
            ("events_treatment", events_treatment),
            ("total_treatment", total_treatment),
            ("events_control", events_control),
            ("total_control", total_control),
        ];
        for (field, value) in fields {
            if !value.is_finite() {
                return Err(Error::invalid_field(study_id, field, "must be a finite number"));
            }
            if value < 0.0 {
                return Err(Error::invalid_field(
                    study_id,
                    field,
                    format!("count {value} must be non-negative"),
                ));
            }
        }
        if total_treatment == 0.0 {
            return Err(Error::invalid_field(
                study_id,
                "total_treatment",
                "arm has no participants",
            ));
        }
        if total_control == 0.0 {
            return Err(Error::invalid_field(
                study_id,
                "total_control",
                "arm has no participants",
            ));
        }
        if events_treatment > total_treatment {
            return Err(Error::invalid_field(
                study_id,
                "events_treatment",
                format!("{events_treatment} events exceed {total_treatment} participants"),
            ));
        }
        if events_control > total_control {
            return Err(Error::invalid_field(
                study_id,
                "events_control",
                format!("{events_control} events exceed {total_control} participants"),
            ));
        }

        Ok(Self {
            a: events_treatment,
            b: total_treatment - events_treatment,
            c: events_control,
            d: total_control - events_control,
        })
    }

    /// Whether any cell is zero
    pub fn has_zero_cell(&self) -> bool {
        self.a == 0.0 || self.b == 0.0 || self.c == 0.0 || self.d == 0.0
    }

    /// Add `correction` to every cell
    pub fn corrected(&self, correction: f64) -> Self {
        Self {
            a: self.a + correction,
            b: self.b + correction,
            c: self.c + correction,
            d: self.d + correction,
        }
    }

    /// Treatment-arm total
    pub fn n1(&self) -> f64 {
        self.a + self.b
    }

    /// Control-arm total
    pub fn n2(&self) -> f64 {
        self.c + self.d
    }

    /// Apply the zero-cell policy: correct all four cells when any is zero, never otherwise
    fn for_ratio(&self, correction: f64) -> (Self, bool) {
        if self.has_zero_cell() {
            (self.corrected(correction), true)
        } else {
            (*self, false)
        }
    }

    /// Log odds ratio with `Var = 1/a + 1/b + 1/c + 1/d`
    pub fn log_odds_ratio(&self, study_id: &str, correction: f64) -> EffectEstimate {
        let (t, corrected) = self.for_ratio(correction);
        let log_or = (t.a * t.d / (t.b * t.c)).ln();
        let variance = 1.0 / t.a + 1.0 / t.b + 1.0 / t.c + 1.0 / t.d;
        EffectEstimate {
            continuity_corrected: corrected,
            ..EffectEstimate::new(study_id, log_or, variance, EffectMeasure::OddsRatio)
        }
    }

    /// Log risk ratio with `Var = 1/a - 1/n1 + 1/c - 1/n2`
    pub fn log_risk_ratio(&self, study_id: &str, correction: f64) -> EffectEstimate {
        let (t, corrected) = self.for_ratio(correction);
        let (n1, n2) = (t.n1(), t.n2());
        let log_rr = ((t.a / n1) / (t.c / n2)).ln();
        let variance = 1.0 / t.a - 1.0 / n1 + 1.0 / t.c - 1.0 / n2;
        EffectEstimate {
            continuity_corrected: corrected,
            ..EffectEstimate::new(study_id, log_rr, variance, EffectMeasure::RiskRatio)
        }
    }

    /// Risk difference with `Var = p1(1-p1)/n1 + p2(1-p2)/n2`
    ///
    /// No continuity correction is applied, so a table with all-or-none
    /// events in both arms yields a zero-variance (degenerate) estimate.
    pub fn risk_difference(&self, study_id: &str) -> EffectEstimate {
        let (n1, n2) = (self.n1(), self.n2());
        let p1 = self.a / n1;
        let p2 = self.c / n2;
        let variance = p1 * (1.0 - p1) / n1 + p2 * (1.0 - p2) / n2;
        EffectEstimate::new(study_id, p1 - p2, variance, EffectMeasure::RiskDifference)
    }
}
