//! Input checks shared by every statistic that weights studies

use evidence_core::{EffectEstimate, EffectMeasure, Error, ErrorContext, Result};
use std::collections::BTreeSet;
use tracing::warn;

/// A validated set split into weightable estimates and zero-variance studies
#[derive(Debug, Clone, PartialEq)]
pub struct WeightableSet {
    pub measure: EffectMeasure,
    /// Estimates with positive variance, in input order
    pub usable: Vec<EffectEstimate>,
    /// Ids of studies whose variance is exactly zero
    pub zero_variance: Vec<String>,
}

/// Check a set of estimates can be inverse-variance weighted together
///
/// Requires at least `min_studies` estimates sharing one measure and scale,
/// with unique study ids, finite estimates and positive finite variances.
/// Returns the common measure.
pub fn check_estimates(
    estimates: &[EffectEstimate],
    operation: &'static str,
    min_studies: usize,
) -> Result<EffectMeasure> {
    let measure = check_structure(estimates, operation, min_studies)?;
    if let Some(flat) = estimates.iter().find(|est| est.variance == 0.0) {
        return Err(Error::zero_variance(&flat.study_id));
    }
    Ok(measure)
}

/// Validate a set and set aside studies with zero variance
///
/// Zero-variance studies (a double-zero risk difference, say) cannot carry
/// an inverse-variance weight, so they are returned by id instead of
/// failing the call. Fails when fewer than `min_studies` weightable
/// estimates remain, or with `Degenerate` when none remain at all.
pub fn split_zero_variance(
    estimates: &[EffectEstimate],
    operation: &'static str,
    min_studies: usize,
) -> Result<WeightableSet> {
    let measure = check_structure(estimates, operation, 1)?;
    let (usable, flat): (Vec<&EffectEstimate>, Vec<&EffectEstimate>) =
        estimates.iter().partition(|est| est.variance > 0.0);

    if usable.is_empty() {
        return Err(Error::zero_variance(&flat[0].study_id));
    }
    if usable.len() < min_studies {
        return Err(Error::insufficient(operation, min_studies, usable.len()));
    }

    let zero_variance: Vec<String> = flat.iter().map(|est| est.study_id.clone()).collect();
    if !zero_variance.is_empty() {
        warn!(
            operation,
            studies = ?zero_variance,
            "excluding zero-variance studies from the weights"
        );
    }

    Ok(WeightableSet {
        measure,
        usable: usable.into_iter().cloned().collect(),
        zero_variance,
    })
}

/// Count, measure, identifier and finiteness checks; zero variance passes
fn check_structure(
    estimates: &[EffectEstimate],
    operation: &'static str,
    min_studies: usize,
) -> Result<EffectMeasure> {
    if estimates.len() < min_studies.max(1) {
        return Err(Error::insufficient(operation, min_studies.max(1), estimates.len()));
    }

    let measure = estimates[0].measure;
    let log_scale = estimates[0].log_scale;
    let mut seen = BTreeSet::new();

    for est in estimates {
        if est.measure != measure || est.log_scale != log_scale {
            return Err(Error::InvalidInput {
                context: ErrorContext::study(&est.study_id).with_field("measure"),
                message: format!(
                    "all estimates must share one measure and scale; expected {measure}, got {}",
                    est.measure
                ),
            });
        }
        if !seen.insert(est.study_id.as_str()) {
            return Err(Error::invalid_study(&est.study_id, "duplicate study identifier"));
        }
        if !est.estimate.is_finite() {
            return Err(Error::invalid_field(&est.study_id, "estimate", "must be finite"));
        }
        if !est.variance.is_finite() || est.variance < 0.0 {
            return Err(Error::zero_variance(&est.study_id));
        }
    }

    Ok(measure)
}
