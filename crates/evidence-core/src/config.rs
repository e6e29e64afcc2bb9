//! Per-call analysis configuration
//!
//! There is no process-wide state: every entry point takes an
//! [`AnalysisConfig`] by reference, so concurrent callers can use different
//! settings without coordination.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Default significance level for confidence intervals
pub const DEFAULT_ALPHA: f64 = 0.05;

/// Default continuity correction added to every cell of a 2x2 table with a zero cell
pub const DEFAULT_CONTINUITY_CORRECTION: f64 = 0.5;

/// Funnel-asymmetry tests use a looser threshold than 0.05
pub const DEFAULT_BIAS_ALPHA: f64 = 0.10;

/// Default number of Monte Carlo draws for rank probabilities
pub const DEFAULT_SIMULATIONS: usize = 10_000;

/// Default seed for Monte Carlo ranking
pub const DEFAULT_SEED: u64 = 20_240_601;

/// Settings for simulation-based treatment ranking
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RankingConfig {
    /// Number of Monte Carlo draws
    pub simulations: usize,
    /// RNG seed; equal seeds give identical rankings
    pub seed: u64,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            simulations: DEFAULT_SIMULATIONS,
            seed: DEFAULT_SEED,
        }
    }
}

/// Configuration shared by all analysis entry points
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Two-sided significance level for confidence intervals
    pub alpha: f64,
    /// Amount added to each cell when a 2x2 table has a zero cell (OR/RR only)
    pub continuity_correction: f64,
    /// Threshold below which Egger's test flags funnel asymmetry
    pub bias_alpha: f64,
    /// Use the Hartung-Knapp adjustment for random-effects intervals
    pub hartung_knapp: bool,
    /// Report a prediction interval for random-effects pooling (k >= 3)
    pub prediction_interval: bool,
    /// Monte Carlo ranking settings
    pub ranking: RankingConfig,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            alpha: DEFAULT_ALPHA,
            continuity_correction: DEFAULT_CONTINUITY_CORRECTION,
            bias_alpha: DEFAULT_BIAS_ALPHA,
            hartung_knapp: false,
            prediction_interval: true,
            ranking: RankingConfig::default(),
        }
    }
}

impl AnalysisConfig {
    /// Create the default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the CI significance level.
    pub fn alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    /// Sets the zero-cell continuity correction.
    pub fn continuity_correction(mut self, correction: f64) -> Self {
        self.continuity_correction = correction;
        self
    }

    /// Sets the funnel-asymmetry threshold.
    pub fn bias_alpha(mut self, bias_alpha: f64) -> Self {
        self.bias_alpha = bias_alpha;
        self
    }

    /// Enables or disables the Hartung-Knapp adjustment.
    pub fn hartung_knapp(mut self, enabled: bool) -> Self {
        self.hartung_knapp = enabled;
        self
    }

    /// Enables or disables random-effects prediction intervals.
    pub fn prediction_interval(mut self, enabled: bool) -> Self {
        self.prediction_interval = enabled;
        self
    }

    /// Sets the number of Monte Carlo draws for ranking.
    pub fn simulations(mut self, simulations: usize) -> Self {
        self.ranking.simulations = simulations;
        self
    }

    /// Sets the ranking RNG seed.
    pub fn seed(mut self, seed: u64) -> Self {
        self.ranking.seed = seed;
        self
    }

    /// Confidence level implied by `alpha`
    pub fn confidence_level(&self) -> f64 {
        1.0 - self.alpha
    }

    /// Check every setting is in range
    pub fn validate(&self) -> Result<()> {
        if !(self.alpha > 0.0 && self.alpha < 1.0) {
            return Err(Error::InvalidParameter(format!(
                "alpha {} must be in (0, 1)",
                self.alpha
            )));
        }
        if !(self.bias_alpha > 0.0 && self.bias_alpha < 1.0) {
            return Err(Error::InvalidParameter(format!(
                "bias_alpha {} must be in (0, 1)",
                self.bias_alpha
            )));
        }
        if !(self.continuity_correction.is_finite() && self.continuity_correction > 0.0) {
            return Err(Error::InvalidParameter(format!(
                "continuity_correction {} must be positive",
                self.continuity_correction
            )));
        }
        if self.ranking.simulations == 0 {
            return Err(Error::InvalidParameter(
                "ranking.simulations must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
