//! Treatment ranking: analytic P-scores and Monte Carlo SUCRA

use crate::graph::NetworkGraph;
use crate::model::ComponentModel;
use crate::types::OutcomeDirection;
use evidence_core::math::distributions::normal_cdf;
use evidence_core::{Error, RankingConfig, Result};
use nalgebra::{Cholesky, DMatrix, DVector};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

/// Draws per independently seeded chunk
const CHUNK_SIZE: usize = 1024;

/// Ranking of one treatment within its component
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankingResult {
    pub treatment: String,
    pub component: usize,
    /// Surface under the cumulative ranking curve, in [0, 1]
    pub sucra: f64,
    /// Monte Carlo standard error of `sucra`
    pub sucra_standard_error: f64,
    /// Analytic counterpart of SUCRA, in [0, 1]
    pub p_score: f64,
    /// Expected rank, 1 = best
    pub mean_rank: f64,
    /// Probability of each rank position, best first; sums to 1
    pub rank_distribution: Vec<f64>,
}

/// How the SUCRA values were simulated
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RankingSummary {
    pub simulations: usize,
    pub seed: u64,
    /// Three Monte Carlo standard errors of the least precise SUCRA
    pub monte_carlo_tolerance: f64,
}

/// Rank counts accumulated over draws
#[derive(Debug, Clone)]
struct RankTally {
    size: usize,
    draws: u64,
    /// `counts[t * size + r]`: draws placing treatment `t` at rank `r`
    counts: Vec<u64>,
    rank_sum: Vec<u64>,
    rank_sq_sum: Vec<u64>,
}

impl RankTally {
    fn new(size: usize) -> Self {
        Self {
            size,
            draws: 0,
            counts: vec![0; size * size],
            rank_sum: vec![0; size],
            rank_sq_sum: vec![0; size],
        }
    }

    fn merge(mut self, other: Self) -> Self {
        self.draws += other.draws;
        for (a, b) in self.counts.iter_mut().zip(&other.counts) {
            *a += b;
        }
        for (a, b) in self.rank_sum.iter_mut().zip(&other.rank_sum) {
            *a += b;
        }
        for (a, b) in self.rank_sq_sum.iter_mut().zip(&other.rank_sq_sum) {
            *a += b;
        }
        self
    }
}

/// P-score of member `t`: mean over rivals of `Φ(utility difference / SE)`
pub(crate) fn p_scores(model: &ComponentModel, direction: OutcomeDirection) -> Result<Vec<f64>> {
    let m = model.members.len();
    (0..m)
        .map(|t| {
            let mut total = 0.0;
            for s in (0..m).filter(|&s| s != t) {
                let (effect, variance) = model.contrast(s, t);
                let advantage = direction.sign() * effect;
                total += if variance > 0.0 {
                    normal_cdf(advantage / variance.sqrt())?
                } else if advantage > 0.0 {
                    1.0
                } else if advantage < 0.0 {
                    0.0
                } else {
                    0.5
                };
            }
            Ok(total / (m - 1) as f64)
        })
        .collect()
}

/// Lower Cholesky factor, retried with a small diagonal jitter
fn cholesky_factor(covariance: DMatrix<f64>) -> Result<DMatrix<f64>> {
    let n = covariance.nrows();
    let jitter = 1e-10 * covariance.trace().abs().max(1e-12) / n.max(1) as f64;
    let jittered = &covariance + DMatrix::<f64>::identity(n, n) * jitter;
    Cholesky::new(covariance)
        .or_else(|| Cholesky::new(jittered))
        .map(|chol| chol.l())
        .ok_or_else(|| {
            Error::Computation("consistency-model covariance is not positive definite".to_string())
        })
}

/// Simulate one chunk from its own ChaCha stream
fn simulate_chunk(
    stream: u64,
    draws: usize,
    seed: u64,
    means: &DVector<f64>,
    factor: &DMatrix<f64>,
    sign: f64,
) -> RankTally {
    let p = means.len();
    let m = p + 1;
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    rng.set_stream(stream);

    let mut tally = RankTally::new(m);
    let mut noise = DVector::<f64>::zeros(p);
    let mut utility = vec![0.0; m];
    let mut order: Vec<usize> = (0..m).collect();

    for _ in 0..draws {
        for value in noise.iter_mut() {
            *value = rng.sample(StandardNormal);
        }
        let sample = factor * &noise + means;
        utility[0] = 0.0;
        for k in 0..p {
            utility[k + 1] = sign * sample[k];
        }
        order.sort_by(|&a, &b| utility[b].total_cmp(&utility[a]));
        for (position, &t) in order.iter().enumerate() {
            let rank = position as u64 + 1;
            tally.counts[t * m + position] += 1;
            tally.rank_sum[t] += rank;
            tally.rank_sq_sum[t] += rank * rank;
        }
        tally.draws += 1;
    }
    tally
}

/// Rank the members of one component
///
/// Draws are split into fixed-size chunks, each on its own ChaCha stream
/// derived from the seed, component and chunk index, so results do not
/// depend on whether chunks run in parallel.
#[instrument(skip_all, fields(component = model.component, treatments = model.members.len()))]
pub(crate) fn rank_component(
    model: &ComponentModel,
    graph: &NetworkGraph,
    direction: OutcomeDirection,
    config: &RankingConfig,
) -> Result<Vec<RankingResult>> {
    let m = model.members.len();
    if m < 2 {
        return Ok(Vec::new());
    }

    let p_scores = p_scores(model, direction)?;
    let means = model.basic_effects();
    let factor = cholesky_factor(model.basic_covariance())?;
    let sign = direction.sign();
    let simulations = config.simulations;
    let chunks = (simulations + CHUNK_SIZE - 1) / CHUNK_SIZE;
    let component_stream = (model.component as u64) << 32;

    let run = |chunk: usize| {
        let draws = CHUNK_SIZE.min(simulations - chunk * CHUNK_SIZE);
        simulate_chunk(
            component_stream | chunk as u64,
            draws,
            config.seed,
            &means,
            &factor,
            sign,
        )
    };

    #[cfg(feature = "parallel")]
    let tally = {
        use rayon::prelude::*;
        (0..chunks)
            .into_par_iter()
            .map(run)
            .reduce(|| RankTally::new(m), RankTally::merge)
    };

    #[cfg(not(feature = "parallel"))]
    let tally = (0..chunks).map(run).fold(RankTally::new(m), RankTally::merge);

    debug!(draws = tally.draws, "rank simulation complete");

    let n = tally.draws as f64;
    let results = (0..m)
        .map(|t| {
            let rank_distribution: Vec<f64> = tally.counts[t * m..(t + 1) * m]
                .iter()
                .map(|&c| c as f64 / n)
                .collect();
            let mut cumulative = 0.0;
            let mut area = 0.0;
            for probability in &rank_distribution[..m - 1] {
                cumulative += probability;
                area += cumulative;
            }

            let mean_rank = tally.rank_sum[t] as f64 / n;
            let rank_variance = (tally.rank_sq_sum[t] as f64 / n - mean_rank * mean_rank).max(0.0);

            RankingResult {
                treatment: graph.treatments[model.members[t]].clone(),
                component: model.component,
                sucra: (area / (m - 1) as f64).clamp(0.0, 1.0),
                sucra_standard_error: (rank_variance / n).sqrt() / (m - 1) as f64,
                p_score: p_scores[t],
                mean_rank,
                rank_distribution,
            }
        })
        .collect();

    Ok(results)
}
